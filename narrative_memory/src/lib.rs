//! # Narrative Memory
//!
//! Long-lived memory for an interactive storytelling engine. Every noteworthy
//! story event becomes a memory node with a time-varying significance score;
//! collaborators recall the most relevant memories, reinforce what keeps
//! coming up, and let the rest fade away.
//!
//! ## Core Components
//!
//! - **memory**: Node types, closed categories and the opaque payload
//! - **scoring**: Significance as a pure function of node state and time
//! - **tiers**: Near-term (bounded, FIFO), mid-term and long-term storage
//! - **index**: Facet indices by owner, theme, emotion, keyword and causal target
//! - **association**: Symmetric associations and pluggable causal inference
//! - **store**: The facade: add, recall, forget, stats, export and import
//! - **snapshot**: Versioned JSON export format
//! - **context**: Read-only context bundles for prompt building
//! - **shared**: A lock-guarded handle for multi-threaded callers
//!
//! ## Design Philosophy
//!
//! - **Ids, not pointers**: nodes refer to each other by id only, so the graph
//!   can hold cycles and forgotten links simply stop resolving
//! - **Derived indices**: indices are rebuilt from nodes and never serialized
//! - **Explicit time**: every time-dependent operation has an `*_at(now)` form

pub mod association;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod memory;
mod properties;
pub mod scoring;
pub mod shared;
pub mod snapshot;
pub mod store;
pub mod tiers;

pub use association::{
    AssociationEngine, CausalEdge, CausalInference, KeywordCausalInference, LinkReport,
    NoCausalInference,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MemoryConfig, ScoringConfig, TierSettings};
pub use context::*;
pub use error::{MemoryError, Result};
pub use index::{FacetSizes, IndexSet};
pub use memory::*;
pub use scoring::{ScoreBreakdown, SignificanceScorer};
pub use shared::SharedMemoryStore;
pub use snapshot::{MemorySnapshot, SnapshotNode, SnapshotTiers, SNAPSHOT_VERSION};
pub use store::{ImportReport, MemoryStats, MemoryStore, RecallQuery, RecalledMemory};
