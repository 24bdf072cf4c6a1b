//! Memory module - the node type and its closed categories.
//!
//! A memory consists of:
//! - **Identity**: id, kind, tier and creation time, fixed for life
//! - **Payload**: opaque structured content the store never interprets
//! - **Facets**: owner, session, emotions, themes and trigger keywords
//! - **Scoring state**: decay rate, reinforcement count, recency
//! - **Links**: associations and causal edges, stored as ids only

mod content;
mod kind;
mod node;

pub use content::*;
pub use kind::*;
pub use node::*;
pub(crate) use content::{keyword_windows, normalize_keyword, normalize_tag};
