//! Property-based tests for the store's ordering and forgetting guarantees.
//!
//! These tests check that:
//!
//! - Scores never rise with time alone
//! - Reinforcement never lowers a score
//! - Recall output is sorted and bounded by the limit
//! - Forgetting leaves no index entry pointing at a removed memory
//! - Export followed by import reproduces every ranking
