//! Ranks a firmware fingerprint against a knowledge base of device shadows.
//!
//! Every shadow gets the Jaccard similarity of its read and write word sets
//! with the fingerprint's. Entries with equal scores share a rank, and ranks
//! step by one per distinct score.

pub mod error;
pub mod fingerprint;
pub mod knowledge_base;
pub mod ranking;

pub use error::{RankError, Result};
pub use fingerprint::Fingerprint;
pub use knowledge_base::{KbStats, KnowledgeBase};
pub use ranking::{RankGroup, Ranking, rank, score};
