//! Static knowledge base consulted by the explanation loop.
//!
//! Records describe well-known tokens, protocols and addresses. They are
//! loaded once per process, never mutated, and searched with an additive
//! fuzzy scorer.

mod record;
mod scorer;
mod search;
mod sources;
mod store;

pub use record::{KnowledgeRecord, RecordType};
pub use scorer::score;
pub use search::{SearchHit, SearchResponse};
pub use sources::{AddressEntry, ProtocolEntry, TokenEntry};
pub use store::{KnowledgeIndex, KnowledgeStore, MAX_RESULTS, MIN_CONFIDENCE};

#[cfg(test)]
pub use store::MockKnowledgeIndex;
