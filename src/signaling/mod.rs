//! Signaling protocol engine: decodes client messages and routes them
//! between connections through the identity and room registries.

mod router;

pub use router::{MessageRouter, RouterStats, RouterStatsSnapshot};
