//! cairn-engine — the synchronization engine.
//!
//! A fixed set of peers mirrors one flat directory over UDP with no
//! coordinator. Each node polls its sync root into a content index,
//! gossips that inventory, and pulls whole files on mismatch using a
//! stop-and-wait chunk transfer verified end to end by content hash.

pub mod announce;
pub mod assemble;
pub mod index;
pub mod node;
pub mod reconcile;
pub mod scan;
pub mod send;
pub mod transport;

pub use index::{new_index, FileRecord, NodeIndex};
pub use node::Node;
pub use send::SendTuning;
