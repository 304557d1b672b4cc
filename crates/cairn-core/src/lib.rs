//! cairn-core — wire format, content hashing, and configuration.
//! All other cairn crates depend on this one.

pub mod config;
pub mod hash;
pub mod wire;

pub use wire::{ControlMessage, DataFrame, Frame, InventoryEntry};
