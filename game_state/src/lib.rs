//! # Game State
//!
//! The world state ledger. Holds the named counters that record game-world
//! progress, evaluates threshold conditions over them, and notifies observers
//! when they change. This crate knows nothing about dialogue.
//!
//! - **store**: the counter ledger with add/get and condition checks
//! - **reactor**: edge-triggered watchers over condition sets
//! - **signal**: the ordered observer registry used for every notification

pub mod reactor;
pub mod signal;
pub mod store;

pub use reactor::*;
pub use signal::*;
pub use store::*;
