//! corral-state: embedded snapshot store for the Corral controller.
//!
//! Backed by [redb](https://docs.rs/redb). The controller persists its whole
//! state as one JSON document after every reconciliation tick; the store
//! keeps exactly one such document per database.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be moved into the control-loop task.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
