//! Correlation of out-of-band human replies to pending authorization
//! requests.
//!
//! The store holds every outstanding approval round keyed by correlation
//! token; the engine is the single task allowed to touch it.

pub mod engine;
pub mod store;

pub use engine::{Engine, EngineHandle, ReplyEvent};
pub use store::{Mode, PendingRequest, PendingStore, Resolution};
