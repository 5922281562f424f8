//! Task request types.
//!
//! A [`TaskRequest`] is built once by the caller (or the classifier), then
//! handed to the orchestrator, which never mutates it.

mod kind;
mod request;
mod state;

pub use kind::*;
pub use request::*;
pub use state::*;
