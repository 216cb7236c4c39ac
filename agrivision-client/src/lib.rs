//! AgriVision client library
//!
//! - [`dispatcher`]: one HTTP request per input and mode
//! - [`controller`]: pure UI state reducer
//! - [`session`]: runs controller effects with per-dispatch cancellation
//! - [`render`]: text output for results and advice

pub mod controller;
pub mod dispatcher;
pub mod image;
pub mod render;
pub mod request;
pub mod session;

pub use controller::{Action, UiState};
pub use dispatcher::Dispatcher;
pub use request::{Input, Outcome, RequestContext};
pub use session::Session;
