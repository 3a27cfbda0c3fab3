//! Live occupancy synchronization for the parking lot monitor.
//!
//! A [`Session`] submits one media file to the analysis backend, then keeps a
//! shared [`DisplayState`] in step with the backend's status endpoint until it
//! is closed. Every update carries the derived congestion level.

pub mod classify;
pub mod client;
pub mod model;
pub mod prelude;
pub mod sync;
pub mod telemetry;
pub mod wire;

pub use classify::{CongestionClassifier, CongestionLevel};
pub use client::HttpBackend;
pub use prelude::{ClientConfig, PollError, SubmitError, SubmitMode};
pub use sync::{DisplayState, Session, SessionPhase, UploadGate};
