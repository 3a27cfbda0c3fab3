pub mod reconciler;
pub mod session;
pub mod store;
pub mod submitter;
pub mod upload;

pub use reconciler::OccupancyReconciler;
pub use session::{InitialOutcome, Session, SessionPhase};
pub use store::{DisplayState, SnapshotStore, UpdateOrigin};
pub use submitter::AnalysisSubmitter;
pub use upload::UploadGate;
