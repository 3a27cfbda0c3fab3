pub mod congestion;

pub use congestion::{CongestionClassifier, CongestionLevel};
