pub mod entries;
pub mod payload;

pub use entries::OrderedEntries;
pub use payload::{
    AnalysisResult, AnalyzeOutcome, OccupancyFlag, SpaceStatus, StatusPayload, VehicleCounts,
    VehicleTally,
};
