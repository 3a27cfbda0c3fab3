pub mod media;
pub mod preview;
pub mod slot;
pub mod snapshot;

pub use media::{FileHandle, MediaKind, MediaUpload, SelectedMedia};
pub use preview::{PreviewRegistry, PreviewUrl};
pub use slot::{Geometry, ParkingSlot, SlotId};
pub use snapshot::OccupancySnapshot;
