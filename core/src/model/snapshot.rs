use crate::classify::{CongestionClassifier, CongestionLevel};
use crate::model::slot::{ParkingSlot, SlotId};
use serde::Serialize;

/// Complete occupancy view at one instant.
///
/// `empty_slot_ids` and `total_slots` are derived from `slots` on construction
/// and have no setters, so they cannot drift from the slot list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OccupancySnapshot {
    slots: Vec<ParkingSlot>,
    vehicle_count: u64,
    empty_slot_ids: Vec<SlotId>,
}

impl OccupancySnapshot {
    pub fn new(slots: Vec<ParkingSlot>, vehicle_count: u64) -> Self {
        let empty_slot_ids = slots
            .iter()
            .filter(|slot| !slot.occupied)
            .map(|slot| slot.id)
            .collect();
        Self {
            slots,
            vehicle_count,
            empty_slot_ids,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[ParkingSlot] {
        &self.slots
    }

    pub fn vehicle_count(&self) -> u64 {
        self.vehicle_count
    }

    pub fn empty_slot_ids(&self) -> &[SlotId] {
        &self.empty_slot_ids
    }

    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_slots(&self) -> usize {
        self.total_slots() - self.empty_slot_ids.len()
    }

    pub fn congestion(&self) -> CongestionLevel {
        CongestionClassifier::classify(self.empty_slot_ids.len(), self.total_slots())
    }
}
