use crate::model::{Geometry, OccupancySnapshot, ParkingSlot, SlotId};
use crate::prelude::{PollError, PollResult, SubmitError, SubmitMode, SubmitResult};
use crate::wire::entries::OrderedEntries;
use serde::Deserialize;
use std::collections::HashMap;

/// Occupancy marker as the backend encodes it: `0|1` from the live detector,
/// `true|false` from stored results. Any non-zero level counts as occupied.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OccupancyFlag {
    Flag(bool),
    Level(i64),
}

impl OccupancyFlag {
    pub fn is_occupied(&self) -> bool {
        match *self {
            OccupancyFlag::Flag(flag) => flag,
            OccupancyFlag::Level(level) => level != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleTally {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpaceStatus {
    pub id: SlotId,
    /// Missing flag is read as occupied so free capacity is never overstated.
    #[serde(default)]
    pub occupied: Option<OccupancyFlag>,
}

/// Body of `GET /parking_spaces`.
///
/// Every field is optional. Absent vehicles count as 0 and absent spaces as an
/// empty lot; only a body that is not JSON, has the wrong types, or carries an
/// `error` field fails the tick.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub vehicles: Option<Vec<VehicleTally>>,
    #[serde(default)]
    pub spaces: Option<Vec<SpaceStatus>>,
    #[serde(default)]
    pub slots: Option<OrderedEntries<SlotId, Geometry>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusPayload {
    pub fn parse(body: &[u8]) -> PollResult<Self> {
        serde_json::from_slice(body).map_err(|e| PollError::Malformed(e.to_string()))
    }

    /// Vehicle count is the first tally's `count`; the detector only reports cars.
    pub fn vehicle_count(&self) -> u64 {
        self.vehicles
            .as_ref()
            .and_then(|tallies| tallies.first())
            .and_then(|tally| tally.count)
            .unwrap_or(0)
            .max(0) as u64
    }

    pub fn into_snapshot(self) -> PollResult<OccupancySnapshot> {
        if let Some(error) = self.error {
            return Err(PollError::Backend(error));
        }
        let vehicle_count = self.vehicle_count();
        let geometry = geometry_by_id(self.slots);
        let slots = self
            .spaces
            .unwrap_or_default()
            .into_iter()
            .map(|space| {
                let occupied = space.occupied.map_or(true, |flag| flag.is_occupied());
                let slot = ParkingSlot::new(space.id, occupied);
                match geometry.get(&space.id) {
                    Some(outline) => slot.with_geometry(outline.clone()),
                    None => slot,
                }
            })
            .collect();
        Ok(OccupancySnapshot::new(slots, vehicle_count))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VehicleCounts {
    #[serde(default)]
    pub car: Option<i64>,
}

/// `result` object of an immediate-result `POST /analyze` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub spaces: Option<OrderedEntries<SlotId, OccupancyFlag>>,
    #[serde(default)]
    pub vehicles: Option<VehicleCounts>,
    #[serde(default)]
    pub slots: Option<OrderedEntries<SlotId, Geometry>>,
}

impl AnalysisResult {
    pub fn into_snapshot(self) -> OccupancySnapshot {
        let vehicle_count = self
            .vehicles
            .and_then(|counts| counts.car)
            .unwrap_or(0)
            .max(0) as u64;
        let geometry = geometry_by_id(self.slots);
        let slots = self
            .spaces
            .map(OrderedEntries::into_inner)
            .unwrap_or_default()
            .into_iter()
            .map(|(id, flag)| {
                let slot = ParkingSlot::new(id, flag.is_occupied());
                match geometry.get(&id) {
                    Some(outline) => slot.with_geometry(outline.clone()),
                    None => slot,
                }
            })
            .collect();
        OccupancySnapshot::new(slots, vehicle_count)
    }
}

#[derive(Debug, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImmediateResponse {
    #[serde(default)]
    result: Option<AnalysisResult>,
}

/// What a successful `POST /analyze` hands to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    Acknowledged { message: Option<String> },
    Completed(OccupancySnapshot),
}

impl AnalyzeOutcome {
    pub fn parse(body: &[u8], mode: SubmitMode) -> SubmitResult<Self> {
        match mode {
            SubmitMode::Acknowledge => {
                let ack: Acknowledgement = serde_json::from_slice(body)
                    .map_err(|e| SubmitError::Malformed(e.to_string()))?;
                if ack.ok == Some(false) {
                    let reason = ack
                        .detail
                        .or(ack.message)
                        .unwrap_or_else(|| "backend answered ok=false".into());
                    return Err(SubmitError::Rejected(reason));
                }
                Ok(AnalyzeOutcome::Acknowledged {
                    message: ack.message,
                })
            }
            SubmitMode::ImmediateResult => {
                let response: ImmediateResponse = serde_json::from_slice(body)
                    .map_err(|e| SubmitError::Malformed(e.to_string()))?;
                let result = response
                    .result
                    .ok_or_else(|| SubmitError::Malformed("response has no result".into()))?;
                Ok(AnalyzeOutcome::Completed(result.into_snapshot()))
            }
        }
    }
}

fn geometry_by_id(slots: Option<OrderedEntries<SlotId, Geometry>>) -> HashMap<SlotId, Geometry> {
    let mut lookup = HashMap::new();
    for (id, outline) in slots.map(OrderedEntries::into_inner).unwrap_or_default() {
        lookup.entry(id).or_insert(outline);
    }
    lookup
}
