use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type SlotId = i64;

/// Slot outline exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geometry(Value);

impl Geometry {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Best-effort read of the outline as `[[x, y], ...]` or `[{"x":..,"y":..}, ...]`.
    /// Only renderers use this; the geometry itself stays untouched.
    pub fn points(&self) -> Option<Vec<(f32, f32)>> {
        let entries = self.0.as_array()?;
        entries
            .iter()
            .map(|entry| match entry {
                Value::Array(pair) if pair.len() >= 2 => {
                    Some((pair[0].as_f64()? as f32, pair[1].as_f64()? as f32))
                }
                Value::Object(map) => Some((
                    map.get("x")?.as_f64()? as f32,
                    map.get("y")?.as_f64()? as f32,
                )),
                _ => None,
            })
            .collect()
    }
}

/// One parking space. Ids come from the backend and are not assumed contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSlot {
    pub id: SlotId,
    pub occupied: bool,
    #[serde(default)]
    pub geometry: Geometry,
}

impl ParkingSlot {
    pub fn new(id: SlotId, occupied: bool) -> Self {
        Self {
            id,
            occupied,
            geometry: Geometry::default(),
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }
}
