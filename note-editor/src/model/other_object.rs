//! Non-playable markers: tempo, scroll speed, stops and system defined
//! types.
//!
//! The persisted `type` is the index into the chart system's other object
//! types, where the first three are fixed.

use serde::{Deserialize, Serialize};

use super::guid::Guid;
use crate::primitives::{
    time_calculator::{TempoChange, TempoEvent},
    ChartPosition, Fraction, MeasureObject,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum OtherObjectType {
    Bpm,
    Speed,
    Stop,
    Custom(u32),
}

impl From<u32> for OtherObjectType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Bpm,
            1 => Self::Speed,
            2 => Self::Stop,
            other => Self::Custom(other),
        }
    }
}

impl From<OtherObjectType> for u32 {
    fn from(value: OtherObjectType) -> Self {
        match value {
            OtherObjectType::Bpm => 0,
            OtherObjectType::Speed => 1,
            OtherObjectType::Stop => 2,
            OtherObjectType::Custom(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OtherObjectValue {
    Number(f64),
    Text(String),
}

impl From<f64> for OtherObjectValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherObject {
    #[serde(rename = "type")]
    pub object_type: OtherObjectType,
    pub value: OtherObjectValue,
    pub guid: Guid,
    pub measure_index: usize,
    pub measure_position: Fraction,
    #[serde(default)]
    pub layer: Guid,
}

impl OtherObject {
    pub fn new(
        guid: impl Into<Guid>,
        object_type: OtherObjectType,
        value: impl Into<OtherObjectValue>,
        position: ChartPosition,
        layer: impl Into<Guid>,
    ) -> Self {
        Self {
            object_type,
            value: value.into(),
            guid: guid.into(),
            measure_index: position.measure_index,
            measure_position: position.measure_position,
            layer: layer.into(),
        }
    }

    pub fn is_bpm(&self) -> bool {
        self.object_type == OtherObjectType::Bpm
    }

    pub fn is_speed(&self) -> bool {
        self.object_type == OtherObjectType::Speed
    }

    pub fn is_stop(&self) -> bool {
        self.object_type == OtherObjectType::Stop
    }

    /// BPM at the very start of the chart. A chart needs exactly one.
    pub fn is_start_bpm(&self) -> bool {
        self.is_bpm()
            && self.measure_index == 0
            && self.measure_position.to01() == 0.0
    }

    /// Numeric value; text values are parsed.
    pub fn number_value(&self) -> Option<f64> {
        match &self.value {
            OtherObjectValue::Number(value) => Some(*value),
            OtherObjectValue::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Comma separated parts of the value, for multi-value types.
    pub fn split_values(&self) -> Vec<String> {
        match &self.value {
            OtherObjectValue::Number(value) => vec![value.to_string()],
            OtherObjectValue::Text(text) => {
                text.split(',').map(|v| v.trim().to_string()).collect()
            }
        }
    }

    /// Tempo event for the time calculator, if this is a BPM or a stop.
    pub fn tempo_event(&self) -> Option<TempoEvent> {
        let change = match self.object_type {
            OtherObjectType::Bpm => TempoChange::Bpm(self.number_value()?),
            OtherObjectType::Stop => TempoChange::Stop(self.number_value()?),
            _ => return None,
        };
        Some(TempoEvent::new(ChartPosition::of(self), change))
    }
}

impl MeasureObject for OtherObject {
    fn measure_index(&self) -> usize {
        self.measure_index
    }
    fn measure_position(&self) -> Fraction {
        self.measure_position
    }
}
