use serde::{Deserialize, Serialize};

use super::guid::Guid;
use crate::primitives::{Fraction, MeasureObject, NormalizedPoint};

/// Control point of a lane.
///
/// `horizontal_position` counts columns of `1 / denominator` measure
/// width, `horizontal_size` is the lane width in the same columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanePoint {
    pub guid: Guid,
    pub template_name: String,
    pub horizontal_size: i64,
    pub horizontal_position: Fraction,
    pub measure_index: usize,
    pub measure_position: Fraction,
    #[serde(default = "default_color")]
    pub color: u32,
}

fn default_color() -> u32 {
    0xffffff
}

impl LanePoint {
    pub fn normalized(&self) -> NormalizedPoint {
        NormalizedPoint::from_columns(
            self.horizontal_position,
            self.horizontal_size,
            self,
        )
    }
}

impl MeasureObject for LanePoint {
    fn measure_index(&self) -> usize {
        self.measure_index
    }
    fn measure_position(&self) -> Fraction {
        self.measure_position
    }
}
