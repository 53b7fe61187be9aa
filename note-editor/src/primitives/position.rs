//! Positions on the chart.
//!
//! A musical position is a measure index plus a [`Fraction`] of that
//! measure. [`NormalizedPoint`] is the horizontal footprint of a lane point
//! or note line anchor: fractions of the measure width at a position.
//!
//! ```
//! use note_editor::primitives::{ChartPosition, Fraction, MeasureObject};
//!
//! let a = ChartPosition::new(2, Fraction::new(1, 4));
//! let b = ChartPosition::new(2, Fraction::new(2, 8));
//! assert_eq!(a, b);
//! assert_eq!(a.measure_value(), 2.25);
//! ```

use serde::{Deserialize, Serialize};

use super::{measure::MeasureObject, Fraction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPosition {
    pub measure_index: usize,
    pub measure_position: Fraction,
}

impl ChartPosition {
    pub fn new(measure_index: usize, measure_position: Fraction) -> Self {
        Self {
            measure_index,
            measure_position,
        }
    }

    pub fn of(object: &impl MeasureObject) -> Self {
        Self::new(object.measure_index(), object.measure_position())
    }

    /// Start of the measure.
    pub fn measure_start(measure_index: usize) -> Self {
        Self::new(measure_index, Fraction::new(0, 1))
    }
}

impl MeasureObject for ChartPosition {
    fn measure_index(&self) -> usize {
        self.measure_index
    }
    fn measure_position(&self) -> Fraction {
        self.measure_position
    }
}

/// Horizontal extent at a musical position, in fractions of measure width.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPoint {
    /// Left edge.
    pub x: f64,
    pub width: f64,
    /// `measure_index + to01(measure_position)`.
    pub value: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, width: f64, value: f64) -> Self {
        Self { x, width, value }
    }

    /// Footprint of `size` columns starting at `horizontal`.
    ///
    /// Column width is `1 / horizontal.denominator`; an unset position
    /// has no width.
    pub fn from_columns(
        horizontal: Fraction,
        size: i64,
        position: &impl MeasureObject,
    ) -> Self {
        let width = match horizontal.is_none() {
            true => 0.0,
            false => size as f64 / horizontal.denominator as f64,
        };
        Self::new(horizontal.to01(), width, position.measure_value())
    }

    pub fn center(&self) -> f64 {
        self.x + self.width / 2.0
    }
}
