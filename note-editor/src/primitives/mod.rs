//! Building blocks of every chart object.
//!
//! Positions are pairs of a measure index and an exact [`Fraction`] of that
//! measure. [`Measure`]s carry the beat length of every bar and, after a
//! [`layout::MeasureLayout`] pass, their pixel geometry.
//! [`time_calculator::TimeCalculator`] turns positions into seconds.

pub mod layout;
pub mod math;
pub mod measure;
pub mod position;
pub mod rational;
pub mod time_calculator;

pub use measure::{
    sort_measure, Measure, MeasureObject, DEFAULT_MEASURE_COUNT,
};
pub use position::{ChartPosition, NormalizedPoint};
pub use rational::{lcm_denominator, Fraction};
