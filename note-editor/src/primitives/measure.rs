//! Measure is one bar of the chart.
//!
//! Only `index`, `beat`, `invisible_line` and `custom_props` are persisted.
//! Pixel geometry is written by a [`super::layout::MeasureLayout`], and
//! begin/end times by [`super::time_calculator::TimeCalculator`]. Neither
//! takes part in equality.
//!
//! Everything placed on the chart implements [`MeasureObject`] and is ordered
//! with [`sort_measure`].

use std::cmp::Ordering;

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use super::{math::Vector2, Fraction};
use crate::model::custom_props::CustomProps;

/// Measures allocated for every chart.
pub const DEFAULT_MEASURE_COUNT: usize = 1000;
/// Quarter beats in a whole measure of `1/1`.
pub const QUARTERS_PER_WHOLE: f64 = 4.0;

#[derive(Debug, Clone, Serialize, Deserialize, Derivative)]
#[derivative(PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub index: usize,
    pub beat: Fraction,
    #[serde(default)]
    pub invisible_line: bool,
    #[serde(default)]
    pub custom_props: CustomProps,

    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub x: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub y: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub width: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    height: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    total_height: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub is_visible: bool,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub begin_time: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub end_time: f64,
}

impl Measure {
    pub fn new(index: usize, beat: Fraction) -> Self {
        Self {
            index,
            beat,
            invisible_line: false,
            custom_props: CustomProps::default(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            total_height: 0.0,
            is_visible: false,
            begin_time: 0.0,
            end_time: 0.0,
        }
    }

    /// Quarter beats in the measure: `4/4` gives 4, `7/8` gives 3.5.
    pub fn beats(&self) -> f64 {
        self.beat.to01() * QUARTERS_PER_WHOLE
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Height of all previous measures stacked in one column.
    pub fn total_height(&self) -> f64 {
        self.total_height
    }

    pub fn set_height(&mut self, height: f64, total_height: f64) {
        self.height = height;
        self.total_height = total_height;
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        (self.x..self.x + self.width).contains(&point.x)
            && (self.y..self.y + self.height).contains(&point.y)
    }

    /// Whether `time` falls inside `begin_time..end_time`.
    pub fn contains_time(&self, time: f64) -> bool {
        (self.begin_time..self.end_time).contains(&time)
    }
}

/// Anything placed at a musical position.
pub trait MeasureObject {
    fn measure_index(&self) -> usize;
    fn measure_position(&self) -> Fraction;

    /// `measure_index + to01(measure_position)`.
    fn measure_value(&self) -> f64 {
        self.measure_index() as f64 + self.measure_position().to01()
    }
}

/// Order of two measure objects by their position on the chart.
///
/// Consistent with [`MeasureObject::measure_value`]. When the floats tie,
/// the exact fractions decide.
pub fn sort_measure<A, B>(a: &A, b: &B) -> Ordering
where
    A: MeasureObject + ?Sized,
    B: MeasureObject + ?Sized,
{
    a.measure_value()
        .total_cmp(&b.measure_value())
        .then_with(|| exact_cmp(a, b))
}

fn exact_cmp<A, B>(a: &A, b: &B) -> Ordering
where
    A: MeasureObject + ?Sized,
    B: MeasureObject + ?Sized,
{
    let (pa, pb) = (a.measure_position(), b.measure_position());
    if pa.is_none() || pb.is_none() {
        return Ordering::Equal;
    }
    let (pa, pb) = (pa.reduced(), pb.reduced());
    let (an, ad) = (pa.numerator as i128, pa.denominator as i128);
    let (bn, bd) = (pb.numerator as i128, pb.denominator as i128);
    let left = (a.measure_index() as i128 * ad + an) * bd;
    let right = (b.measure_index() as i128 * bd + bn) * ad;
    left.cmp(&right)
}
