//! Shapes of note lines between two anchors.
//!
//! An anchor is the [`NormalizedPoint`] of a placed note: left edge and
//! width as fractions of the measure width, and its measure value. A
//! calculator turns a value between the anchors into a point of the line.

use super::lines::{LinePointInfo, LineSegment};
use crate::{
    model::{Curve, CurveType},
    primitives::{
        math::{inverse_lerp, lerp, quadratic_bezier, Vector2},
        Measure, NormalizedPoint,
    },
};

pub trait NoteLineCalculator {
    fn head(&self) -> &NormalizedPoint;
    fn tail(&self) -> &NormalizedPoint;
    /// Line at `value`, drawn in measure `measure_index`.
    fn line_point_info(
        &self,
        measure_index: usize,
        value: f64,
    ) -> Option<LinePointInfo>;
}

/// Vertical pixel position of `value` inside `measure`.
fn measure_y(measure: &Measure, measure_index: usize, value: f64) -> f64 {
    measure.y + measure.height() * (measure_index as f64 + 1.0 - value)
}

fn ease(curve_type: CurveType) -> fn(f64) -> f64 {
    match curve_type {
        CurveType::EaseInQuad => |t| t * t,
        CurveType::EaseOutQuad => |t| t * (2.0 - t),
        CurveType::None | CurveType::Bezier => |t| t,
    }
}

/// Straight or eased lines. Both edges follow the same eased ratio.
pub struct EaseCalculator<'a> {
    head: NormalizedPoint,
    tail: NormalizedPoint,
    ease: fn(f64) -> f64,
    measures: &'a [Measure],
}

impl<'a> EaseCalculator<'a> {
    pub fn new(
        curve_type: CurveType,
        head: NormalizedPoint,
        tail: NormalizedPoint,
        measures: &'a [Measure],
    ) -> Self {
        Self {
            head,
            tail,
            ease: ease(curve_type),
            measures,
        }
    }
}

impl NoteLineCalculator for EaseCalculator<'_> {
    fn head(&self) -> &NormalizedPoint {
        &self.head
    }
    fn tail(&self) -> &NormalizedPoint {
        &self.tail
    }

    fn line_point_info(
        &self,
        measure_index: usize,
        value: f64,
    ) -> Option<LinePointInfo> {
        let measure = self.measures.get(measure_index)?;
        let (head, tail) = (&self.head, &self.tail);
        let t = (self.ease)(inverse_lerp(head.value, tail.value, value));
        Some(LinePointInfo::new(
            measure.x + measure.width * lerp(head.x, tail.x, t),
            measure_y(measure, measure_index, value),
            measure.width * lerp(head.width, tail.width, t),
        ))
    }
}

/// Point of a [`BezierCurve`] and the curve parameter it was taken at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierSample {
    pub point: Vector2,
    pub t: f64,
}

/// Quadratic Bezier from the head center to the tail center, sampled in
/// normalized space: x in measure widths, y from 0 at the head to 1 at the
/// tail.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    samples: Vec<BezierSample>,
}

impl BezierCurve {
    /// `division` segments; at least one.
    pub fn new(
        head_center: f64,
        control: Vector2,
        tail_center: f64,
        division: usize,
    ) -> Self {
        let division = division.max(1);
        let (p1, p3) =
            (Vector2::new(head_center, 0.0), Vector2::new(tail_center, 1.0));
        let samples = (0..=division)
            .map(|i| {
                let t = i as f64 / division as f64;
                BezierSample {
                    point: quadratic_bezier(t, p1, control, p3),
                    t,
                }
            })
            .collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[BezierSample] {
        &self.samples
    }

    /// x of the curve where it reaches `height`.
    pub fn x_at(&self, height: f64) -> f64 {
        self.interpolate(height, |sample| sample.point.x)
    }

    /// Curve parameter where the curve reaches `height`. Differs from the
    /// height unless the control point sits halfway up.
    pub fn t_at(&self, height: f64) -> f64 {
        self.interpolate(height, |sample| sample.t)
    }

    fn interpolate(
        &self,
        height: f64,
        value: impl Fn(&BezierSample) -> f64,
    ) -> f64 {
        let between = |a: &BezierSample, b: &BezierSample| {
            let n = match inverse_lerp(a.point.y, b.point.y, height) {
                n if n.is_nan() => 0.0,
                n => n,
            };
            lerp(value(a), value(b), n)
        };
        let pairs = self.samples.windows(2);
        if let Some(pair) = pairs.clone().find(|pair| {
            pair[0].point.y <= height && height <= pair[1].point.y
        }) {
            return between(&pair[0], &pair[1]);
        }
        log::debug!("bezier height {} outside of the samples", height);
        match pairs.last() {
            Some(pair) => between(&pair[0], &pair[1]),
            None => self.samples.first().map(value).unwrap_or(0.0),
        }
    }
}

/// Bezier lines. Only the center follows the curve; the width grows
/// linearly from head to tail, and both edges are clamped to the measure.
pub struct BezierCalculator<'a> {
    head: NormalizedPoint,
    tail: NormalizedPoint,
    bezier: BezierCurve,
    measures: &'a [Measure],
}

impl<'a> BezierCalculator<'a> {
    pub fn new(
        curve: &Curve,
        head: NormalizedPoint,
        tail: NormalizedPoint,
        measures: &'a [Measure],
    ) -> Self {
        let measure_height =
            measures.first().map(|m| m.height()).unwrap_or_default();
        let span = (tail.value - head.value) * measure_height;
        let division = ((span / 10.0).floor().max(0.0) as usize).max(10);
        let bezier = BezierCurve::new(
            head.center(),
            Vector2::new(curve.x, curve.y),
            tail.center(),
            division,
        );
        Self {
            head,
            tail,
            bezier,
            measures,
        }
    }

    pub fn curve(&self) -> &BezierCurve {
        &self.bezier
    }
}

impl NoteLineCalculator for BezierCalculator<'_> {
    fn head(&self) -> &NormalizedPoint {
        &self.head
    }
    fn tail(&self) -> &NormalizedPoint {
        &self.tail
    }

    fn line_point_info(
        &self,
        measure_index: usize,
        value: f64,
    ) -> Option<LinePointInfo> {
        let measure = self.measures.get(measure_index)?;
        let (head, tail) = (&self.head, &self.tail);
        let t = inverse_lerp(head.value, tail.value, value);
        let center = measure.x + measure.width * self.bezier.x_at(t);
        let width = measure.width * lerp(head.width, tail.width, t);
        let (min, max) = (measure.x, measure.x + measure.width);
        let left = (center - width / 2.0).clamp(min, max);
        let right = (center + width / 2.0).clamp(min, max);
        Some(LinePointInfo::new(
            left,
            measure_y(measure, measure_index, value),
            right - left,
        ))
    }
}

/// Calculator for the curve type. Anchors are ordered by value first.
pub fn create_note_line_calculator<'a>(
    curve: &Curve,
    head: NormalizedPoint,
    tail: NormalizedPoint,
    measures: &'a [Measure],
) -> Box<dyn NoteLineCalculator + 'a> {
    let (head, tail) = match tail.value < head.value {
        true => (tail, head),
        false => (head, tail),
    };
    match curve.curve_type {
        CurveType::Bezier => {
            Box::new(BezierCalculator::new(curve, head, tail, measures))
        }
        curve_type => {
            Box::new(EaseCalculator::new(curve_type, head, tail, measures))
        }
    }
}

/// Segments of a note line, split at measure borders.
///
/// Straight lines get one segment per measure, curves
/// `max(height / 20, 10)`. A line without length has no segments.
pub fn get_note_line_lines(
    calculator: &dyn NoteLineCalculator,
    curve_type: CurveType,
    measures: &[Measure],
) -> Vec<LineSegment> {
    let (first, last) = (calculator.head().value, calculator.tail().value);
    let mut lines = Vec::new();
    if !(last > first) {
        return lines;
    }
    let mut v1 = first;
    loop {
        let measure_index = v1.floor() as usize;
        let v2 = (v1.floor() + 1.0).min(last);
        let Some(measure) = measures.get(measure_index) else {
            log::debug!("note line leaves the chart at {}", measure_index);
            break;
        };
        let division = match curve_type {
            CurveType::None => 1,
            _ => ((measure.height() / 20.0).floor() as usize).max(10),
        };
        let at = |i: usize| v1 + (v2 - v1) * i as f64 / division as f64;
        for i in 0..division {
            let start = calculator.line_point_info(measure_index, at(i));
            let end = calculator.line_point_info(measure_index, at(i + 1));
            if let (Some(start), Some(end)) = (start, end) {
                lines.push(LineSegment {
                    measure_index,
                    start,
                    end,
                });
            }
        }
        if v2 >= last {
            break;
        }
        v1 = v2;
    }
    lines
}
