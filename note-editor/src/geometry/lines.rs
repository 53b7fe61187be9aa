//! Lane lines: the pixel outline of a lane, one segment per crossed
//! measure.

use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    model::{Guid, Lane},
    primitives::{
        math::{inverse_lerp, lerp, Vector2},
        sort_measure, Measure, NormalizedPoint,
    },
    timeline::Timeline,
};

/// Left edge and width of a line at one height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinePointInfo {
    pub point: Vector2,
    pub width: f64,
}

impl LinePointInfo {
    pub fn new(x: f64, y: f64, width: f64) -> Self {
        Self {
            point: Vector2::new(x, y),
            width,
        }
    }

    pub fn right(&self) -> Vector2 {
        Vector2::new(self.point.x + self.width, self.point.y)
    }
}

/// Part of a line inside one measure. `start` is the earlier end, so it
/// lies below `end` on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub measure_index: usize,
    pub start: LinePointInfo,
    pub end: LinePointInfo,
}

/// Pixel point of `value` on the line from `p1` to `p2`, drawn in
/// `measure`.
fn point_at(
    measure: &Measure,
    p1: &NormalizedPoint,
    p2: &NormalizedPoint,
    value: f64,
) -> LinePointInfo {
    let t = inverse_lerp(p1.value, p2.value, value);
    LinePointInfo::new(
        measure.x + measure.width * lerp(p1.x, p2.x, t),
        measure.y + measure.height() * (measure.index as f64 + 1.0 - value),
        measure.width * lerp(p1.width, p2.width, t),
    )
}

/// Segments of the polyline through `points`.
///
/// Points are ordered by value first. Pairs that do not advance are
/// skipped, as are measures missing from `measures`.
///
/// ```
/// use note_editor::geometry::lines::get_lines;
/// use note_editor::primitives::{Fraction, Measure, NormalizedPoint};
///
/// let measures = (0..4)
///     .map(|i| {
///         let mut measure = Measure::new(i, Fraction::new(4, 4));
///         measure.width = 100.0;
///         measure.set_height(100.0, i as f64 * 100.0);
///         measure
///     })
///     .collect::<Vec<_>>();
/// let points = [
///     NormalizedPoint::new(0.0, 0.25, 0.0),
///     NormalizedPoint::new(0.5, 0.25, 2.0),
/// ];
/// let lines = get_lines(&points, &measures);
/// assert_eq!(lines.len(), 2);
/// assert_eq!(lines[1].start.point.x, 25.0);
/// ```
pub fn get_lines(
    points: &[NormalizedPoint],
    measures: &[Measure],
) -> Vec<LineSegment> {
    let mut lines = Vec::new();
    let sorted = points.iter().sorted_by(|a, b| a.value.total_cmp(&b.value));
    for (p1, p2) in sorted.tuple_windows() {
        if p2.value <= p1.value {
            continue;
        }
        let mut v1 = p1.value;
        loop {
            let index = v1.floor() as usize;
            let v2 = (v1.floor() + 1.0).min(p2.value);
            let Some(measure) = measures.get(index) else {
                log::debug!("line leaves the chart at measure {}", index);
                break;
            };
            lines.push(LineSegment {
                measure_index: index,
                start: point_at(measure, p1, p2, v1),
                end: point_at(measure, p1, p2, v2),
            });
            if v2 >= p2.value {
                break;
            }
            v1 = v2;
        }
    }
    lines
}

/// Lines of a lane. Missing lane points are skipped.
pub fn resolve_lane_lines(
    lane: &Lane,
    timeline: &Timeline,
) -> Vec<LineSegment> {
    let points = lane
        .points
        .iter()
        .filter_map(|guid| {
            let point = timeline.lane_point(guid);
            if point.is_none() {
                log::debug!("lane `{}`: missing point `{}`", lane.guid, guid);
            }
            point
        })
        .sorted_by(|a, b| sort_measure(*a, *b))
        .map(|point| point.normalized())
        .collect::<Vec<_>>();
    get_lines(&points, timeline.measures())
}

/// Lane lines of one timeline generation.
///
/// Any edit or layout of the timeline changes its generation, which empties
/// the cache on the next lookup.
#[derive(Debug, Clone, Default)]
pub struct LaneLineCache {
    generation: Option<u64>,
    lines: HashMap<Guid, Vec<LineSegment>>,
}

impl LaneLineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of the lane; empty for an unknown lane.
    pub fn lines(
        &mut self,
        timeline: &Timeline,
        lane: &str,
    ) -> &[LineSegment] {
        if self.generation != Some(timeline.generation()) {
            self.lines.clear();
            self.generation = Some(timeline.generation());
        }
        self.lines.entry(lane.to_string()).or_insert_with(|| {
            timeline
                .lane(lane)
                .map(|lane| resolve_lane_lines(lane, timeline))
                .unwrap_or_default()
        })
    }

    /// Lanes resolved for the current generation.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.generation = None;
        self.lines.clear();
    }
}
