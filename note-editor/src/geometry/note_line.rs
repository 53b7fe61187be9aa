//! Note lines resolved against the timeline.

use super::{
    curve::{create_note_line_calculator, get_note_line_lines},
    lines::{LaneLineCache, LineSegment},
    note_point::note_bounds,
};
use crate::{
    model::{Guid, Note, NoteLine},
    primitives::{
        math::{approximately, inverse_lerp, is_in_square, lerp, Vector2},
        sort_measure, Measure, MeasureObject, NormalizedPoint,
    },
    timeline::Timeline,
};

/// Anchor of a note line end: the note rectangle in measure widths.
pub fn note_anchor(
    note: &Note,
    timeline: &Timeline,
    cache: &mut LaneLineCache,
) -> Option<NormalizedPoint> {
    let bounds = note_bounds(note, timeline, cache)?;
    let measure = timeline.measure(note.measure_index)?;
    if measure.width <= 0.0 {
        return None;
    }
    Some(NormalizedPoint::new(
        (bounds.x - measure.x) / measure.width,
        bounds.width / measure.width,
        note.measure_value(),
    ))
}

/// Head and tail notes, ordered on the chart.
fn ends<'a>(
    line: &NoteLine,
    timeline: &'a Timeline,
) -> Option<[&'a Note; 2]> {
    let head = timeline.note(&line.head);
    let tail = timeline.note(&line.tail);
    let (Some(head), Some(tail)) = (head, tail) else {
        log::debug!("note line `{}` has a missing end", line.guid);
        return None;
    };
    match sort_measure(tail, head).is_lt() {
        true => Some([tail, head]),
        false => Some([head, tail]),
    }
}

/// Segments of a note line. Empty when an end note is missing or can not
/// be placed on its lane.
pub fn resolve_note_line_curve(
    line: &NoteLine,
    timeline: &Timeline,
    cache: &mut LaneLineCache,
) -> Vec<LineSegment> {
    let Some([head, tail]) = ends(line, timeline) else {
        return Vec::new();
    };
    let anchors = (
        note_anchor(head, timeline, cache),
        note_anchor(tail, timeline, cache),
    );
    let (Some(head), Some(tail)) = anchors else {
        log::debug!("note line `{}` has an unplaced end", line.guid);
        return Vec::new();
    };
    let measures = timeline.measures();
    let calculator =
        create_note_line_calculator(&line.curve, head, tail, measures);
    get_note_line_lines(calculator.as_ref(), line.curve.curve_type, measures)
}

/// Resolved segments of one note line, for hit-testing.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteLineHitInfo {
    pub note_line: Guid,
    pub segments: Vec<LineSegment>,
}

impl NoteLineHitInfo {
    pub fn new(
        line: &NoteLine,
        timeline: &Timeline,
        cache: &mut LaneLineCache,
    ) -> Self {
        Self {
            note_line: line.guid.clone(),
            segments: resolve_note_line_curve(line, timeline, cache),
        }
    }

    /// Segment of `measure_index` under `pos`.
    ///
    /// A point on the start edge counts, so a note line is hit right at
    /// its head note.
    pub fn overlap(
        &self,
        pos: Vector2,
        measure_index: usize,
    ) -> Option<&LineSegment> {
        self.segments
            .iter()
            .filter(|line| line.measure_index == measure_index)
            .find(|line| {
                let (start, end) = (&line.start, &line.end);
                let on_start = approximately(start.point.y, pos.y, 0.001)
                    && start.point.x <= pos.x
                    && pos.x <= start.point.x + start.width;
                on_start
                    || is_in_square(
                        start.point,
                        end.point,
                        end.right(),
                        start.right(),
                        pos,
                    )
            })
    }
}

/// Where a normalized point of the line lies on screen.
///
/// `x` is in measure widths, `t` runs from the head (0) to the tail (1).
fn line_space_point(
    measures: &[Measure],
    from: f64,
    to: f64,
    x: f64,
    t: f64,
) -> Option<Vector2> {
    let value = from + (to - from) * t;
    let measure = measures.get(value.floor().max(0.0) as usize)?;
    Some(measure_point(measure, x, value))
}

fn measure_point(measure: &Measure, x: f64, value: f64) -> Vector2 {
    Vector2::new(
        measure.x + measure.width * x,
        lerp(measure.y, measure.y + measure.height(), 1.0 - value.fract()),
    )
}

/// Screen position of the Bezier control point of the line.
pub fn bezier_control_point(
    line: &NoteLine,
    timeline: &Timeline,
) -> Option<Vector2> {
    let [head, tail] = ends(line, timeline)?;
    line_space_point(
        timeline.measures(),
        head.measure_value(),
        tail.measure_value(),
        line.curve.x,
        line.curve.y,
    )
}

/// A snap target for the control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCandidate {
    pub point: Vector2,
    /// Value for `curve.x` and `curve.y`.
    pub normalized: Vector2,
}

/// Grid of control point positions between the ends of the line.
///
/// Columns split the measure width in `horizontal_division`, rows split
/// each measure in `measure_division`. A line without length has none.
pub fn bezier_control_candidates(
    line: &NoteLine,
    timeline: &Timeline,
    horizontal_division: u32,
    measure_division: u32,
) -> Vec<BezierCandidate> {
    let Some([head, tail]) = ends(line, timeline) else {
        return Vec::new();
    };
    if horizontal_division == 0 || measure_division == 0 {
        return Vec::new();
    }
    let (from, to) = (head.measure_value(), tail.measure_value());
    if to <= from {
        return Vec::new();
    }
    let measures = timeline.measures();
    let mut candidates = Vec::new();
    for column in 0..=horizontal_division {
        let x = column as f64 / horizontal_division as f64;
        for index in head.measure_index..=tail.measure_index {
            let Some(measure) = measures.get(index) else {
                break;
            };
            for row in 0..measure_division {
                let row = row as f64 / measure_division as f64;
                let value = index as f64 + row;
                if value < from || value > to {
                    continue;
                }
                let t = inverse_lerp(from, to, value);
                candidates.push(BezierCandidate {
                    point: measure_point(measure, x, value),
                    normalized: Vector2::new(x, t),
                });
            }
        }
    }
    candidates
}
