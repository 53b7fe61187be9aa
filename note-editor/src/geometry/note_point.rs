//! Placing notes on lanes, and finding them again under the mouse.

use itertools::Itertools;

use super::lines::{LaneLineCache, LinePointInfo, LineSegment};
use crate::{
    model::{Guid, Lane, Note},
    primitives::{
        math::{inverse_lerp, lerp, Rect, Vector2},
        Fraction, Measure,
    },
    timeline::Timeline,
};

/// Height of a note rectangle in pixels.
pub const NOTE_HEIGHT: f64 = 10.0;

/// Lane cell under the mouse.
#[derive(Debug, Clone, PartialEq)]
pub struct NotePointInfo {
    pub lane: Guid,
    pub line_point_info: LinePointInfo,
    /// Column, the numerator of `horizontal_index / lane.division`.
    pub horizontal_index: u32,
    /// Numerator of the measure position
    /// `vertical_index / measure_division`.
    pub vertical_index: u32,
}

/// Left edge and width of one column at a vertical position of `measure`.
///
/// `horizontal` selects the column, counted in `1 / denominator` of the lane
/// width. `None` when the lane does not cross that height of the measure.
pub fn get_note_point_info(
    lines: &[LineSegment],
    measure: &Measure,
    horizontal: Fraction,
    vertical: Fraction,
) -> Option<LinePointInfo> {
    if horizontal.denominator == 0 {
        return None;
    }
    let y = measure.y + measure.height() * (1.0 - vertical.to01());
    let line = lines.iter().find(|line| {
        line.measure_index == measure.index
            && line.start.point.y >= y
            && line.end.point.y <= y
    })?;
    let (start, end) = (&line.start, &line.end);
    let rate = match inverse_lerp(end.point.y, start.point.y, y) {
        rate if rate.is_nan() => 0.0,
        rate => rate,
    };
    let column = |info: &LinePointInfo, offset: f64| {
        info.point.x
            + info.width
                * (horizontal.to01() + offset / horizontal.denominator as f64)
    };
    let left = lerp(column(end, 0.0), column(start, 0.0), rate);
    let right = lerp(column(end, 1.0), column(start, 1.0), rate);
    Some(LinePointInfo::new(left, y, right - left))
}

/// Screen rectangle of a note, `NOTE_HEIGHT` high, centered on its
/// position.
pub fn note_bounds(
    note: &Note,
    timeline: &Timeline,
    cache: &mut LaneLineCache,
) -> Option<Rect> {
    let measure = timeline.measure(note.measure_index)?;
    let lines = cache.lines(timeline, &note.lane);
    let info = get_note_point_info(
        lines,
        measure,
        note.horizontal_position,
        note.measure_position,
    )?;
    Some(Rect::new(
        info.point.x,
        info.point.y - NOTE_HEIGHT / 2.0,
        info.width * note.horizontal_size as f64,
        NOTE_HEIGHT,
    ))
}

/// First cell of the lane grid containing `mouse`.
///
/// The grid is `lane.division` columns by `measure_division` rows; a row
/// catches the mouse within half its height.
pub fn get_note_point_info_from_mouse_position(
    lane: &Lane,
    lines: &[LineSegment],
    measure: &Measure,
    measure_division: u32,
    mouse: Vector2,
) -> Option<NotePointInfo> {
    if measure_division == 0 {
        return None;
    }
    let half_height = measure.height() / measure_division as f64 / 2.0;
    (0..lane.division)
        .cartesian_product(0..measure_division)
        .find_map(|(i, j)| {
            let info = get_note_point_info(
                lines,
                measure,
                Fraction::new(i as i64, lane.division as i64),
                Fraction::new(j as i64, measure_division as i64),
            )?;
            let inside = mouse.x > info.point.x
                && mouse.x < info.point.x + info.width
                && mouse.y > info.point.y - half_height
                && mouse.y < info.point.y + half_height;
            inside.then(|| NotePointInfo {
                lane: lane.guid.clone(),
                line_point_info: info,
                horizontal_index: i,
                vertical_index: j,
            })
        })
}

/// Cell under the mouse on the first lane accepted by `filter`.
pub fn find_note_placement(
    timeline: &Timeline,
    cache: &mut LaneLineCache,
    measure_index: usize,
    measure_division: u32,
    mouse: Vector2,
    filter: impl Fn(&Lane) -> bool,
) -> Option<NotePointInfo> {
    let measure = timeline.measure(measure_index)?;
    timeline
        .lanes()
        .iter()
        .filter(|&lane| filter(lane))
        .find_map(|lane| {
            let lines = cache.lines(timeline, &lane.guid);
            get_note_point_info_from_mouse_position(
                lane,
                lines,
                measure,
                measure_division,
                mouse,
            )
        })
}

/// Notes on visible layers whose rectangle contains `point`.
pub fn hit_test_notes(
    timeline: &Timeline,
    cache: &mut LaneLineCache,
    point: Vector2,
) -> Vec<Guid> {
    timeline
        .notes()
        .iter()
        .filter(|note| timeline.is_visible_layer(&note.layer))
        .filter(|note| {
            note_bounds(note, timeline, cache)
                .map(|bounds| bounds.contains(point))
                .unwrap_or(false)
        })
        .map(|note| note.guid.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{lines::get_lines, test_utils},
        primitives::NormalizedPoint,
    };

    fn lane() -> Lane {
        Lane {
            guid: "lane".into(),
            template_name: "t".into(),
            division: 4,
            points: vec![],
        }
    }

    /// A lane 40 wide at x = 0, shifting 40 to the right per measure.
    fn slanted(measures: &[Measure]) -> Vec<LineSegment> {
        let points = [
            NormalizedPoint::new(0.0, 0.4, 0.0),
            NormalizedPoint::new(1.6, 0.4, 4.0),
        ];
        get_lines(&points, measures)
    }

    #[test]
    fn column_edges() {
        let measures = test_utils::column(4);
        let lines = slanted(&measures);
        let info = get_note_point_info(
            &lines,
            &measures[1],
            Fraction::new(1, 4),
            Fraction::new(1, 2),
        )
        .unwrap();
        // lane left edge at value 1.5 is 60
        assert_eq!(info.point, Vector2::new(70.0, 250.0));
        assert_eq!(info.width, 10.0);
    }

    #[test]
    fn missing_line() {
        let measures = test_utils::column(4);
        let lines = slanted(&measures);
        let info = get_note_point_info(
            &lines,
            &measures[1],
            Fraction::NONE,
            Fraction::new(1, 2),
        );
        assert_eq!(info, None);
        assert_eq!(
            get_note_point_info(
                &lines[..1],
                &measures[2],
                Fraction::new(0, 4),
                Fraction::new(0, 1),
            ),
            None
        );
    }

    #[test]
    fn mouse_cells() {
        let measures = test_utils::column(4);
        let lines = slanted(&measures);
        // at y = 175 the lane spans x 90..130, ten pixels per column
        let hit = get_note_point_info_from_mouse_position(
            &lane(),
            &lines,
            &measures[2],
            4,
            Vector2::new(106.0, 173.0),
        )
        .unwrap();
        assert_eq!(hit.horizontal_index, 1);
        assert_eq!(hit.vertical_index, 1);
        assert_eq!(hit.line_point_info.point.y, 175.0);

        let miss = get_note_point_info_from_mouse_position(
            &lane(),
            &lines,
            &measures[2],
            4,
            Vector2::new(10.0, 173.0),
        );
        assert_eq!(miss, None);
    }
}
