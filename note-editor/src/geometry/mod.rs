//! Pixel geometry of lanes, notes and note lines.
//!
//! Everything here reads measure geometry written by a
//! [`crate::primitives::layout::MeasureLayout`]; nothing is drawn. Dangling
//! references never fail loudly: the affected query yields `None` or no
//! segments.

pub mod curve;
pub mod lines;
pub mod note_line;
pub mod note_point;

pub use curve::{
    create_note_line_calculator, get_note_line_lines, BezierCalculator,
    BezierCurve, BezierSample, EaseCalculator, NoteLineCalculator,
};
pub use lines::{
    get_lines, resolve_lane_lines, LaneLineCache, LinePointInfo, LineSegment,
};
pub use note_line::{
    bezier_control_candidates, bezier_control_point, resolve_note_line_curve,
    NoteLineHitInfo,
};
pub use note_point::{
    find_note_placement, get_note_point_info,
    get_note_point_info_from_mouse_position, hit_test_notes, note_bounds,
    NotePointInfo, NOTE_HEIGHT,
};

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::primitives::{
        layout::{LayoutSettings, MeasureLayout, Viewport},
        Fraction, Measure,
    };

    fn place(measure: &mut Measure, count: usize) {
        let i = measure.index;
        measure.x = 0.0;
        measure.width = 100.0;
        measure.y = ((count - i - 1) * 100) as f64;
        measure.set_height(100.0, i as f64 * 100.0);
        measure.is_visible = true;
    }

    /// `count` 100×100 measures stacked upwards from y = 0.
    pub(crate) fn column(count: usize) -> Vec<Measure> {
        (0..count)
            .map(|i| {
                let mut measure = Measure::new(i, Fraction::new(4, 4));
                place(&mut measure, count);
                measure
            })
            .collect()
    }

    /// Lays measures out the way [`column`] builds them.
    pub(crate) struct ColumnLayout;

    impl MeasureLayout for ColumnLayout {
        fn name(&self) -> &'static str {
            "column"
        }

        fn layout(
            &self,
            _: &LayoutSettings,
            _: &Viewport,
            measures: &mut [Measure],
        ) {
            let count = measures.len();
            for measure in measures.iter_mut() {
                place(measure, count);
            }
        }
    }
}
