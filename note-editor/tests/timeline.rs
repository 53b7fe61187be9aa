use itertools::Itertools;
use note_editor::{
    geometry::{
        lines::{resolve_lane_lines, LaneLineCache},
        note_line::resolve_note_line_curve,
    },
    model::{
        CurveType, Lane, LanePoint, Layer, Note, NoteLine, OtherObject,
        OtherObjectType,
    },
    primitives::{
        layout::{LayoutSettings, MeasureLayout, Viewport},
        sort_measure, ChartPosition, Fraction, Measure,
    },
    timeline::{Record, Timeline, TimelineData},
};

/// Measures one unit wide and 100 pixels high, stacked upwards.
struct UnitLayout;

impl MeasureLayout for UnitLayout {
    fn name(&self) -> &'static str {
        "unit"
    }

    fn layout(
        &self,
        _settings: &LayoutSettings,
        _viewport: &Viewport,
        measures: &mut [Measure],
    ) {
        let count = measures.len();
        for (index, measure) in measures.iter_mut().enumerate() {
            measure.x = 0.0;
            measure.width = 1.0;
            measure.y = (count - index - 1) as f64 * 100.0;
            measure.set_height(100.0, index as f64 * 100.0);
            measure.is_visible = true;
        }
    }
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn point(guid: &str, measure_index: usize, x: i64) -> LanePoint {
    LanePoint {
        guid: guid.into(),
        template_name: "main".into(),
        horizontal_size: 1,
        horizontal_position: Fraction::new(x, 1),
        measure_index,
        measure_position: Fraction::new(0, 1),
        color: 0xffffff,
    }
}

fn note(guid: &str, measure_index: usize, position: Fraction) -> Note {
    let mut note = Note::new(guid, "tap", "lane", "layer");
    note.measure_index = measure_index;
    note.measure_position = position;
    note
}

/// A lane slanting one measure width to the right over measures 0..4.
fn timeline() -> Timeline {
    let layers = vec![Layer::new("layer", "Layer 1")];
    let mut timeline = Timeline::with_measure_count(8, layers);
    timeline
        .add_lane_point_with(point("p0", 0, 0), Record::Skip)
        .expect("Can not add lane point");
    timeline
        .add_lane_point_with(point("p1", 4, 1), Record::Skip)
        .expect("Can not add lane point");
    timeline
        .add_lane_with(
            Lane {
                guid: "lane".into(),
                template_name: "main".into(),
                division: 1,
                points: vec!["p0".into(), "p1".into()],
            },
            Record::Skip,
        )
        .expect("Can not add lane");
    timeline.layout_measures(
        &UnitLayout,
        &LayoutSettings::default(),
        &Viewport::default(),
    );
    timeline
}

#[test]
fn slanted_lane_has_a_segment_per_measure() {
    init();
    let timeline = timeline();
    let lane = timeline.lane("lane").expect("Can not find lane");
    let lines = resolve_lane_lines(lane, &timeline);
    assert_eq!(lines.len(), 4);
    lines
        .into_iter()
        .zip_eq(0..4)
        .map(|(line, index)| {
            assert_eq!(line.measure_index, index);
            assert_eq!(line.start.point.x, index as f64 / 4.0);
            assert_eq!(line.end.point.x, (index + 1) as f64 / 4.0);
            assert_eq!(line.start.width, 1.0);
            // start is the bottom edge of the measure
            assert_eq!(line.start.point.y - line.end.point.y, 100.0);
        })
        .count();
}

#[test]
fn equal_positions_with_other_denominators() {
    let a = note("a", 2, Fraction::new(1, 4));
    let b = note("b", 2, Fraction::new(2, 8));
    assert!(a.is_same_measure_position(&b));
    assert!(sort_measure(&a, &b).is_eq());
    let c = note("c", 2, Fraction::new(3, 8));
    assert!(!a.is_same_measure_position(&c));
    assert!(sort_measure(&a, &c).is_lt());
}

#[test]
fn note_line_loses_its_curve_with_an_end() {
    init();
    let mut timeline = timeline();
    timeline
        .add_note(note("head", 0, Fraction::new(1, 2)))
        .expect("Can not add note");
    timeline
        .add_note(note("tail", 2, Fraction::new(0, 1)))
        .expect("Can not add note");
    let mut line = NoteLine::new("line", "head", "tail");
    line.curve.curve_type = CurveType::EaseInQuad;
    timeline.add_note_line(line).expect("Can not add note line");

    let mut cache = LaneLineCache::new();
    let line = timeline.note_line("line").expect("Can not find line").clone();
    let segments = resolve_note_line_curve(&line, &timeline, &mut cache);
    assert!(!segments.is_empty());
    assert_eq!(segments.first().map(|s| s.measure_index), Some(0));
    assert_eq!(segments.last().map(|s| s.measure_index), Some(1));

    timeline.remove_note("tail").expect("Can not remove note");
    assert!(timeline.note_line("line").is_some());
    let segments = resolve_note_line_curve(&line, &timeline, &mut cache);
    assert!(segments.is_empty());

    assert!(timeline.undo());
    let segments = resolve_note_line_curve(&line, &timeline, &mut cache);
    assert!(!segments.is_empty());
}

#[test]
fn undo_and_redo_many_edits() {
    init();
    let mut timeline = timeline();
    let start = timeline.clone();

    timeline
        .add_note(note("a", 1, Fraction::new(1, 4)))
        .expect("Can not add note");
    timeline
        .add_note(note("b", 3, Fraction::new(3, 4)))
        .expect("Can not add note");
    timeline
        .add_note_line(NoteLine::new("line", "a", "b"))
        .expect("Can not add note line");
    timeline
        .update_note("a", |n| n.measure_position = Fraction::new(1, 2))
        .expect("Can not update note");
    timeline
        .add_other_object(OtherObject::new(
            "bpm",
            OtherObjectType::Bpm,
            180.0,
            ChartPosition::measure_start(2),
            "layer",
        ))
        .expect("Can not add tempo");
    timeline
        .set_measure_beat(5, Fraction::new(3, 4))
        .expect("Can not set beat");
    timeline.remove_note("b").expect("Can not remove note");
    let end = timeline.clone();

    let edits = 7;
    for _ in 0..edits {
        assert!(timeline.undo());
    }
    assert!(!timeline.can_undo());
    assert_eq!(timeline, start);

    for _ in 0..edits {
        assert!(timeline.redo());
    }
    assert!(!timeline.can_redo());
    assert_eq!(timeline, end);
}

#[test]
fn data_survives_json() {
    let mut timeline = timeline();
    timeline
        .add_note(note("a", 1, Fraction::new(1, 3)))
        .expect("Can not add note");
    timeline
        .add_note(note("b", 2, Fraction::new(0, 1)))
        .expect("Can not add note");
    let mut line = NoteLine::new("line", "a", "b");
    line.curve.curve_type = CurveType::Bezier;
    line.curve.x = 0.25;
    timeline.add_note_line(line).expect("Can not add note line");
    timeline
        .add_other_object(OtherObject::new(
            "stop",
            OtherObjectType::Stop,
            2.0,
            ChartPosition::new(1, Fraction::new(1, 2)),
            "layer",
        ))
        .expect("Can not add stop");

    let json =
        serde_json::to_string(timeline.data()).expect("Can not serialize");
    let data: TimelineData =
        serde_json::from_str(&json).expect("Can not deserialize");
    assert_eq!(&data, timeline.data());
    let restored = Timeline::from_data(data, timeline.layers().to_vec());
    assert_eq!(restored, timeline);
    assert!(restored.note("a").is_some());
    assert!(!restored.can_undo());
}
