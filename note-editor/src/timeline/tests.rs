use super::*;
use crate::model::{CurveType, SequentialGuids};

fn point(guid: &str, measure_index: usize) -> LanePoint {
    LanePoint {
        guid: guid.into(),
        template_name: "lane".into(),
        horizontal_size: 4,
        horizontal_position: Fraction::new(0, 4),
        measure_index,
        measure_position: Fraction::new(0, 1),
        color: 0xffffff,
    }
}

fn lane(guid: &str, points: &[&str]) -> Lane {
    Lane {
        guid: guid.into(),
        template_name: "lane".into(),
        division: 4,
        points: points.iter().map(|p| p.to_string()).collect(),
    }
}

fn note(guid: &str, measure_index: usize, n: i64, d: i64) -> Note {
    let mut note = Note::new(guid, "tap", "lane", "a");
    note.measure_index = measure_index;
    note.measure_position = Fraction::new(n, d);
    note.horizontal_position = Fraction::new(1, 4);
    note
}

/// Two layers, one lane from measure 0 to 4.
fn timeline() -> Timeline {
    let layers = vec![Layer::new("a", "A"), Layer::new("b", "B")];
    let mut timeline = Timeline::with_measure_count(8, layers);
    for (guid, index) in [("p0", 0), ("p1", 4)] {
        timeline
            .add_lane_point_with(point(guid, index), Record::Skip)
            .unwrap();
    }
    timeline
        .add_lane_with(lane("lane", &["p0", "p1"]), Record::Skip)
        .unwrap();
    timeline
}

#[test]
fn remove_and_undo_keeps_order() {
    let mut timeline = timeline();
    for (guid, index) in [("x", 0), ("y", 1), ("z", 2)] {
        timeline.add_note(note(guid, index, 0, 1)).unwrap();
    }
    let before = timeline.clone();
    let removed = timeline.remove_note("y").unwrap();
    assert_eq!(removed.guid, "y");
    assert!(timeline.note("y").is_none());
    assert_eq!(timeline.note("z").unwrap().measure_index, 2);

    assert!(timeline.undo());
    assert_eq!(timeline, before);
    let guids = timeline.notes().iter().map(|n| n.guid.as_str());
    assert_eq!(guids.collect::<Vec<_>>(), vec!["x", "y", "z"]);
    assert_eq!(timeline.note("z").unwrap().guid, "z");
}

#[test]
fn lookups_follow_shifted_indices() {
    let mut timeline = timeline();
    for (guid, index) in [("w", 0), ("x", 1), ("y", 2), ("z", 3)] {
        timeline.add_note(note(guid, index, 0, 1)).unwrap();
    }
    let resolves = |timeline: &Timeline| {
        timeline.notes().iter().all(|n| {
            timeline.note(&n.guid).map(|found| &found.guid) == Some(&n.guid)
        })
    };
    timeline.remove_note("w").unwrap();
    assert!(resolves(&timeline));
    timeline.remove_note("y").unwrap();
    assert!(resolves(&timeline));
    assert_eq!(timeline.note("z").unwrap().measure_index, 3);
    assert!(timeline.note("w").is_none());

    assert!(timeline.undo());
    assert!(timeline.undo());
    assert!(resolves(&timeline));
    let guids = timeline.notes().iter().map(|n| n.guid.as_str());
    assert_eq!(guids.collect::<Vec<_>>(), vec!["w", "x", "y", "z"]);
    assert!(timeline.redo());
    assert!(resolves(&timeline));
    assert!(timeline.note("w").is_none());
    assert_eq!(timeline.note("x").unwrap().measure_index, 1);
}

#[test]
fn undo_redo_restores_structure() {
    let mut timeline = timeline();
    let start = timeline.clone();
    timeline.add_note(note("n1", 1, 1, 4)).unwrap();
    timeline.add_note(note("n2", 2, 0, 1)).unwrap();
    timeline
        .add_note_line(NoteLine::new("line", "n1", "n2"))
        .unwrap();
    timeline.set_measure_beat(3, Fraction::new(7, 8)).unwrap();
    let end = timeline.clone();

    for _ in 0..4 {
        assert!(timeline.undo());
    }
    assert!(!timeline.undo());
    assert_eq!(timeline, start);
    for _ in 0..4 {
        assert!(timeline.redo());
    }
    assert!(!timeline.redo());
    assert_eq!(timeline, end);
    assert_eq!(timeline.measure(3).unwrap().beat, Fraction::new(7, 8));
}

#[test]
fn skip_is_not_recorded() {
    let mut timeline = timeline();
    assert!(!timeline.can_undo());
    timeline
        .add_note_with(note("n", 0, 0, 1), Record::Skip)
        .unwrap();
    assert!(!timeline.can_undo());
    assert!(timeline.note("n").is_some());
}

#[test]
fn duplicate_guids() {
    let mut timeline = timeline();
    timeline.add_note(note("n", 0, 0, 1)).unwrap();
    assert_eq!(
        timeline.add_note(note("n", 1, 0, 1)),
        Err(TimelineError::DuplicateGuid("n".into()))
    );
    assert_eq!(
        timeline.add_lane_point(point("p0", 2)),
        Err(TimelineError::DuplicateGuid("p0".into()))
    );
}

#[test]
fn note_must_fit_lane() {
    let mut timeline = timeline();
    let mut wide = note("wide", 0, 0, 1);
    wide.horizontal_size = 4;
    assert!(matches!(
        timeline.add_note(wide),
        Err(TimelineError::NoteOutOfLane {
            first: 1,
            last: 4,
            division: 4,
            ..
        })
    ));
    let mut lost = note("lost", 0, 0, 1);
    lost.lane = "nowhere".into();
    assert_eq!(
        timeline.add_note(lost),
        Err(TimelineError::UnknownLane("nowhere".into()))
    );
    let far = note("far", 8, 0, 1);
    assert_eq!(
        timeline.add_note(far),
        Err(TimelineError::UnknownMeasure(8))
    );
    assert!(timeline.notes().is_empty());
}

#[test]
fn update_normalizes_and_validates() {
    let mut timeline = timeline();
    timeline.add_note(note("n", 0, 0, 1)).unwrap();
    timeline
        .update_note("n", |n| {
            n.horizontal_position = Fraction::new(3, 4);
            n.horizontal_size = -2;
            n.guid = "renamed".into();
        })
        .unwrap();
    let updated = timeline.note("n").unwrap();
    assert_eq!(updated.columns(), (1, 2));
    assert_eq!(timeline.history().len(), 2);

    let result = timeline.update_note("n", |n| n.horizontal_size = 9);
    assert!(result.is_err());
    assert_eq!(timeline.note("n").unwrap().horizontal_size, 2);

    timeline.update_note("n", |_| ()).unwrap();
    assert_eq!(timeline.history().len(), 2);
}

#[test]
fn locked_layer_refuses_edits() {
    let mut timeline = timeline();
    timeline.add_note(note("n", 0, 0, 1)).unwrap();
    timeline.set_layer_lock("a", true).unwrap();
    assert!(timeline.is_locked_layer("a"));
    let before = timeline.clone();

    let locked = Err(TimelineError::LayerLocked("a".into()));
    assert_eq!(timeline.add_note(note("m", 1, 0, 1)), locked);
    assert_eq!(timeline.remove_note("n").map(|_| ()), locked);
    assert_eq!(timeline.update_note("n", |n| n.measure_index = 3), locked);
    assert_eq!(timeline.remove_layer("a"), locked);
    assert_eq!(timeline, before);

    let mut other = note("m", 1, 0, 1);
    other.layer = "b".into();
    timeline.add_note(other).unwrap();
    assert_eq!(
        timeline.update_note("m", |n| n.layer = "a".into()),
        locked
    );
}

#[test]
fn failed_batch_rolls_back() {
    let mut timeline = timeline();
    timeline.add_note(note("n", 0, 0, 1)).unwrap();
    let before = timeline.clone();
    let result = timeline.batch(|timeline| {
        timeline.add_note(note("m", 1, 0, 1))?;
        timeline.remove_note("n")?;
        timeline.remove_note("missing")?;
        Ok(())
    });
    assert_eq!(result, Err(TimelineError::UnknownObject("missing".into())));
    assert_eq!(timeline, before);
    assert_eq!(timeline.history().len(), 1);
    assert!(timeline.undo());
    assert!(timeline.notes().is_empty());
}

#[test]
fn batch_is_one_entry() {
    let mut timeline = timeline();
    timeline
        .batch(|timeline| {
            timeline.add_note(note("x", 0, 0, 1))?;
            timeline.add_note(note("y", 0, 1, 2))
        })
        .unwrap();
    assert_eq!(timeline.history().len(), 1);
    assert!(timeline.undo());
    assert!(timeline.notes().is_empty());
}

#[test]
fn lanes() {
    let mut timeline = timeline();
    assert_eq!(
        timeline.add_lane(lane("short", &["p0"])),
        Err(TimelineError::TooFewLanePoints(1))
    );
    assert_eq!(
        timeline.add_lane(lane("broken", &["p0", "nope"])),
        Err(TimelineError::UnknownObject("nope".into()))
    );
    assert_eq!(
        timeline.remove_lane_point("p1").map(|_| ()),
        Err(TimelineError::LanePointInUse("p1".into()))
    );
    timeline.add_lane_point(point("p2", 2)).unwrap();
    timeline
        .update_lane("lane", |lane| lane.points.push("p2".into()))
        .unwrap();
    assert_eq!(timeline.lane("lane").unwrap().points, ["p0", "p2", "p1"]);
    timeline.remove_lane("lane").unwrap();
    timeline.remove_lane_point("p1").unwrap();
    assert!(timeline.lane_point("p1").is_none());
}

#[test]
fn optimize_connected_lanes() {
    let mut timeline = timeline();
    timeline.add_lane_point(point("p2", 6)).unwrap();
    timeline.add_lane(lane("next", &["p1", "p2"])).unwrap();
    let mut moved = note("n", 5, 0, 1);
    moved.lane = "next".into();
    timeline.add_note(moved).unwrap();

    assert_eq!(timeline.optimize_lanes(), Ok(1));
    assert!(timeline.lane("next").is_none());
    assert_eq!(timeline.lane("lane").unwrap().points, ["p0", "p1", "p2"]);
    assert_eq!(timeline.note("n").unwrap().lane, "lane");
    assert_eq!(timeline.optimize_lanes(), Ok(0));

    assert!(timeline.undo());
    assert_eq!(timeline.note("n").unwrap().lane, "next");
    assert_eq!(timeline.lanes().len(), 2);
}

#[test]
fn extend_lane_past_last_point() {
    let mut timeline = timeline();
    timeline.add_note(note("inside", 3, 1, 2)).unwrap();
    let mut guids = SequentialGuids::new("ext");
    assert_eq!(timeline.extend_lane("inside", &mut guids), Ok(false));

    timeline.add_note(note("after", 5, 1, 4)).unwrap();
    assert_eq!(timeline.extend_lane("after", &mut guids), Ok(true));
    let lane = timeline.lane("lane").unwrap();
    assert_eq!(lane.points, ["p0", "p1", "ext0"]);
    let added = timeline.lane_point("ext0").unwrap();
    assert_eq!(added.measure_index, 6);
    assert_eq!(added.horizontal_size, 4);
    assert_eq!(added.template_name, "lane");
}

#[test]
fn move_notes_keeps_spacing() {
    let mut timeline = timeline();
    timeline.add_note(note("x", 1, 1, 3)).unwrap();
    timeline.add_note(note("y", 1, 3, 4)).unwrap();
    let target = ChartPosition::new(2, Fraction::new(5, 6));
    timeline
        .move_notes(&["x".into(), "y".into()], target)
        .unwrap();
    let y = timeline.note("y").unwrap();
    assert_eq!(y.measure_index, 3);
    assert_eq!(y.measure_position, Fraction::new(1, 4));
    assert!(timeline.undo());
    assert_eq!(timeline.note("x").unwrap().measure_index, 1);
    assert_eq!(timeline.note("y").unwrap().measure_index, 1);
}

#[test]
fn cut_and_paste() {
    let mut timeline = timeline();
    timeline.add_note(note("x", 1, 1, 3)).unwrap();
    timeline.add_note(note("y", 2, 0, 1)).unwrap();
    let cut = timeline
        .cut_notes(&["x".into(), "y".into()])
        .unwrap();
    assert!(timeline.notes().is_empty());

    let mut guids = SequentialGuids::new("copy");
    let pasted = timeline.paste_notes(&cut, 2, &mut guids).unwrap();
    assert_eq!(pasted, vec!["copy0", "copy1"]);
    let x = timeline.note("copy0").unwrap();
    assert_eq!(x.measure_index, 2);
    assert_eq!(x.measure_position, Fraction::new(1, 3));
    assert_eq!(timeline.note("copy1").unwrap().measure_index, 3);

    assert!(timeline.undo());
    assert!(timeline.notes().is_empty());
    assert!(timeline.undo());
    assert_eq!(timeline.notes().len(), 2);
    assert!(timeline.note("x").is_some());

    // past the last measure nothing is pasted
    let before = timeline.clone();
    assert!(timeline.paste_notes(&cut, 7, &mut guids).is_err());
    assert_eq!(timeline, before);
    assert_eq!(timeline.paste_notes(&[], 0, &mut guids), Ok(vec![]));
}

#[test]
fn one_start_bpm() {
    let mut timeline = timeline();
    let bpm = |guid: &str, index| {
        OtherObject::new(
            guid,
            OtherObjectType::Bpm,
            150.0,
            ChartPosition::measure_start(index),
            "b",
        )
    };
    timeline.add_other_object(bpm("start", 0)).unwrap();
    assert_eq!(
        timeline.add_other_object(bpm("again", 0)),
        Err(TimelineError::DuplicateStartBpm("start".into()))
    );
    timeline.add_other_object(bpm("later", 2)).unwrap();
    assert_eq!(
        timeline.update_other_object("later", |o| o.measure_index = 0),
        Err(TimelineError::DuplicateStartBpm("start".into()))
    );
    let required = TimelineError::StartBpmRequired("start".into());
    assert_eq!(
        timeline.update_other_object("start", |o| o.measure_index = 1),
        Err(required.clone())
    );
    assert_eq!(timeline.remove_other_object("start").unwrap_err(), required);
    timeline
        .update_other_object("start", |o| o.value = 180.0.into())
        .unwrap();
    assert!(!timeline.ensure_default_bpm());

    // the start BPM outlives its layer
    timeline.remove_layer("b").unwrap();
    assert_eq!(timeline.other_object("start").unwrap().layer, "a");
    assert!(timeline.other_object("later").is_none());
    assert!(timeline.validate().is_empty());
    assert!(timeline.undo());
    assert_eq!(timeline.other_object("start").unwrap().layer, "b");
    assert!(timeline.other_object("later").is_some());
}

#[test]
fn note_lines() {
    let mut timeline = timeline();
    timeline.add_note(note("h", 0, 0, 1)).unwrap();
    assert_eq!(
        timeline.add_note_line(NoteLine::new("line", "h", "t")),
        Err(TimelineError::UnknownObject("t".into()))
    );
    timeline.add_note(note("t", 1, 0, 1)).unwrap();
    timeline
        .add_note_line(NoteLine::new("line", "h", "t"))
        .unwrap();
    timeline
        .update_note_line("line", |line| {
            line.curve.curve_type = CurveType::Bezier
        })
        .unwrap();
    assert_eq!(
        timeline.note_line("line").unwrap().curve.curve_type,
        CurveType::Bezier
    );
    assert_eq!(timeline.note_lines_of("t").count(), 1);

    // no cascade
    timeline.remove_note("t").unwrap();
    assert!(timeline.note_line("line").is_some());
    timeline.remove_note_line("line").unwrap();
    assert!(timeline.note_lines().is_empty());
}

#[test]
fn layers() {
    let mut timeline = timeline();
    timeline.add_note(note("x", 0, 0, 1)).unwrap();
    let mut y = note("y", 1, 0, 1);
    y.layer = "b".into();
    timeline.add_note(y).unwrap();
    timeline
        .add_note_line(NoteLine::new("line", "x", "y"))
        .unwrap();

    timeline.rename_layer("b", "Second").unwrap();
    assert_eq!(timeline.layer("b").unwrap().name, "Second");
    timeline.set_layer_visible("b", false).unwrap();
    assert!(!timeline.is_visible_layer("b"));
    assert!(!timeline.is_visible_layer("missing"));

    let before = timeline.clone();
    timeline.remove_layer("b").unwrap();
    assert!(timeline.layer("b").is_none());
    assert!(timeline.note("y").is_none());
    assert!(timeline.note_line("line").is_none());
    assert_eq!(
        timeline.remove_layer("a"),
        Err(TimelineError::LastLayer("a".into()))
    );
    assert!(timeline.undo());
    assert_eq!(timeline, before);

    timeline.merge_layer("b", "a").unwrap();
    assert_eq!(timeline.layers().len(), 1);
    assert_eq!(timeline.note("y").unwrap().layer, "a");
    assert!(timeline.note_line("line").is_some());
}

#[test]
fn default_bpm_and_time() {
    let mut timeline = timeline();
    assert!(timeline.ensure_default_bpm());
    assert!(!timeline.ensure_default_bpm());
    assert!(!timeline.can_undo());
    let bpm = &timeline.other_objects()[0];
    assert!(bpm.is_bpm());
    assert_eq!(bpm.layer, "a");

    timeline
        .add_other_object(OtherObject::new(
            "fast",
            OtherObjectType::Bpm,
            240.0,
            ChartPosition::measure_start(2),
            "a",
        ))
        .unwrap();
    let calculator = timeline.calculate_time();
    assert_eq!(calculator.get_time(2.0), 4.0);
    assert_eq!(calculator.get_time(3.0), 5.0);
    assert_eq!(timeline.measure(2).unwrap().begin_time, 4.0);
    assert_eq!(timeline.measure(2).unwrap().end_time, 5.0);
}

#[test]
fn measure_beats() {
    let mut timeline = timeline();
    assert_eq!(
        timeline.set_measure_beat(1, Fraction::new(0, 4)),
        Err(TimelineError::InvalidBeat {
            index: 1,
            beat: Fraction::new(0, 4).to_string()
        })
    );
    assert!(timeline.set_measure_beat(1, Fraction::NONE).is_err());
    assert_eq!(
        timeline.set_measure_beat(99, Fraction::new(3, 4)),
        Err(TimelineError::UnknownMeasure(99))
    );
    timeline.set_measure_beat(1, Fraction::new(4, 4)).unwrap();
    assert!(!timeline.can_undo());
    timeline.set_measure_beat(1, Fraction::new(3, 4)).unwrap();
    assert!(timeline.undo());
    assert_eq!(timeline.measure(1).unwrap().beat, Fraction::new(4, 4));
}

#[test]
fn generation_and_dirty() {
    let mut timeline = timeline();
    timeline.save();
    assert!(!timeline.is_dirty());
    let generation = timeline.generation();
    timeline.add_note(note("n", 0, 0, 1)).unwrap();
    assert!(timeline.is_dirty());
    assert!(timeline.generation() > generation);
    let copy = timeline.clone();
    assert_eq!(copy.generation(), timeline.generation());

    timeline.save();
    assert!(!timeline.is_dirty());
    assert!(timeline.can_undo());
    assert_eq!(timeline.last_populated_measure(), Some(4));
}
