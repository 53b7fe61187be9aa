//! Timeline owns every object of a chart.
//!
//! Objects live in flat vectors and reference each other by guid. Lookup
//! maps from guid to vector index follow every structural change; only the
//! entries behind an inserted or removed object move. Each change bumps
//! [`Timeline::generation`], which keys the geometry caches.
//!
//! Every structural edit has two forms: `add_note(..)` records the edit in
//! the undo history, `add_note_with(.., Record::Skip)` does not.
//!
//! # Example
//!
//! ```
//! use note_editor::model::{Lane, LanePoint, Layer, Note};
//! use note_editor::primitives::Fraction;
//! use note_editor::timeline::Timeline;
//!
//! let mut timeline =
//!     Timeline::with_measure_count(8, vec![Layer::new("layer", "Layer 1")]);
//! for (guid, index) in [("p0", 0), ("p1", 4)] {
//!     timeline
//!         .add_lane_point(LanePoint {
//!             guid: guid.into(),
//!             template_name: "lane".into(),
//!             horizontal_size: 4,
//!             horizontal_position: Fraction::new(0, 4),
//!             measure_index: index,
//!             measure_position: Fraction::new(0, 1),
//!             color: 0xffffff,
//!         })
//!         .unwrap();
//! }
//! timeline
//!     .add_lane(Lane {
//!         guid: "lane".into(),
//!         template_name: "lane".into(),
//!         division: 4,
//!         points: vec!["p1".into(), "p0".into()],
//!     })
//!     .unwrap();
//! assert_eq!(timeline.lane("lane").unwrap().points, vec!["p0", "p1"]);
//!
//! timeline.add_note(Note::new("n", "tap", "lane", "layer")).unwrap();
//! assert!(timeline.note("n").is_some());
//! assert!(timeline.undo());
//! assert!(timeline.note("n").is_none());
//! assert!(timeline.redo());
//! assert!(timeline.note("n").is_some());
//! ```

use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::atomic::{self, AtomicU64},
};

use derivative::Derivative;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::{TimelineError, TimelineResult},
    model::{
        Guid, GuidSource, Lane, LanePoint, Layer, Note, NoteLine,
        OtherObject, OtherObjectType, UuidSource,
    },
    primitives::{
        layout::{LayoutSettings, MeasureLayout, Viewport},
        sort_measure,
        time_calculator::{TempoEvent, TimeCalculator, DEFAULT_BPM},
        ChartPosition, Fraction, Measure,
    },
};

pub mod group;
pub mod history;
mod validate;

use group::MeasureObjectGroup;
pub use history::{Change, Entity, History, HistoryEntry, Record};
pub use validate::Problem;

static GENERATIONS: AtomicU64 = AtomicU64::new(1);

/// Unique across all timelines of the process.
fn next_generation() -> u64 {
    GENERATIONS.fetch_add(1, atomic::Ordering::Relaxed)
}

/// Persisted part of the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub lane_points: Vec<LanePoint>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub note_lines: Vec<NoteLine>,
    #[serde(default)]
    pub other_objects: Vec<OtherObject>,
}

fn index_by_guid<T>(
    items: &[T],
    guid: impl Fn(&T) -> &Guid,
) -> HashMap<Guid, usize> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| (guid(item).clone(), index))
        .collect()
}

/// Inserts `item` and shifts the map entries of the items behind it.
fn insert_indexed<T>(
    items: &mut Vec<T>,
    map: &mut HashMap<Guid, usize>,
    index: usize,
    item: T,
    guid: impl Fn(&T) -> &Guid,
) {
    let index = index.min(items.len());
    map.insert(guid(&item).clone(), index);
    items.insert(index, item);
    reindex_tail(items, map, index + 1, guid);
}

/// Removes the item under `key` and shifts the entries behind it.
fn remove_indexed<T>(
    items: &mut Vec<T>,
    map: &mut HashMap<Guid, usize>,
    key: &str,
    guid: impl Fn(&T) -> &Guid,
) {
    let Some(index) = map.remove(key) else {
        return;
    };
    items.remove(index);
    reindex_tail(items, map, index, guid);
}

fn reindex_tail<T>(
    items: &[T],
    map: &mut HashMap<Guid, usize>,
    from: usize,
    guid: impl Fn(&T) -> &Guid,
) {
    for (index, item) in items.iter().enumerate().skip(from) {
        if let Some(entry) = map.get_mut(guid(item)) {
            *entry = index;
        }
    }
}

fn unknown(guid: &str) -> TimelineError {
    TimelineError::UnknownObject(guid.to_string())
}

#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Timeline {
    data: TimelineData,
    layers: Vec<Layer>,

    #[derivative(PartialEq = "ignore")]
    note_map: HashMap<Guid, usize>,
    #[derivative(PartialEq = "ignore")]
    lane_map: HashMap<Guid, usize>,
    #[derivative(PartialEq = "ignore")]
    lane_point_map: HashMap<Guid, usize>,
    #[derivative(PartialEq = "ignore")]
    note_line_map: HashMap<Guid, usize>,
    #[derivative(PartialEq = "ignore")]
    other_object_map: HashMap<Guid, usize>,
    #[derivative(PartialEq = "ignore")]
    layer_map: HashMap<Guid, usize>,

    #[derivative(PartialEq = "ignore")]
    generation: u64,
    #[derivative(PartialEq = "ignore")]
    dirty: bool,
    #[derivative(PartialEq = "ignore")]
    history: History,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::from_data(TimelineData::default(), Vec::new())
    }
}

impl Timeline {
    pub fn from_data(data: TimelineData, layers: Vec<Layer>) -> Self {
        let mut timeline = Self {
            data,
            layers,
            note_map: HashMap::new(),
            lane_map: HashMap::new(),
            lane_point_map: HashMap::new(),
            note_line_map: HashMap::new(),
            other_object_map: HashMap::new(),
            layer_map: HashMap::new(),
            generation: next_generation(),
            dirty: false,
            history: History::new(),
        };
        timeline.rebuild_maps();
        timeline
    }

    pub fn new(measures: Vec<Measure>, layers: Vec<Layer>) -> Self {
        let data = TimelineData {
            measures,
            ..Default::default()
        };
        Self::from_data(data, layers)
    }

    /// `count` measures of `4/4`.
    pub fn with_measure_count(count: usize, layers: Vec<Layer>) -> Self {
        let measures = (0..count)
            .map(|index| Measure::new(index, Fraction::new(4, 4)))
            .collect();
        Self::new(measures, layers)
    }

    pub fn data(&self) -> &TimelineData {
        &self.data
    }

    pub fn to_data(&self) -> TimelineData {
        self.data.clone()
    }

    pub fn rebuild_maps(&mut self) {
        self.note_map = index_by_guid(&self.data.notes, |n| &n.guid);
        self.lane_map = index_by_guid(&self.data.lanes, |l| &l.guid);
        self.lane_point_map =
            index_by_guid(&self.data.lane_points, |p| &p.guid);
        self.note_line_map =
            index_by_guid(&self.data.note_lines, |l| &l.guid);
        self.other_object_map =
            index_by_guid(&self.data.other_objects, |o| &o.guid);
        self.layer_map = index_by_guid(&self.layers, |l| &l.guid);
    }

    /// Changes whenever positions or geometry may have changed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark as saved. The history stays.
    pub fn save(&mut self) {
        self.dirty = false;
    }

    pub fn measures(&self) -> &[Measure] {
        &self.data.measures
    }
    pub fn measure(&self, index: usize) -> Option<&Measure> {
        self.data.measures.get(index)
    }
    pub fn notes(&self) -> &[Note] {
        &self.data.notes
    }
    pub fn lanes(&self) -> &[Lane] {
        &self.data.lanes
    }
    pub fn lane_points(&self) -> &[LanePoint] {
        &self.data.lane_points
    }
    pub fn note_lines(&self) -> &[NoteLine] {
        &self.data.note_lines
    }
    pub fn other_objects(&self) -> &[OtherObject] {
        &self.data.other_objects
    }
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn note(&self, guid: &str) -> Option<&Note> {
        self.note_map.get(guid).and_then(|i| self.data.notes.get(*i))
    }
    pub fn lane(&self, guid: &str) -> Option<&Lane> {
        self.lane_map.get(guid).and_then(|i| self.data.lanes.get(*i))
    }
    pub fn lane_point(&self, guid: &str) -> Option<&LanePoint> {
        self.lane_point_map
            .get(guid)
            .and_then(|i| self.data.lane_points.get(*i))
    }
    pub fn note_line(&self, guid: &str) -> Option<&NoteLine> {
        self.note_line_map
            .get(guid)
            .and_then(|i| self.data.note_lines.get(*i))
    }
    pub fn other_object(&self, guid: &str) -> Option<&OtherObject> {
        self.other_object_map
            .get(guid)
            .and_then(|i| self.data.other_objects.get(*i))
    }
    pub fn layer(&self, guid: &str) -> Option<&Layer> {
        self.layer_map.get(guid).and_then(|i| self.layers.get(*i))
    }

    /// Hidden or unknown layers hide their objects.
    pub fn is_visible_layer(&self, guid: &str) -> bool {
        self.layer(guid).map(|l| l.visible).unwrap_or(false)
    }

    pub fn is_locked_layer(&self, guid: &str) -> bool {
        self.layer(guid).map(|l| l.lock).unwrap_or(false)
    }

    /// Lines having the note as head, tail or inner note.
    pub fn note_lines_of<'a>(
        &'a self,
        note: &'a str,
    ) -> impl Iterator<Item = &'a NoteLine> + 'a {
        self.data.note_lines.iter().filter(move |l| l.references(note))
    }

    /// Last measure holding a note, lane point or other object.
    pub fn last_populated_measure(&self) -> Option<usize> {
        let notes = self.data.notes.iter().map(|n| n.measure_index);
        let points = self.data.lane_points.iter().map(|p| p.measure_index);
        let others = self.data.other_objects.iter().map(|o| o.measure_index);
        notes.chain(points).chain(others).max()
    }

    // ---- history ----

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Revert the last entry. `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            log::debug!("nothing to undo");
            return false;
        };
        for change in entry.changes.iter().rev() {
            self.apply(&change.inverse());
        }
        true
    }

    /// Re-apply the next entry. `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            log::debug!("nothing to redo");
            return false;
        };
        for change in entry.changes.iter() {
            self.apply(change);
        }
        true
    }

    pub fn begin_batch(&mut self) {
        self.history.begin_batch();
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    /// Run several edits as one history entry.
    ///
    /// On error the recorded edits of the batch are reverted.
    pub fn batch<R>(
        &mut self,
        edit: impl FnOnce(&mut Self) -> TimelineResult<R>,
    ) -> TimelineResult<R> {
        let mark = self.history.pending_len();
        self.history.begin_batch();
        let result = edit(self);
        if result.is_err() {
            let applied = self.history.split_pending(mark);
            for change in applied.iter().rev() {
                self.apply(&change.inverse());
            }
        }
        self.history.end_batch();
        result
    }

    fn commit(&mut self, change: Change, record: Record) {
        self.apply(&change);
        if record == Record::History {
            self.history.push(change);
        }
    }

    fn apply(&mut self, change: &Change) {
        match change {
            Change::Insert { index, entity } => {
                self.insert_entity(*index, entity.clone())
            }
            Change::Remove { entity, .. } => self.remove_entity(entity),
            Change::Update { after, .. } => self.replace_entity(after.clone()),
            Change::MeasureBeat { index, after, .. } => {
                if let Some(measure) = self.data.measures.get_mut(*index) {
                    measure.beat = *after;
                }
            }
        }
        self.generation = next_generation();
        self.dirty = true;
    }

    fn insert_entity(&mut self, index: usize, entity: Entity) {
        let data = &mut self.data;
        match entity {
            Entity::Note(note) => insert_indexed(
                &mut data.notes,
                &mut self.note_map,
                index,
                note,
                |n| &n.guid,
            ),
            Entity::Lane(lane) => insert_indexed(
                &mut data.lanes,
                &mut self.lane_map,
                index,
                lane,
                |l| &l.guid,
            ),
            Entity::LanePoint(point) => insert_indexed(
                &mut data.lane_points,
                &mut self.lane_point_map,
                index,
                point,
                |p| &p.guid,
            ),
            Entity::NoteLine(line) => insert_indexed(
                &mut data.note_lines,
                &mut self.note_line_map,
                index,
                line,
                |l| &l.guid,
            ),
            Entity::OtherObject(object) => insert_indexed(
                &mut data.other_objects,
                &mut self.other_object_map,
                index,
                object,
                |o| &o.guid,
            ),
            Entity::Layer(layer) => insert_indexed(
                &mut self.layers,
                &mut self.layer_map,
                index,
                layer,
                |l| &l.guid,
            ),
        }
    }

    fn remove_entity(&mut self, entity: &Entity) {
        let guid = entity.guid();
        let data = &mut self.data;
        match entity {
            Entity::Note(_) => remove_indexed(
                &mut data.notes,
                &mut self.note_map,
                guid,
                |n| &n.guid,
            ),
            Entity::Lane(_) => remove_indexed(
                &mut data.lanes,
                &mut self.lane_map,
                guid,
                |l| &l.guid,
            ),
            Entity::LanePoint(_) => remove_indexed(
                &mut data.lane_points,
                &mut self.lane_point_map,
                guid,
                |p| &p.guid,
            ),
            Entity::NoteLine(_) => remove_indexed(
                &mut data.note_lines,
                &mut self.note_line_map,
                guid,
                |l| &l.guid,
            ),
            Entity::OtherObject(_) => remove_indexed(
                &mut data.other_objects,
                &mut self.other_object_map,
                guid,
                |o| &o.guid,
            ),
            Entity::Layer(_) => remove_indexed(
                &mut self.layers,
                &mut self.layer_map,
                guid,
                |l| &l.guid,
            ),
        }
    }

    fn replace_entity(&mut self, entity: Entity) {
        let index = match &entity {
            Entity::Note(n) => self.note_map.get(&n.guid),
            Entity::Lane(l) => self.lane_map.get(&l.guid),
            Entity::LanePoint(p) => self.lane_point_map.get(&p.guid),
            Entity::NoteLine(l) => self.note_line_map.get(&l.guid),
            Entity::OtherObject(o) => self.other_object_map.get(&o.guid),
            Entity::Layer(l) => self.layer_map.get(&l.guid),
        };
        let Some(index) = index.copied() else {
            log::warn!("replacing unknown object `{}`", entity.guid());
            return;
        };
        match entity {
            Entity::Note(note) => self.data.notes[index] = note,
            Entity::Lane(lane) => self.data.lanes[index] = lane,
            Entity::LanePoint(point) => self.data.lane_points[index] = point,
            Entity::NoteLine(line) => self.data.note_lines[index] = line,
            Entity::OtherObject(obj) => self.data.other_objects[index] = obj,
            Entity::Layer(layer) => self.layers[index] = layer,
        }
    }

    // ---- checks ----

    fn ensure_unlocked(&self, layer: &str) -> TimelineResult<()> {
        match self.is_locked_layer(layer) {
            true => Err(TimelineError::LayerLocked(layer.to_string())),
            false => Ok(()),
        }
    }

    fn ensure_layer(&self, layer: &str) -> TimelineResult<()> {
        if self.layer(layer).is_none() {
            return Err(TimelineError::UnknownLayer(layer.to_string()));
        }
        self.ensure_unlocked(layer)
    }

    fn ensure_measure(&self, index: usize) -> TimelineResult<()> {
        match index < self.data.measures.len() {
            true => Ok(()),
            false => Err(TimelineError::UnknownMeasure(index)),
        }
    }

    fn check_note(&self, note: &Note) -> TimelineResult<()> {
        self.ensure_layer(&note.layer)?;
        self.ensure_measure(note.measure_index)?;
        let lane = self
            .lane(&note.lane)
            .ok_or_else(|| TimelineError::UnknownLane(note.lane.clone()))?;
        if !note.fits_lane(lane) {
            let (first, last) = note.columns();
            return Err(TimelineError::NoteOutOfLane {
                note: note.guid.clone(),
                lane: lane.guid.clone(),
                first,
                last,
                division: lane.division,
            });
        }
        Ok(())
    }

    /// Existing points of a lane, in musical order.
    fn sorted_lane_points(
        &self,
        points: &[Guid],
    ) -> TimelineResult<Vec<Guid>> {
        if points.len() < 2 {
            return Err(TimelineError::TooFewLanePoints(points.len()));
        }
        let points = points
            .iter()
            .map(|guid| self.lane_point(guid).ok_or_else(|| unknown(guid)))
            .collect::<TimelineResult<Vec<_>>>()?;
        Ok(points
            .into_iter()
            .sorted_by(|a, b| sort_measure(*a, *b))
            .map(|p| p.guid.clone())
            .collect())
    }

    fn check_note_line(&self, line: &NoteLine) -> TimelineResult<()> {
        for guid in [&line.head, &line.tail]
            .into_iter()
            .chain(line.inner_notes.iter())
        {
            let note = self.note(guid).ok_or_else(|| unknown(guid))?;
            self.ensure_unlocked(&note.layer)?;
        }
        Ok(())
    }

    fn check_other_object(&self, object: &OtherObject) -> TimelineResult<()> {
        self.ensure_layer(&object.layer)?;
        self.ensure_measure(object.measure_index)
    }

    // ---- notes ----

    pub fn add_note(&mut self, note: Note) -> TimelineResult<()> {
        self.add_note_with(note, Record::History)
    }

    /// Add a normalized copy of the note.
    pub fn add_note_with(
        &mut self,
        mut note: Note,
        record: Record,
    ) -> TimelineResult<()> {
        if self.note_map.contains_key(&note.guid) {
            return Err(TimelineError::DuplicateGuid(note.guid));
        }
        note.normalize();
        self.check_note(&note)?;
        let index = self.data.notes.len();
        let entity = Entity::Note(note);
        self.commit(Change::Insert { index, entity }, record);
        Ok(())
    }

    pub fn remove_note(&mut self, guid: &str) -> TimelineResult<Note> {
        self.remove_note_with(guid, Record::History)
    }

    /// Note lines referencing the note are kept.
    pub fn remove_note_with(
        &mut self,
        guid: &str,
        record: Record,
    ) -> TimelineResult<Note> {
        let index = *self.note_map.get(guid).ok_or_else(|| unknown(guid))?;
        let note = self.data.notes[index].clone();
        self.ensure_unlocked(&note.layer)?;
        let entity = Entity::Note(note.clone());
        self.commit(Change::Remove { index, entity }, record);
        Ok(note)
    }

    pub fn update_note(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut Note),
    ) -> TimelineResult<()> {
        self.update_note_with(guid, edit, Record::History)
    }

    /// Edit a copy of the note, then validate and store it.
    ///
    /// The guid can not be changed; a negative size is normalized.
    pub fn update_note_with(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut Note),
        record: Record,
    ) -> TimelineResult<()> {
        let before = self.note(guid).cloned().ok_or_else(|| unknown(guid))?;
        self.ensure_unlocked(&before.layer)?;
        let mut after = before.clone();
        edit(&mut after);
        after.guid = before.guid.clone();
        after.normalize();
        if after == before {
            return Ok(());
        }
        self.check_note(&after)?;
        let (before, after) = (Entity::Note(before), Entity::Note(after));
        self.commit(Change::Update { before, after }, record);
        Ok(())
    }

    /// Move notes keeping their spacing, the earliest one to `target`.
    pub fn move_notes(
        &mut self,
        guids: &[Guid],
        target: ChartPosition,
    ) -> TimelineResult<()> {
        let members = guids
            .iter()
            .map(|guid| {
                let note = self.note(guid).ok_or_else(|| unknown(guid))?;
                Ok((guid.clone(), ChartPosition::of(note)))
            })
            .collect::<TimelineResult<Vec<_>>>()?;
        let moves = MeasureObjectGroup::new(members).move_to(target);
        self.batch(|timeline| {
            for (guid, position) in moves {
                timeline.update_note(&guid, |note| {
                    note.measure_index = position.measure_index;
                    note.measure_position = position.measure_position;
                })?;
            }
            Ok(())
        })
    }

    /// Add copies of `notes` with fresh guids as one history entry.
    ///
    /// The earliest copied measure lands on `measure_index`, the others
    /// keep their distance to it. Returns the new guids in input order.
    pub fn paste_notes(
        &mut self,
        notes: &[Note],
        measure_index: usize,
        guids: &mut dyn GuidSource,
    ) -> TimelineResult<Vec<Guid>> {
        let Some(first) = notes.iter().map(|n| n.measure_index).min() else {
            return Ok(Vec::new());
        };
        self.batch(|timeline| {
            notes
                .iter()
                .map(|note| {
                    let mut copy = note.clone();
                    copy.guid = guids.next_guid();
                    copy.measure_index =
                        note.measure_index - first + measure_index;
                    let guid = copy.guid.clone();
                    timeline.add_note(copy)?;
                    Ok(guid)
                })
                .collect()
        })
    }

    /// Remove notes as one history entry and return them for a paste.
    pub fn cut_notes(&mut self, guids: &[Guid]) -> TimelineResult<Vec<Note>> {
        self.batch(|timeline| {
            guids.iter().map(|guid| timeline.remove_note(guid)).collect()
        })
    }

    // ---- lanes ----

    pub fn add_lane_point(&mut self, point: LanePoint) -> TimelineResult<()> {
        self.add_lane_point_with(point, Record::History)
    }

    pub fn add_lane_point_with(
        &mut self,
        point: LanePoint,
        record: Record,
    ) -> TimelineResult<()> {
        if self.lane_point_map.contains_key(&point.guid) {
            return Err(TimelineError::DuplicateGuid(point.guid));
        }
        self.ensure_measure(point.measure_index)?;
        let index = self.data.lane_points.len();
        let entity = Entity::LanePoint(point);
        self.commit(Change::Insert { index, entity }, record);
        Ok(())
    }

    pub fn remove_lane_point(
        &mut self,
        guid: &str,
    ) -> TimelineResult<LanePoint> {
        self.remove_lane_point_with(guid, Record::History)
    }

    /// Refuses points still used by a lane.
    pub fn remove_lane_point_with(
        &mut self,
        guid: &str,
        record: Record,
    ) -> TimelineResult<LanePoint> {
        let index =
            *self.lane_point_map.get(guid).ok_or_else(|| unknown(guid))?;
        if self.data.lanes.iter().any(|l| l.points.iter().any(|p| p == guid))
        {
            return Err(TimelineError::LanePointInUse(guid.to_string()));
        }
        let point = self.data.lane_points[index].clone();
        let entity = Entity::LanePoint(point.clone());
        self.commit(Change::Remove { index, entity }, record);
        Ok(point)
    }

    pub fn update_lane_point(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut LanePoint),
    ) -> TimelineResult<()> {
        self.update_lane_point_with(guid, edit, Record::History)
    }

    pub fn update_lane_point_with(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut LanePoint),
        record: Record,
    ) -> TimelineResult<()> {
        let before =
            self.lane_point(guid).cloned().ok_or_else(|| unknown(guid))?;
        let mut after = before.clone();
        edit(&mut after);
        after.guid = before.guid.clone();
        if after == before {
            return Ok(());
        }
        self.ensure_measure(after.measure_index)?;
        let (before, after) =
            (Entity::LanePoint(before), Entity::LanePoint(after));
        self.commit(Change::Update { before, after }, record);
        Ok(())
    }

    pub fn add_lane(&mut self, lane: Lane) -> TimelineResult<()> {
        self.add_lane_with(lane, Record::History)
    }

    /// Points are sorted by position; at least two are required.
    pub fn add_lane_with(
        &mut self,
        mut lane: Lane,
        record: Record,
    ) -> TimelineResult<()> {
        if self.lane_map.contains_key(&lane.guid) {
            return Err(TimelineError::DuplicateGuid(lane.guid));
        }
        lane.points = self.sorted_lane_points(&lane.points)?;
        let index = self.data.lanes.len();
        let entity = Entity::Lane(lane);
        self.commit(Change::Insert { index, entity }, record);
        Ok(())
    }

    pub fn remove_lane(&mut self, guid: &str) -> TimelineResult<Lane> {
        self.remove_lane_with(guid, Record::History)
    }

    pub fn remove_lane_with(
        &mut self,
        guid: &str,
        record: Record,
    ) -> TimelineResult<Lane> {
        let index = *self.lane_map.get(guid).ok_or_else(|| unknown(guid))?;
        let lane = self.data.lanes[index].clone();
        let entity = Entity::Lane(lane.clone());
        self.commit(Change::Remove { index, entity }, record);
        Ok(lane)
    }

    pub fn update_lane(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut Lane),
    ) -> TimelineResult<()> {
        self.update_lane_with(guid, edit, Record::History)
    }

    pub fn update_lane_with(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut Lane),
        record: Record,
    ) -> TimelineResult<()> {
        let before = self.lane(guid).cloned().ok_or_else(|| unknown(guid))?;
        let mut after = before.clone();
        edit(&mut after);
        after.guid = before.guid.clone();
        after.points = self.sorted_lane_points(&after.points)?;
        if after == before {
            return Ok(());
        }
        let (before, after) = (Entity::Lane(before), Entity::Lane(after));
        self.commit(Change::Update { before, after }, record);
        Ok(())
    }

    /// Merge lanes ending where another lane of the same template starts.
    ///
    /// Notes of a merged lane move to the lane it was merged into.
    /// Returns the number of merges.
    pub fn optimize_lanes(&mut self) -> TimelineResult<usize> {
        self.batch(|timeline| {
            let mut merged = 0;
            while let Some((head, tail)) = timeline.connected_lanes() {
                let tail_lane = timeline.remove_lane(&tail)?;
                timeline.update_lane(&head, |lane| {
                    lane.points.extend(tail_lane.points.into_iter().skip(1))
                })?;
                let moved = timeline
                    .data
                    .notes
                    .iter()
                    .filter(|n| n.lane == tail)
                    .map(|n| n.guid.clone())
                    .collect::<Vec<_>>();
                for guid in moved {
                    timeline.relink_note(&guid, &head);
                }
                merged += 1;
            }
            Ok(merged)
        })
    }

    fn connected_lanes(&self) -> Option<(Guid, Guid)> {
        self.data
            .lanes
            .iter()
            .cartesian_product(self.data.lanes.iter())
            .find(|(a, b)| a.connects_to(b))
            .map(|(a, b)| (a.guid.clone(), b.guid.clone()))
    }

    /// Point a note to another lane regardless of layer locks.
    fn relink_note(&mut self, guid: &str, lane: &str) {
        let Some(before) = self.note(guid).cloned() else {
            return;
        };
        let mut after = before.clone();
        after.lane = lane.to_string();
        let (before, after) = (Entity::Note(before), Entity::Note(after));
        self.commit(Change::Update { before, after }, Record::History);
    }

    /// Add a point at the next measure start when the note lies after
    /// the last point of its lane. Returns whether the lane grew.
    pub fn extend_lane(
        &mut self,
        note: &str,
        guids: &mut dyn GuidSource,
    ) -> TimelineResult<bool> {
        let note = self.note(note).cloned().ok_or_else(|| unknown(note))?;
        let lane = self
            .lane(&note.lane)
            .cloned()
            .ok_or_else(|| TimelineError::UnknownLane(note.lane.clone()))?;
        let last = lane
            .last_point()
            .and_then(|guid| self.lane_point(guid))
            .cloned()
            .ok_or(TimelineError::TooFewLanePoints(lane.points.len()))?;
        if sort_measure(&note, &last) != Ordering::Greater {
            return Ok(false);
        }
        let point = LanePoint {
            guid: guids.next_guid(),
            measure_index: note.measure_index + 1,
            measure_position: Fraction::new(0, 1),
            ..last
        };
        self.ensure_measure(point.measure_index)?;
        log::debug!("extending lane `{}` to {:?}", lane.guid, point.guid);
        self.batch(|timeline| {
            let guid = point.guid.clone();
            timeline.add_lane_point(point)?;
            timeline.update_lane(&lane.guid, |lane| lane.points.push(guid))?;
            Ok(true)
        })
    }

    // ---- note lines ----

    pub fn add_note_line(&mut self, line: NoteLine) -> TimelineResult<()> {
        self.add_note_line_with(line, Record::History)
    }

    /// Both ends must exist; the caller orders head and tail.
    pub fn add_note_line_with(
        &mut self,
        line: NoteLine,
        record: Record,
    ) -> TimelineResult<()> {
        if self.note_line_map.contains_key(&line.guid) {
            return Err(TimelineError::DuplicateGuid(line.guid));
        }
        self.check_note_line(&line)?;
        let index = self.data.note_lines.len();
        let entity = Entity::NoteLine(line);
        self.commit(Change::Insert { index, entity }, record);
        Ok(())
    }

    pub fn remove_note_line(
        &mut self,
        guid: &str,
    ) -> TimelineResult<NoteLine> {
        self.remove_note_line_with(guid, Record::History)
    }

    pub fn remove_note_line_with(
        &mut self,
        guid: &str,
        record: Record,
    ) -> TimelineResult<NoteLine> {
        let index =
            *self.note_line_map.get(guid).ok_or_else(|| unknown(guid))?;
        let line = self.data.note_lines[index].clone();
        for end in [&line.head, &line.tail] {
            if let Some(note) = self.note(end) {
                self.ensure_unlocked(&note.layer)?;
            }
        }
        let entity = Entity::NoteLine(line.clone());
        self.commit(Change::Remove { index, entity }, record);
        Ok(line)
    }

    pub fn update_note_line(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut NoteLine),
    ) -> TimelineResult<()> {
        self.update_note_line_with(guid, edit, Record::History)
    }

    pub fn update_note_line_with(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut NoteLine),
        record: Record,
    ) -> TimelineResult<()> {
        let before =
            self.note_line(guid).cloned().ok_or_else(|| unknown(guid))?;
        let mut after = before.clone();
        edit(&mut after);
        after.guid = before.guid.clone();
        if after == before {
            return Ok(());
        }
        self.check_note_line(&after)?;
        let (before, after) =
            (Entity::NoteLine(before), Entity::NoteLine(after));
        self.commit(Change::Update { before, after }, record);
        Ok(())
    }

    // ---- other objects ----

    pub fn add_other_object(
        &mut self,
        object: OtherObject,
    ) -> TimelineResult<()> {
        self.add_other_object_with(object, Record::History)
    }

    pub fn add_other_object_with(
        &mut self,
        object: OtherObject,
        record: Record,
    ) -> TimelineResult<()> {
        if self.other_object_map.contains_key(&object.guid) {
            return Err(TimelineError::DuplicateGuid(object.guid));
        }
        self.check_other_object(&object)?;
        if object.is_start_bpm() {
            if let Some(start) = self.start_bpm(None) {
                return Err(TimelineError::DuplicateStartBpm(start.clone()));
            }
        }
        let index = self.data.other_objects.len();
        let entity = Entity::OtherObject(object);
        self.commit(Change::Insert { index, entity }, record);
        Ok(())
    }

    pub fn remove_other_object(
        &mut self,
        guid: &str,
    ) -> TimelineResult<OtherObject> {
        self.remove_other_object_with(guid, Record::History)
    }

    pub fn remove_other_object_with(
        &mut self,
        guid: &str,
        record: Record,
    ) -> TimelineResult<OtherObject> {
        let index =
            *self.other_object_map.get(guid).ok_or_else(|| unknown(guid))?;
        let object = self.data.other_objects[index].clone();
        self.ensure_unlocked(&object.layer)?;
        if object.is_start_bpm() && self.start_bpm(Some(guid)).is_none() {
            return Err(TimelineError::StartBpmRequired(object.guid));
        }
        let entity = Entity::OtherObject(object.clone());
        self.commit(Change::Remove { index, entity }, record);
        Ok(object)
    }

    pub fn update_other_object(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut OtherObject),
    ) -> TimelineResult<()> {
        self.update_other_object_with(guid, edit, Record::History)
    }

    pub fn update_other_object_with(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut OtherObject),
        record: Record,
    ) -> TimelineResult<()> {
        let before =
            self.other_object(guid).cloned().ok_or_else(|| unknown(guid))?;
        self.ensure_unlocked(&before.layer)?;
        let mut after = before.clone();
        edit(&mut after);
        after.guid = before.guid.clone();
        if after == before {
            return Ok(());
        }
        self.check_other_object(&after)?;
        let other_start = self.start_bpm(Some(guid));
        match (before.is_start_bpm(), after.is_start_bpm(), other_start) {
            (false, true, Some(start)) => {
                return Err(TimelineError::DuplicateStartBpm(start.clone()));
            }
            (true, false, None) => {
                return Err(TimelineError::StartBpmRequired(after.guid));
            }
            _ => {}
        }
        let (before, after) =
            (Entity::OtherObject(before), Entity::OtherObject(after));
        self.commit(Change::Update { before, after }, record);
        Ok(())
    }

    // ---- measures and time ----

    pub fn set_measure_beat(
        &mut self,
        index: usize,
        beat: Fraction,
    ) -> TimelineResult<()> {
        self.set_measure_beat_with(index, beat, Record::History)
    }

    /// The beat must be a positive fraction.
    pub fn set_measure_beat_with(
        &mut self,
        index: usize,
        beat: Fraction,
        record: Record,
    ) -> TimelineResult<()> {
        let before = self
            .measure(index)
            .map(|m| m.beat)
            .ok_or(TimelineError::UnknownMeasure(index))?;
        if beat.is_none() || beat.to01() <= 0.0 {
            return Err(TimelineError::InvalidBeat {
                index,
                beat: beat.to_string(),
            });
        }
        if (before.numerator, before.denominator)
            == (beat.numerator, beat.denominator)
        {
            return Ok(());
        }
        let change = Change::MeasureBeat {
            index,
            before,
            after: beat,
        };
        self.commit(change, record);
        Ok(())
    }

    /// Run a layout over the measures. Not an edit, but geometry changes.
    pub fn layout_measures(
        &mut self,
        layout: &dyn MeasureLayout,
        settings: &LayoutSettings,
        viewport: &Viewport,
    ) {
        layout.layout(settings, viewport, &mut self.data.measures);
        self.generation = next_generation();
    }

    /// BPM and stop events of all other objects.
    pub fn tempo_events(&self) -> Vec<TempoEvent> {
        self.data
            .other_objects
            .iter()
            .filter_map(|o| o.tempo_event())
            .collect()
    }

    /// Guid of a start BPM object other than `except`.
    fn start_bpm(&self, except: Option<&str>) -> Option<&Guid> {
        self.data
            .other_objects
            .iter()
            .filter(|o| o.is_start_bpm())
            .map(|o| &o.guid)
            .find(|guid| Some(guid.as_str()) != except)
    }

    /// Insert a 120 BPM object at the chart start if there is none.
    ///
    /// The insertion is not recorded. Returns whether it happened.
    pub fn ensure_default_bpm(&mut self) -> bool {
        if self.start_bpm(None).is_some() {
            return false;
        }
        let layer = self.layers.first().map(|l| l.guid.clone());
        let bpm = OtherObject::new(
            UuidSource.next_guid(),
            OtherObjectType::Bpm,
            DEFAULT_BPM,
            ChartPosition::measure_start(0),
            layer.unwrap_or_default(),
        );
        log::debug!("inserting default BPM object `{}`", bpm.guid);
        let index = self.data.other_objects.len();
        let entity = Entity::OtherObject(bpm);
        self.commit(Change::Insert { index, entity }, Record::Skip);
        true
    }

    /// Time calculator of the current state; measure times are updated.
    pub fn calculate_time(&mut self) -> TimeCalculator {
        self.ensure_default_bpm();
        let calculator =
            TimeCalculator::new(&self.data.measures, &self.tempo_events());
        calculator.update_measure_times(&mut self.data.measures);
        calculator
    }

    // ---- layers ----

    pub fn add_layer(&mut self, layer: Layer) -> TimelineResult<()> {
        if self.layer_map.contains_key(&layer.guid) {
            return Err(TimelineError::DuplicateGuid(layer.guid));
        }
        let index = self.layers.len();
        let entity = Entity::Layer(layer);
        self.commit(Change::Insert { index, entity }, Record::History);
        Ok(())
    }

    /// Remove a layer with its notes, their note lines and other objects,
    /// as one history entry. The last layer can not be removed.
    ///
    /// The last start BPM object moves to the first remaining layer.
    pub fn remove_layer(&mut self, guid: &str) -> TimelineResult<()> {
        self.layer(guid)
            .ok_or_else(|| TimelineError::UnknownLayer(guid.to_string()))?;
        self.ensure_unlocked(guid)?;
        if self.layers.len() <= 1 {
            return Err(TimelineError::LastLayer(guid.to_string()));
        }
        let notes = self
            .data
            .notes
            .iter()
            .filter(|n| n.layer == guid)
            .map(|n| n.guid.clone())
            .collect::<Vec<_>>();
        let lines = self
            .data
            .note_lines
            .iter()
            .filter(|l| notes.iter().any(|n| l.references(n)))
            .map(|l| l.guid.clone())
            .collect::<Vec<_>>();
        let mut others = self
            .data
            .other_objects
            .iter()
            .filter(|o| o.layer == guid)
            .map(|o| o.guid.clone())
            .collect::<Vec<_>>();
        // the chart start keeps its BPM on another layer
        let start_elsewhere = self
            .data
            .other_objects
            .iter()
            .any(|o| o.is_start_bpm() && o.layer != guid);
        let kept_start = if start_elsewhere {
            None
        } else {
            others
                .iter()
                .position(|other| {
                    self.other_object(other)
                        .map_or(false, OtherObject::is_start_bpm)
                })
                .map(|index| others.remove(index))
        };
        let heir = self
            .layers
            .iter()
            .find(|l| l.guid != guid)
            .map(|l| l.guid.clone())
            .ok_or_else(|| TimelineError::LastLayer(guid.to_string()))?;
        self.batch(|timeline| {
            for line in lines {
                timeline.remove_note_line(&line)?;
            }
            for note in notes {
                timeline.remove_note(&note)?;
            }
            if let Some(start) = kept_start {
                timeline.update_other_object(&start, |o| o.layer = heir)?;
            }
            for other in others {
                timeline.remove_other_object(&other)?;
            }
            let index = *timeline
                .layer_map
                .get(guid)
                .ok_or_else(|| TimelineError::UnknownLayer(guid.to_string()))?;
            let entity = Entity::Layer(timeline.layers[index].clone());
            timeline.commit(Change::Remove { index, entity }, Record::History);
            Ok(())
        })
    }

    /// Move every object of `from` into `into` and remove `from`.
    pub fn merge_layer(
        &mut self,
        from: &str,
        into: &str,
    ) -> TimelineResult<()> {
        self.ensure_layer(from)?;
        self.ensure_layer(into)?;
        if from == into {
            return Ok(());
        }
        let notes = self
            .data
            .notes
            .iter()
            .filter(|n| n.layer == from)
            .map(|n| n.guid.clone())
            .collect::<Vec<_>>();
        let others = self
            .data
            .other_objects
            .iter()
            .filter(|o| o.layer == from)
            .map(|o| o.guid.clone())
            .collect::<Vec<_>>();
        self.batch(|timeline| {
            for note in notes {
                timeline.update_note(&note, |n| n.layer = into.to_string())?;
            }
            for other in others {
                timeline.update_other_object(&other, |o| {
                    o.layer = into.to_string()
                })?;
            }
            timeline.remove_layer(from)
        })
    }

    pub fn rename_layer(
        &mut self,
        guid: &str,
        name: &str,
    ) -> TimelineResult<()> {
        let before = self
            .layer(guid)
            .cloned()
            .ok_or_else(|| TimelineError::UnknownLayer(guid.to_string()))?;
        let after = Layer {
            name: name.to_string(),
            ..before.clone()
        };
        let (before, after) = (Entity::Layer(before), Entity::Layer(after));
        self.commit(Change::Update { before, after }, Record::History);
        Ok(())
    }

    /// Not recorded in the history.
    pub fn set_layer_visible(
        &mut self,
        guid: &str,
        visible: bool,
    ) -> TimelineResult<()> {
        self.edit_layer_flags(guid, |layer| layer.visible = visible)
    }

    /// Not recorded in the history.
    pub fn set_layer_lock(
        &mut self,
        guid: &str,
        lock: bool,
    ) -> TimelineResult<()> {
        self.edit_layer_flags(guid, |layer| layer.lock = lock)
    }

    fn edit_layer_flags(
        &mut self,
        guid: &str,
        edit: impl FnOnce(&mut Layer),
    ) -> TimelineResult<()> {
        let index = *self
            .layer_map
            .get(guid)
            .ok_or_else(|| TimelineError::UnknownLayer(guid.to_string()))?;
        edit(&mut self.layers[index]);
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
