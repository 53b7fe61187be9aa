//! Undo/redo log of the timeline.
//!
//! Every structural edit is a [`Change`] holding full copies of the touched
//! objects, so it can be applied backwards without looking anything up.
//! Changes are grouped into [`HistoryEntry`]s: one per edit, or one per
//! batch. The log is linear; recording after an undo drops the undone
//! entries.

use crate::{
    model::{Guid, Lane, LanePoint, Layer, Note, NoteLine, OtherObject},
    primitives::Fraction,
};

/// Whether an edit goes into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Record {
    #[default]
    History,
    /// Automatic fixups, invisible to undo.
    Skip,
}

/// Any object owned by the timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Note(Note),
    Lane(Lane),
    LanePoint(LanePoint),
    NoteLine(NoteLine),
    OtherObject(OtherObject),
    Layer(Layer),
}

impl Entity {
    pub fn guid(&self) -> &Guid {
        match self {
            Self::Note(note) => &note.guid,
            Self::Lane(lane) => &lane.guid,
            Self::LanePoint(point) => &point.guid,
            Self::NoteLine(line) => &line.guid,
            Self::OtherObject(object) => &object.guid,
            Self::Layer(layer) => &layer.guid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Object inserted at `index` of its collection.
    Insert { index: usize, entity: Entity },
    /// Object removed from `index` of its collection.
    Remove { index: usize, entity: Entity },
    Update { before: Entity, after: Entity },
    MeasureBeat {
        index: usize,
        before: Fraction,
        after: Fraction,
    },
}

impl Change {
    pub fn inverse(&self) -> Self {
        match self {
            Self::Insert { index, entity } => Self::Remove {
                index: *index,
                entity: entity.clone(),
            },
            Self::Remove { index, entity } => Self::Insert {
                index: *index,
                entity: entity.clone(),
            },
            Self::Update { before, after } => Self::Update {
                before: after.clone(),
                after: before.clone(),
            },
            Self::MeasureBeat {
                index,
                before,
                after,
            } => Self::MeasureBeat {
                index: *index,
                before: *after,
                after: *before,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryEntry {
    pub changes: Vec<Change>,
}

impl HistoryEntry {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    /// Entries before the cursor are applied.
    cursor: usize,
    batch_depth: usize,
    pending: Vec<Change>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        match self.batch_depth {
            0 => self.push_entry(HistoryEntry::new(vec![change])),
            _ => self.pending.push(change),
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        if entry.changes.is_empty() {
            return;
        }
        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        self.cursor = self.entries.len();
    }

    /// Following changes form one entry until the matching
    /// [`History::end_batch`]. Batches nest.
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    pub fn end_batch(&mut self) {
        match self.batch_depth {
            0 => log::warn!("end_batch without begin_batch"),
            1 => {
                self.batch_depth = 0;
                let changes = std::mem::take(&mut self.pending);
                self.push_entry(HistoryEntry::new(changes));
            }
            _ => self.batch_depth -= 1,
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take back pending changes recorded after `len`.
    pub(crate) fn split_pending(&mut self, len: usize) -> Vec<Change> {
        self.pending.split_off(len.min(self.pending.len()))
    }

    pub fn can_undo(&self) -> bool {
        !self.is_batching() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.is_batching() && self.cursor < self.entries.len()
    }

    /// Step back. The returned entry must be applied in reverse.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward. The returned entry must be applied as is.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor - 1].clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
