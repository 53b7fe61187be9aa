//! Integrity report of a loaded timeline.
//!
//! Edits through the timeline API keep it consistent, but documents from
//! disk do not have to be.

use thiserror::Error;

use itertools::Itertools;

use super::Timeline;
use crate::{model::Guid, system::MusicGameSystem};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Problem {
    #[error("Lane `{lane}` references missing lane point `{point}`")]
    DanglingLanePoint { lane: Guid, point: Guid },
    #[error("Lane `{lane}` has {count} lane points")]
    ShortLane { lane: Guid, count: usize },
    #[error("Note `{note}` references missing lane `{lane}`")]
    NoteWithoutLane { note: Guid, lane: Guid },
    #[error("Note `{note}` does not fit lane `{lane}`")]
    NoteOutOfLane { note: Guid, lane: Guid },
    #[error("Note line `{line}` references missing note `{note}`")]
    DanglingNoteLine { line: Guid, note: Guid },
    #[error("Object `{object}` references missing layer `{layer}`")]
    UnknownLayer { object: Guid, layer: Guid },
    #[error("Object `{object}` lies in missing measure {measure}")]
    OutsideChart { object: Guid, measure: usize },
    #[error("Chart has no BPM object at its start")]
    MissingStartBpm,
    #[error("BPM object `{object}` is a second one at the chart start")]
    DuplicateStartBpm { object: Guid },
    #[error("Notes `{first}` and `{second}` overlap")]
    OverlappingNotes { first: Guid, second: Guid },
}

impl Timeline {
    /// Every problem found, in document order.
    pub fn validate(&self) -> Vec<Problem> {
        let mut problems = Vec::new();
        let measures = self.data.measures.len();

        for lane in self.data.lanes.iter() {
            if lane.points.len() < 2 {
                problems.push(Problem::ShortLane {
                    lane: lane.guid.clone(),
                    count: lane.points.len(),
                });
            }
            for point in lane.points.iter() {
                if self.lane_point(point).is_none() {
                    problems.push(Problem::DanglingLanePoint {
                        lane: lane.guid.clone(),
                        point: point.clone(),
                    });
                }
            }
        }

        for note in self.data.notes.iter() {
            match self.lane(&note.lane) {
                None => problems.push(Problem::NoteWithoutLane {
                    note: note.guid.clone(),
                    lane: note.lane.clone(),
                }),
                Some(lane) if !note.fits_lane(lane) => {
                    problems.push(Problem::NoteOutOfLane {
                        note: note.guid.clone(),
                        lane: lane.guid.clone(),
                    })
                }
                Some(_) => (),
            }
            if self.layer(&note.layer).is_none() {
                problems.push(Problem::UnknownLayer {
                    object: note.guid.clone(),
                    layer: note.layer.clone(),
                });
            }
            if note.measure_index >= measures {
                problems.push(Problem::OutsideChart {
                    object: note.guid.clone(),
                    measure: note.measure_index,
                });
            }
        }

        for line in self.data.note_lines.iter() {
            let ends = [&line.head, &line.tail];
            for note in ends.into_iter().chain(line.inner_notes.iter()) {
                if self.note(note).is_none() {
                    problems.push(Problem::DanglingNoteLine {
                        line: line.guid.clone(),
                        note: note.clone(),
                    });
                }
            }
        }

        let mut starts = self
            .data
            .other_objects
            .iter()
            .filter(|o| o.is_start_bpm());
        if starts.next().is_none() {
            problems.push(Problem::MissingStartBpm);
        }
        problems.extend(starts.map(|o| Problem::DuplicateStartBpm {
            object: o.guid.clone(),
        }));

        for object in self.data.other_objects.iter() {
            if self.layer(&object.layer).is_none() {
                problems.push(Problem::UnknownLayer {
                    object: object.guid.clone(),
                    layer: object.layer.clone(),
                });
            }
            if object.measure_index >= measures {
                problems.push(Problem::OutsideChart {
                    object: object.guid.clone(),
                    measure: object.measure_index,
                });
            }
        }
        problems
    }

    /// [`Self::validate`] plus the checks the game system asks for.
    pub fn validate_for(&self, system: &MusicGameSystem) -> Vec<Problem> {
        let mut problems = self.validate();
        if system.check_note_overlap {
            problems.extend(self.overlapping_notes(system));
        }
        problems
    }

    /// Pairs of overlapping notes whose types take part in the check.
    pub fn overlapping_notes(&self, system: &MusicGameSystem) -> Vec<Problem> {
        let checked = |note_type: &str| {
            system
                .note_type(note_type)
                .map_or(true, |t| !t.ignore_overlap)
        };
        self.data
            .notes
            .iter()
            .filter(|n| checked(&n.note_type))
            .tuple_combinations()
            .filter(|(a, b)| a.overlaps(b))
            .map(|(a, b)| Problem::OverlappingNotes {
                first: a.guid.clone(),
                second: b.guid.clone(),
            })
            .collect()
    }
}
