//! Error types of the chart engine.
//!
//! Arithmetic never fails: everything here is raised by validation of user
//! input, by structural edits of the [`crate::timeline::Timeline`] or while
//! loading a persisted chart document.

use thiserror::Error;

use crate::model::guid::Guid;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum FractionError {
    #[error("Denominator can not be zero: `{0}`")]
    ZeroDenominator(String),
    #[error("Can not parse fraction from `{0}`")]
    Parse(String),
    #[error("Value is not finite: {0}")]
    NotFinite(f64),
}

pub type FractionResult<T> = Result<T, FractionError>;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum TimelineError {
    #[error("Layer `{0}` is locked")]
    LayerLocked(Guid),
    #[error("Unknown layer: `{0}`")]
    UnknownLayer(Guid),
    #[error("Unknown lane: `{0}`")]
    UnknownLane(Guid),
    #[error("Unknown object: `{0}`")]
    UnknownObject(Guid),
    #[error("Object with guid `{0}` already exists")]
    DuplicateGuid(Guid),
    #[error(
        "Note `{note}` does not fit lane `{lane}` \
        (columns {first}..={last}, lane division {division})"
    )]
    NoteOutOfLane {
        note: Guid,
        lane: Guid,
        first: i64,
        last: i64,
        division: u32,
    },
    #[error("Lane needs at least two points, got {0}")]
    TooFewLanePoints(usize),
    #[error("Lane point `{0}` is used by a lane")]
    LanePointInUse(Guid),
    #[error("Invalid beat for measure {index}: {beat}")]
    InvalidBeat { index: usize, beat: String },
    #[error("Unknown measure: {0}")]
    UnknownMeasure(usize),
    #[error("Can not remove the last layer `{0}`")]
    LastLayer(Guid),
    #[error("Chart already starts with BPM object `{0}`")]
    DuplicateStartBpm(Guid),
    #[error("BPM object `{0}` is the only one at the chart start")]
    StartBpmRequired(Guid),
}

pub type TimelineResult<T> = Result<T, TimelineError>;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum MigrationError {
    #[error(
        "Chart version {found} is newer than supported version {supported}"
    )]
    UnsupportedVersion { found: u64, supported: u64 },
    #[error("Missing field: `{0}`")]
    MissingField(String),
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
}

pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Can not migrate chart: {0}")]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error("Chart is made for `{found}`, not for `{expected}`")]
    UnknownSystem { expected: String, found: String },
    #[error("Unknown lane template: `{0}`")]
    UnknownLaneTemplate(String),
}

pub type ChartResult<T> = Result<T, ChartError>;
