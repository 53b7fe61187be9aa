//! Engine of a rhythm game chart editor.
//!
//! Positions are exact: a measure index plus a [`primitives::Fraction`]
//! of the measure. [`primitives::time_calculator`] turns them into seconds,
//! [`geometry`] into pixel segments of lanes and note lines.
//! [`timeline::Timeline`] owns every object of a chart and records edits
//! for undo. [`chart::Chart`] is the persisted document, shaped by a
//! [`system::MusicGameSystem`].
//!
//! Nothing here draws, plays audio or touches files.

pub mod chart;
pub mod error;
pub mod geometry;
pub mod model;
pub mod primitives;
pub mod system;
pub mod timeline;
