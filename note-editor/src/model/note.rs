//! Playable notes.
//!
//! A note sits on a lane at a musical position and spans
//! `horizontal_size` columns starting at `horizontal_position`. The column
//! count of the position denominator matches the lane division.
//!
//! ```
//! use note_editor::model::note::Note;
//! use note_editor::primitives::Fraction;
//!
//! let mut note = Note::new("n", "tap", "lane", "layer");
//! note.horizontal_position = Fraction::new(3, 4);
//! note.horizontal_size = -2;
//! note.normalize();
//! assert_eq!(note.horizontal_position.numerator, 1);
//! assert_eq!(note.horizontal_size, 2);
//! ```

use serde::{Deserialize, Serialize};

use super::{custom_props::CustomProps, guid::Guid, lane::Lane};
use crate::primitives::{Fraction, MeasureObject};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEditorProps {
    pub time: f64,
}

impl Default for NoteEditorProps {
    fn default() -> Self {
        Self { time: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub guid: Guid,
    #[serde(rename = "type")]
    pub note_type: String,
    pub measure_index: usize,
    pub measure_position: Fraction,
    pub horizontal_position: Fraction,
    pub horizontal_size: i64,
    pub lane: Guid,
    pub layer: Guid,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub editor_props: NoteEditorProps,
    #[serde(default)]
    pub custom_props: CustomProps,
}

fn default_speed() -> f64 {
    1.0
}

impl Note {
    /// One column wide note at the very start of the chart.
    pub fn new(
        guid: impl Into<Guid>,
        note_type: impl Into<String>,
        lane: impl Into<Guid>,
        layer: impl Into<Guid>,
    ) -> Self {
        Self {
            guid: guid.into(),
            note_type: note_type.into(),
            measure_index: 0,
            measure_position: Fraction::new(0, 1),
            horizontal_position: Fraction::new(0, 1),
            horizontal_size: 1,
            lane: lane.into(),
            layer: layer.into(),
            speed: default_speed(),
            editor_props: NoteEditorProps::default(),
            custom_props: CustomProps::default(),
        }
    }

    /// Flip a negative size, keeping the covered columns.
    pub fn normalize(&mut self) {
        if self.horizontal_size < 0 {
            self.horizontal_position = self.horizontal_position.with_numerator(
                self.horizontal_position.numerator + self.horizontal_size,
            );
            self.horizontal_size = self.horizontal_size.abs();
        }
    }

    /// First and last covered column.
    pub fn columns(&self) -> (i64, i64) {
        let first = self.horizontal_position.numerator;
        (first, first + self.horizontal_size - 1)
    }

    /// Whether all covered columns exist on the lane.
    pub fn fits_lane(&self, lane: &Lane) -> bool {
        let (first, last) = self.columns();
        self.horizontal_position.is_valid()
            && self.horizontal_size > 0
            && first >= 0
            && last < lane.division as i64
    }

    pub fn is_same_measure_position(&self, other: &Note) -> bool {
        self.measure_index == other.measure_index
            && self.measure_position == other.measure_position
    }

    /// Same lane, layer and position, with shared columns.
    pub fn overlaps(&self, other: &Note) -> bool {
        let (first, last) = self.columns();
        let (other_first, other_last) = other.columns();
        self.lane == other.lane
            && self.layer == other.layer
            && self.is_same_measure_position(other)
            && first <= other_last
            && other_first <= last
    }
}

impl MeasureObject for Note {
    fn measure_index(&self) -> usize {
        self.measure_index
    }
    fn measure_position(&self) -> Fraction {
        self.measure_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(division: u32) -> Lane {
        Lane {
            guid: "lane".into(),
            template_name: "t".into(),
            division,
            points: vec![],
        }
    }

    #[test]
    fn fits_lane() {
        let mut note = Note::new("n", "tap", "lane", "layer");
        note.horizontal_position = Fraction::new(2, 4);
        note.horizontal_size = 2;
        assert!(note.fits_lane(&lane(4)));
        note.horizontal_size = 3;
        assert!(!note.fits_lane(&lane(4)));
        note.horizontal_size = -1;
        assert!(!note.fits_lane(&lane(4)));
        note.normalize();
        assert_eq!(note.columns(), (1, 1));
        assert!(note.fits_lane(&lane(4)));
    }

    #[test]
    fn overlaps() {
        let mut a = Note::new("a", "tap", "lane", "layer");
        a.horizontal_position = Fraction::new(0, 4);
        a.horizontal_size = 2;
        let mut b = Note::new("b", "tap", "lane", "layer");
        b.horizontal_position = Fraction::new(1, 4);
        assert!(a.overlaps(&b) && b.overlaps(&a));
        b.horizontal_position = Fraction::new(2, 4);
        assert!(!a.overlaps(&b));
        b.horizontal_position = Fraction::new(1, 4);
        b.measure_position = Fraction::new(1, 2);
        assert!(!a.overlaps(&b));
        b.measure_position = Fraction::new(0, 3);
        b.layer = "other".into();
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn same_position() {
        let mut a = Note::new("a", "tap", "lane", "layer");
        let mut b = Note::new("b", "tap", "lane", "layer");
        a.measure_index = 2;
        a.measure_position = Fraction::new(1, 4);
        b.measure_index = 2;
        b.measure_position = Fraction::new(2, 8);
        assert!(a.is_same_measure_position(&b));
        assert_eq!(a.measure_value(), b.measure_value());
        b.measure_index = 3;
        assert!(!a.is_same_measure_position(&b));
    }

    #[test]
    fn json_shape() {
        let note: Note = serde_json::from_value(serde_json::json!({
            "guid": "n",
            "type": "tap",
            "measureIndex": 1,
            "measurePosition": {"numerator": 1, "denominator": 2},
            "horizontalPosition": {"numerator": 0, "denominator": 4},
            "horizontalSize": 1,
            "lane": "lane",
            "layer": "layer",
        }))
        .unwrap();
        assert_eq!(note.speed, 1.0);
        assert_eq!(note.editor_props, NoteEditorProps::default());
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["type"], "tap");
        assert_eq!(json["measurePosition"]["denominator"], 2);
    }
}
