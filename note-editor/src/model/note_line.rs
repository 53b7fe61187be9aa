use derivative::Derivative;
use serde::{Deserialize, Serialize};

use super::guid::Guid;

/// Interpolation family of a note line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveType {
    #[default]
    None,
    EaseInQuad,
    EaseOutQuad,
    Bezier,
}

/// `(x, y)` is the Bezier control point: x in measure-width fractions,
/// y from head (0) to tail (1). Unused by the other curve types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Curve {
    #[serde(rename = "type")]
    pub curve_type: CurveType,
    #[derivative(Default(value = "1.0"))]
    pub x: f64,
    #[derivative(Default(value = "0.5"))]
    pub y: f64,
}

impl Curve {
    pub fn new(curve_type: CurveType) -> Self {
        Self {
            curve_type,
            ..Default::default()
        }
    }
}

/// Connector of two notes: a hold or a slide.
///
/// `head` comes first on the chart. The type does not reorder its ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteLine {
    pub guid: Guid,
    pub head: Guid,
    pub tail: Guid,
    #[serde(default)]
    pub inner_notes: Vec<Guid>,
    #[serde(default)]
    pub curve: Curve,
}

impl NoteLine {
    pub fn new(
        guid: impl Into<Guid>,
        head: impl Into<Guid>,
        tail: impl Into<Guid>,
    ) -> Self {
        Self {
            guid: guid.into(),
            head: head.into(),
            tail: tail.into(),
            inner_notes: Vec::new(),
            curve: Curve::default(),
        }
    }

    /// Whether the line touches the note as an end or an inner note.
    pub fn references(&self, note: &str) -> bool {
        self.head == note
            || self.tail == note
            || self.inner_notes.iter().any(|n| n == note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_defaults() {
        let line: NoteLine = serde_json::from_str(
            r#"{"guid": "l", "head": "a", "tail": "b"}"#,
        )
        .unwrap();
        assert_eq!(line.curve.curve_type, CurveType::None);
        assert_eq!((line.curve.x, line.curve.y), (1.0, 0.5));
        assert!(line.inner_notes.is_empty());
        let curve: Curve =
            serde_json::from_str(r#"{"type": "EaseOutQuad"}"#).unwrap();
        assert_eq!(curve, Curve::new(CurveType::EaseOutQuad));
    }
}
