use derivative::Derivative;
use serde::{Deserialize, Serialize};

use super::guid::Guid;

/// Editing layer. Notes and other objects belong to exactly one.
///
/// A locked layer refuses edits of its objects, a hidden one removes them
/// from hit-testing only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Layer {
    pub guid: Guid,
    pub name: String,
    #[derivative(Default(value = "true"))]
    pub visible: bool,
    pub lock: bool,
    #[derivative(Default(value = "1"))]
    pub group: i32,
}

impl Layer {
    pub fn new(guid: impl Into<Guid>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let layer: Layer =
            serde_json::from_str(r#"{"guid": "l", "name": "Layer 1"}"#)
                .unwrap();
        assert_eq!(layer, Layer::new("l", "Layer 1"));
        assert!(layer.visible);
        assert!(!layer.lock);
        assert_eq!(layer.group, 1);
    }
}
