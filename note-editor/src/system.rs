//! Chart system descriptor: the rules of one rhythm game.
//!
//! A system names its lane templates, the lanes every new chart starts
//! with, its note and other object types and the custom properties of
//! charts, measures and notes. Sections missing from the JSON take
//! defaults, so a minimal descriptor is just a name.
//!
//! ```
//! use note_editor::system::MusicGameSystem;
//!
//! let system = MusicGameSystem::from_json(
//!     r#"{
//!         "name": "demo",
//!         "version": 1,
//!         "laneTemplates": [{"name": "lane", "division": 4}],
//!         "initialLanes": [
//!             {"template": "lane", "horizontalSize": 4,
//!              "horizontalPosition": 0}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(system.lane_template("lane").unwrap().division, 4);
//! assert_eq!(system.measure_divisions[0], 1);
//! ```

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::model::{custom_props::CustomPropSchema, OtherObjectType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LaneTemplate {
    pub name: String,
    #[derivative(Default(value = "\"0xffffff\".to_string()"))]
    pub color: String,
    #[derivative(Default(value = "1"))]
    pub division: u32,
    #[derivative(Default(value = "1"))]
    pub bold_interval: u32,
    #[derivative(Default(value = "\"default\".to_string()"))]
    pub renderer: String,
}

impl LaneTemplate {
    /// Color as `0xRRGGBB`; `0xffffff` when it does not parse.
    pub fn color_value(&self) -> u32 {
        parse_color(&self.color).unwrap_or(0xffffff)
    }
}

fn parse_color(color: &str) -> Option<u32> {
    let color = color.trim();
    let hex = color
        .strip_prefix("0x")
        .or_else(|| color.strip_prefix('#'));
    match hex {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => color.parse().ok(),
    }
}

/// Lane created with every new chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialLane {
    pub template: String,
    pub horizontal_size: i64,
    /// In columns of `1 / measure_horizontal_division`.
    pub horizontal_position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteTypeEditorProps {
    #[derivative(Default(value = "\"0xffffff\".to_string()"))]
    pub color: String,
    pub se: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteType {
    pub name: String,
    pub renderer: String,
    /// Lane templates the note can not be placed on.
    pub exclude_lanes: Vec<String>,
    /// Allows right angled long notes.
    pub allow_right_angle: bool,
    pub connectable_types: Vec<String>,
    /// Type of the note when mirrored.
    pub mirror_type: Option<String>,
    pub ignore_overlap: bool,
    pub custom_props: Vec<CustomPropSchema>,
    pub editor_props: NoteTypeEditorProps,
}

impl NoteType {
    pub fn allows_lane(&self, template: &str) -> bool {
        !self.exclude_lanes.iter().any(|name| name == template)
    }

    pub fn connects_to(&self, other: &str) -> bool {
        self.connectable_types.iter().any(|name| name == other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Number,
    Text,
    None,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OtherObjectTypeInfo {
    pub name: String,
    pub color: String,
    pub value_type: ValueType,
    /// Labels of the comma separated parts of the value.
    pub split_value_labels: Vec<String>,
    pub split_value_point_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MeasureSettings {
    #[derivative(Default(value = "\"default\".to_string()"))]
    pub renderer: String,
    pub custom_props: Vec<CustomPropSchema>,
}

fn default_measure_divisions() -> Vec<u32> {
    vec![1, 2, 3, 4, 5, 6, 8, 12, 16, 24, 32, 48, 64, 96, 128, 192]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MusicGameSystem {
    pub name: String,
    pub version: u32,
    #[derivative(Default(value = "vec![\"unknown\".to_string()]"))]
    pub difficulties: Vec<String>,
    pub check_note_overlap: bool,
    pub lane_templates: Vec<LaneTemplate>,
    pub initial_lanes: Vec<InitialLane>,
    #[derivative(Default(value = "1"))]
    pub measure_horizontal_division: u32,
    pub note_types: Vec<NoteType>,
    pub other_object_types: Vec<OtherObjectTypeInfo>,
    pub measure: MeasureSettings,
    #[derivative(Default(value = "default_measure_divisions()"))]
    pub measure_divisions: Vec<u32>,
    /// Custom properties of the chart itself.
    pub custom_props: Vec<CustomPropSchema>,
}

impl MusicGameSystem {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut system: Self = serde_json::from_str(json)?;
        system.normalize();
        Ok(system)
    }

    /// Repair values serde defaults can not express.
    pub fn normalize(&mut self) {
        if self.difficulties.is_empty() {
            self.difficulties.push("unknown".to_string());
        }
        if self.measure_horizontal_division == 0 {
            log::warn!(
                "system `{}`: measure horizontal division is 0, using 1",
                self.name
            );
            self.measure_horizontal_division = 1;
        }
        self.measure_divisions.retain(|division| *division > 0);
        if self.measure_divisions.is_empty() {
            self.measure_divisions = default_measure_divisions();
        }
        for template in self.lane_templates.iter_mut() {
            template.division = template.division.max(1);
        }
    }

    pub fn lane_template(&self, name: &str) -> Option<&LaneTemplate> {
        self.lane_templates.iter().find(|t| t.name == name)
    }

    pub fn note_type(&self, name: &str) -> Option<&NoteType> {
        self.note_types.iter().find(|t| t.name == name)
    }

    pub fn other_object_type(
        &self,
        object_type: OtherObjectType,
    ) -> Option<&OtherObjectTypeInfo> {
        self.other_object_types
            .get(u32::from(object_type) as usize)
    }

    /// Custom property declarations of a note type; none for an unknown
    /// type.
    pub fn note_props(&self, note_type: &str) -> &[CustomPropSchema] {
        self.note_type(note_type)
            .map(|t| t.custom_props.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let system = MusicGameSystem::from_json(r#"{"name": "x"}"#).unwrap();
        assert_eq!(system.difficulties, vec!["unknown"]);
        assert_eq!(system.measure_horizontal_division, 1);
        assert_eq!(system.measure_divisions.len(), 16);
        assert_eq!(system.measure.renderer, "default");
        assert!(system.initial_lanes.is_empty());
    }

    #[test]
    fn normalizes_bad_values() {
        let system = MusicGameSystem::from_json(
            r#"{
                "name": "x",
                "difficulties": [],
                "measureHorizontalDivision": 0,
                "measureDivisions": [0],
                "laneTemplates": [{"name": "l", "division": 0}]
            }"#,
        )
        .unwrap();
        assert_eq!(system.difficulties, vec!["unknown"]);
        assert_eq!(system.measure_horizontal_division, 1);
        assert_eq!(system.measure_divisions[..3], [1, 2, 3]);
        assert_eq!(system.lane_template("l").unwrap().division, 1);
    }

    #[test]
    fn note_types() {
        let system = MusicGameSystem::from_json(
            r#"{
                "name": "x",
                "noteTypes": [{
                    "name": "hold",
                    "excludeLanes": ["side"],
                    "connectableTypes": ["hold"],
                    "customProps": [{"key": "sound", "defaultValue": "a"}]
                }],
                "otherObjectTypes": [
                    {"name": "BPM", "valueType": "number"},
                    {"name": "Speed"},
                    {"name": "Label", "valueType": "text"}
                ]
            }"#,
        )
        .unwrap();
        let hold = system.note_type("hold").unwrap();
        assert!(!hold.allows_lane("side"));
        assert!(hold.allows_lane("main"));
        assert!(hold.connects_to("hold"));
        assert_eq!(hold.editor_props.color, "0xffffff");
        assert_eq!(system.note_props("hold").len(), 1);
        assert!(system.note_props("tap").is_empty());
        let label = system.other_object_type(OtherObjectType::Stop).unwrap();
        assert_eq!(label.value_type, ValueType::Text);
        assert_eq!(system.other_object_type(OtherObjectType::Custom(7)), None);
    }

    #[test]
    fn colors() {
        let mut template = LaneTemplate::default();
        assert_eq!(template.color_value(), 0xffffff);
        template.color = "0x00ff00".into();
        assert_eq!(template.color_value(), 0x00ff00);
        template.color = "#ff0000".into();
        assert_eq!(template.color_value(), 0xff0000);
        template.color = "green".into();
        assert_eq!(template.color_value(), 0xffffff);
    }
}
