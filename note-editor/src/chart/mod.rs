//! Chart document: metadata, layers and the timeline of one difficulty.
//!
//! [`Chart::from_json`] upgrades old documents with [`migrate`], then
//! makes the document fit the chart system: measures are padded to
//! [`DEFAULT_MEASURE_COUNT`] and custom properties follow the system's
//! declarations. [`Chart::to_json`] writes measures only up to the last
//! one in use.
//!
//! ```
//! use note_editor::chart::Chart;
//! use note_editor::model::SequentialGuids;
//! use note_editor::system::MusicGameSystem;
//!
//! let system = MusicGameSystem::from_json(
//!     r#"{
//!         "name": "demo",
//!         "measureHorizontalDivision": 4,
//!         "laneTemplates": [{"name": "lane", "division": 4}],
//!         "initialLanes": [
//!             {"template": "lane", "horizontalSize": 4,
//!              "horizontalPosition": 0}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! let chart =
//!     Chart::new(&system, "song.ogg", &mut SequentialGuids::new("g"))
//!         .unwrap();
//! assert_eq!(chart.timeline.lanes()[0].guid, "initialLane0");
//!
//! let json = chart.to_json().unwrap();
//! let loaded = Chart::from_json(&json, &system).unwrap();
//! assert_eq!(loaded.timeline.lanes(), chart.timeline.lanes());
//! ```

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ChartError, ChartResult},
    model::{
        custom_props::CustomProps, Guid, GuidSource, Lane, LanePoint, Layer,
        UuidSource,
    },
    primitives::{Fraction, Measure, DEFAULT_MEASURE_COUNT},
    system::MusicGameSystem,
    timeline::{Record, Timeline, TimelineData},
};

pub mod migrate;

use migrate::{migrate, CURRENT_VERSION};

/// Measure of the second point of every initial lane.
pub const INITIAL_LANE_LENGTH: usize = 300;

/// Guid of the initial lane at `index`. Fixed, so charts of one system
/// share them.
pub fn initial_lane_guid(index: usize) -> Guid {
    format!("initialLane{}", index)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartInfo {
    #[derivative(Default(value = "\"New chart\".to_string()"))]
    pub name: String,
    pub creator: String,
    pub difficulty: u32,
    #[derivative(Default(value = "\"0\".to_string()"))]
    pub level: String,
    /// Audio offset of measure 0, in seconds.
    pub start_time: f64,
    /// Audio position where editing starts, in seconds.
    pub development_start_time: f64,
    pub music_game_system_name: String,
    pub music_game_system_version: u32,
    pub audio_source: String,
}

/// Persisted shape of a chart.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartData {
    version: u64,
    #[serde(flatten)]
    info: ChartInfo,
    #[serde(default)]
    layers: Vec<Layer>,
    timeline: TimelineData,
    #[serde(default)]
    custom_props: CustomProps,
}

#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Chart {
    pub info: ChartInfo,
    pub timeline: Timeline,
    pub custom_props: CustomProps,
    /// Custom properties of an untouched measure.
    #[derivative(PartialEq = "ignore")]
    measure_defaults: CustomProps,
}

fn plain_measure(index: usize, defaults: &CustomProps) -> Measure {
    let mut measure = Measure::new(index, Fraction::new(4, 4));
    measure.custom_props = defaults.clone();
    measure
}

impl Chart {
    /// Empty chart with the initial lanes of `system`, one layer and the
    /// default BPM.
    pub fn new(
        system: &MusicGameSystem,
        audio_source: impl Into<String>,
        guids: &mut dyn GuidSource,
    ) -> ChartResult<Self> {
        let measure_defaults =
            CustomProps::from_schema(&system.measure.custom_props);
        let measures = (0..DEFAULT_MEASURE_COUNT)
            .map(|index| plain_measure(index, &measure_defaults))
            .collect();
        let layer = Layer::new(guids.next_guid(), "Layer 1");
        let mut timeline = Timeline::new(measures, vec![layer]);
        add_initial_lanes(&mut timeline, system, guids)?;
        timeline.ensure_default_bpm();
        timeline.save();
        Ok(Self {
            info: ChartInfo {
                music_game_system_name: system.name.clone(),
                music_game_system_version: system.version,
                audio_source: audio_source.into(),
                ..Default::default()
            },
            timeline,
            custom_props: CustomProps::from_schema(&system.custom_props),
            measure_defaults,
        })
    }

    pub fn from_json(
        json: &str,
        system: &MusicGameSystem,
    ) -> ChartResult<Self> {
        let value = serde_json::from_str(json)?;
        Self::from_value(value, system, &mut UuidSource)
    }

    /// Load a raw document, upgrading it first.
    pub fn from_value(
        mut value: Value,
        system: &MusicGameSystem,
        guids: &mut dyn GuidSource,
    ) -> ChartResult<Self> {
        let version = migrate(&mut value, guids)?;
        let mut data: ChartData = serde_json::from_value(value)?;
        let name = &data.info.music_game_system_name;
        if name != &system.name {
            return Err(ChartError::UnknownSystem {
                expected: system.name.clone(),
                found: name.clone(),
            });
        }
        if data.info.music_game_system_version != system.version {
            log::warn!(
                "chart `{}` was made for {} version {}, loading with {}",
                data.info.name,
                system.name,
                data.info.music_game_system_version,
                system.version
            );
        }
        if version <= 1 {
            pin_initial_lanes(&mut data, system.initial_lanes.len());
        }

        let measure_defaults =
            CustomProps::from_schema(&system.measure.custom_props);
        let measures = &mut data.timeline.measures;
        for index in measures.len()..DEFAULT_MEASURE_COUNT {
            measures.push(plain_measure(index, &measure_defaults));
        }
        for measure in measures.iter_mut() {
            measure.custom_props.conform(&system.measure.custom_props);
        }
        for note in data.timeline.notes.iter_mut() {
            note.custom_props.conform(system.note_props(&note.note_type));
        }
        data.custom_props.conform(&system.custom_props);

        Ok(Self {
            info: data.info,
            timeline: Timeline::from_data(data.timeline, data.layers),
            custom_props: data.custom_props,
            measure_defaults,
        })
    }

    /// Measures written by [`Chart::to_json`]: up to the last one holding
    /// an object or differing from an untouched measure.
    pub fn persisted_measure_count(&self) -> usize {
        let measures = self.timeline.measures();
        let populated = self
            .timeline
            .last_populated_measure()
            .map(|index| index + 1)
            .unwrap_or(0);
        let edited = measures
            .iter()
            .rposition(|m| {
                *m != plain_measure(m.index, &self.measure_defaults)
            })
            .map(|index| index + 1)
            .unwrap_or(0);
        populated.max(edited).min(measures.len())
    }

    pub fn to_value(&self) -> ChartResult<Value> {
        let mut timeline = self.timeline.to_data();
        timeline.measures.truncate(self.persisted_measure_count());
        let data = ChartData {
            version: CURRENT_VERSION,
            info: self.info.clone(),
            layers: self.timeline.layers().to_vec(),
            timeline,
            custom_props: self.custom_props.clone(),
        };
        Ok(serde_json::to_value(data)?)
    }

    pub fn to_json(&self) -> ChartResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// Mark as saved. Undo history stays.
    pub fn save(&mut self) {
        self.timeline.save();
    }

    pub fn is_dirty(&self) -> bool {
        self.timeline.is_dirty()
    }
}

fn add_initial_lanes(
    timeline: &mut Timeline,
    system: &MusicGameSystem,
    guids: &mut dyn GuidSource,
) -> ChartResult<()> {
    let division = system.measure_horizontal_division as i64;
    for (index, initial) in system.initial_lanes.iter().enumerate() {
        let template =
            system.lane_template(&initial.template).ok_or_else(|| {
                ChartError::UnknownLaneTemplate(initial.template.clone())
            })?;
        let mut points = Vec::new();
        for measure_index in [0, INITIAL_LANE_LENGTH] {
            let point = LanePoint {
                guid: guids.next_guid(),
                template_name: template.name.clone(),
                horizontal_size: initial.horizontal_size,
                horizontal_position: Fraction::new(
                    initial.horizontal_position,
                    division,
                ),
                measure_index,
                measure_position: Fraction::new(0, 1),
                color: template.color_value(),
            };
            points.push(point.guid.clone());
            timeline.add_lane_point_with(point, Record::Skip)?;
        }
        let lane = Lane {
            guid: initial_lane_guid(index),
            template_name: template.name.clone(),
            division: template.division,
            points,
        };
        timeline.add_lane_with(lane, Record::Skip)?;
    }
    Ok(())
}

/// Documents before version 2 had random initial lane guids and could
/// hold notes of deleted lanes or layers.
fn pin_initial_lanes(data: &mut ChartData, count: usize) {
    let timeline = &mut data.timeline;
    for (index, lane) in timeline.lanes.iter_mut().take(count).enumerate() {
        let guid = initial_lane_guid(index);
        for note in timeline.notes.iter_mut() {
            if note.lane == lane.guid {
                note.lane = guid.clone();
            }
        }
        lane.guid = guid;
    }
    let before = timeline.notes.len();
    let lanes = &timeline.lanes;
    let layers = &data.layers;
    timeline.notes.retain(|note| {
        lanes.iter().any(|lane| lane.guid == note.lane)
            && layers.iter().any(|layer| layer.guid == note.layer)
    });
    let dropped = before - timeline.notes.len();
    if dropped > 0 {
        log::warn!("dropped {} notes of missing lanes or layers", dropped);
    }
}
