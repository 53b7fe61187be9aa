//! Upgrades of persisted chart documents.
//!
//! Every document carries an integer `version`. Loading runs the steps
//! from that version up to [`CURRENT_VERSION`] on the raw JSON, before it
//! is deserialized. Steps only fill in what is missing, so each of them is
//! a no-op on an already upgraded document.

use serde_json::{json, Map, Value};

use crate::{
    error::{MigrationError, MigrationResult},
    model::GuidSource,
};

pub const CURRENT_VERSION: u64 = 3;

type Object = Map<String, Value>;
type Step = fn(&mut Object, &mut dyn GuidSource) -> MigrationResult<()>;

/// Step upgrading a document of the paired version by one.
const STEPS: [(u64, Step); 3] = [
    (0, merge_tempo_changes),
    (1, default_layers),
    (2, default_curves),
];

fn missing(field: &str) -> MigrationError {
    MigrationError::MissingField(field.to_string())
}

fn invalid(field: &str, reason: &str) -> MigrationError {
    MigrationError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn object_mut<'a>(
    parent: &'a mut Object,
    key: &str,
) -> MigrationResult<&'a mut Object> {
    parent
        .get_mut(key)
        .ok_or_else(|| missing(key))?
        .as_object_mut()
        .ok_or_else(|| invalid(key, "not an object"))
}

/// Array under `key`; `None` when absent or null.
fn take_array(
    parent: &mut Object,
    key: &str,
) -> MigrationResult<Option<Vec<Value>>> {
    match parent.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(invalid(key, "not an array")),
    }
}

/// Version of a raw document. Missing means 0, numeric strings are
/// accepted.
pub fn chart_version(chart: &Value) -> MigrationResult<u64> {
    match chart.get("version") {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(number)) => number
            .as_u64()
            .ok_or_else(|| invalid("version", "not a positive integer")),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map_err(|_| invalid("version", "not a positive integer")),
        Some(_) => Err(invalid("version", "not a number")),
    }
}

/// Upgrade `chart` in place to [`CURRENT_VERSION`].
///
/// Returns the version the document had. New guids (of a default layer)
/// come from `guids`.
///
/// ```
/// use note_editor::chart::migrate::{migrate, CURRENT_VERSION};
/// use note_editor::model::SequentialGuids;
///
/// let mut chart = serde_json::json!({
///     "version": 0,
///     "timeline": {
///         "bpmChanges": [
///             {"guid": "b", "measureIndex": 0,
///              "measurePosition": {"numerator": 0, "denominator": 1},
///              "bpm": 150}
///         ],
///         "speedChanges": []
///     }
/// });
/// let mut guids = SequentialGuids::new("layer");
/// let from = migrate(&mut chart, &mut guids).unwrap();
/// assert_eq!(from, 0);
/// assert_eq!(chart["version"], CURRENT_VERSION);
/// assert_eq!(chart["timeline"]["otherObjects"][0]["value"], 150);
/// assert_eq!(chart["timeline"]["otherObjects"][0]["layer"], "layer0");
/// ```
pub fn migrate(
    chart: &mut Value,
    guids: &mut dyn GuidSource,
) -> MigrationResult<u64> {
    let version = chart_version(chart)?;
    if version > CURRENT_VERSION {
        return Err(MigrationError::UnsupportedVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }
    let fields = chart
        .as_object_mut()
        .ok_or_else(|| invalid("chart", "not an object"))?;
    for (from, step) in STEPS {
        if version > from {
            continue;
        }
        step(fields, guids)?;
        log::info!("chart upgraded from version {} to {}", from, from + 1);
    }
    fields.insert("version".to_string(), CURRENT_VERSION.into());
    Ok(version)
}

/// v0: BPM and speed changes lived in their own arrays.
fn merge_tempo_changes(
    chart: &mut Object,
    _: &mut dyn GuidSource,
) -> MigrationResult<()> {
    let timeline = object_mut(chart, "timeline")?;
    let bpm = take_array(timeline, "bpmChanges")?;
    let speed = take_array(timeline, "speedChanges")?;
    if bpm.is_none() && speed.is_none() {
        return match timeline.contains_key("otherObjects") {
            true => Ok(()),
            false => Err(missing("timeline.bpmChanges")),
        };
    }
    let mut objects =
        take_array(timeline, "otherObjects")?.unwrap_or_default();
    let legacy = [(bpm, 0, "bpm"), (speed, 1, "speed")];
    for (changes, object_type, key) in legacy {
        for mut change in changes.into_iter().flatten() {
            let fields = change
                .as_object_mut()
                .ok_or_else(|| invalid(key, "change is not an object"))?;
            match fields.remove(key) {
                Some(value) => {
                    fields.insert("value".to_string(), value);
                }
                None if fields.contains_key("value") => (),
                None => return Err(missing(key)),
            }
            fields.insert("type".to_string(), object_type.into());
            objects.push(change);
        }
    }
    timeline.insert("otherObjects".to_string(), Value::Array(objects));
    Ok(())
}

/// v1: charts had no layers.
fn default_layers(
    chart: &mut Object,
    guids: &mut dyn GuidSource,
) -> MigrationResult<()> {
    let mut layers = take_array(chart, "layers")?.unwrap_or_default();
    if layers.is_empty() {
        layers.push(json!({
            "guid": guids.next_guid(),
            "name": "Layer 1",
            "visible": true,
            "lock": false,
            "group": 1,
        }));
    }
    let first = layers[0]
        .get("guid")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("layers[0].guid"))?
        .to_string();
    chart.insert("layers".to_string(), Value::Array(layers));

    let timeline = object_mut(chart, "timeline")?;
    for key in ["notes", "otherObjects"] {
        let Some(objects) = timeline.get_mut(key) else {
            continue;
        };
        let objects = objects
            .as_array_mut()
            .ok_or_else(|| invalid(key, "not an array"))?;
        for object in objects.iter_mut().filter_map(Value::as_object_mut) {
            let has_layer = object
                .get("layer")
                .and_then(Value::as_str)
                .map(|layer| !layer.is_empty())
                .unwrap_or(false);
            if !has_layer {
                object.insert("layer".to_string(), first.clone().into());
            }
        }
    }
    Ok(())
}

/// v2: note lines had a `bezier` object instead of a curve.
fn default_curves(
    chart: &mut Object,
    _: &mut dyn GuidSource,
) -> MigrationResult<()> {
    let timeline = object_mut(chart, "timeline")?;
    let Some(lines) = timeline.get_mut("noteLines") else {
        return Ok(());
    };
    let lines = lines
        .as_array_mut()
        .ok_or_else(|| invalid("noteLines", "not an array"))?;
    for line in lines.iter_mut().filter_map(Value::as_object_mut) {
        let bezier = line.remove("bezier");
        if !line.contains_key("curve") {
            line.insert("curve".to_string(), legacy_curve(bezier.as_ref()));
        }
        if !line.contains_key("innerNotes") {
            line.insert("innerNotes".to_string(), json!([]));
        }
    }
    Ok(())
}

fn legacy_curve(bezier: Option<&Value>) -> Value {
    let enabled = bezier
        .and_then(|b| b.get("enabled"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let coordinate = |key: &str, default: f64| {
        bezier
            .and_then(|b| b.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(default)
    };
    match enabled {
        true => json!({
            "type": "Bezier",
            "x": coordinate("x", 1.0),
            "y": coordinate("y", 0.5),
        }),
        false => json!({"type": "None", "x": 1.0, "y": 0.5}),
    }
}
