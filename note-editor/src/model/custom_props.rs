//! Typed property bags defined by the chart system.
//!
//! Charts, measures and notes carry free-form properties. The chart
//! system declares their keys and defaults with [`CustomPropSchema`];
//! [`CustomProps::conform`] makes a bag match such a declaration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<CustomValue>),
    Map(BTreeMap<String, CustomValue>),
}

impl CustomValue {
    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<f64> for CustomValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}
impl From<bool> for CustomValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<&str> for CustomValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Declaration of one custom property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPropSchema {
    pub key: String,
    pub default_value: CustomValue,
    /// Allowed values of a text property, when it is a choice.
    #[serde(default, alias = "config")]
    pub items: Option<Vec<String>>,
}

impl CustomPropSchema {
    /// Whether `value` may be stored under this key.
    pub fn accepts(&self, value: &CustomValue) -> bool {
        if !value.same_kind(&self.default_value) {
            return false;
        }
        match (&self.items, value) {
            (Some(items), CustomValue::Text(text)) => items.contains(text),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomProps(BTreeMap<String, CustomValue>);

impl CustomProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bag holding the default of every declared key.
    pub fn from_schema(schema: &[CustomPropSchema]) -> Self {
        let mut props = Self::new();
        props.conform(schema);
        props
    }

    pub fn get(&self, key: &str) -> Option<&CustomValue> {
        self.0.get(key)
    }

    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<CustomValue>,
    ) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<CustomValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CustomValue)> {
        self.0.iter()
    }

    /// Drop undeclared keys, reset values the schema does not accept.
    pub fn conform(&mut self, schema: &[CustomPropSchema]) {
        self.0
            .retain(|key, _| schema.iter().any(|prop| &prop.key == key));
        for prop in schema {
            match self.0.get(&prop.key) {
                Some(value) if prop.accepts(value) => continue,
                Some(value) => log::debug!(
                    "custom prop `{}`: replacing {:?} with default",
                    prop.key,
                    value
                ),
                None => (),
            }
            self.0.insert(prop.key.clone(), prop.default_value.clone());
        }
    }
}
