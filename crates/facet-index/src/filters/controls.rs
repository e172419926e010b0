//! Declarative configuration controls.
//!
//! Filters describe their configurable properties for an external visual
//! editor. These are plain data; nothing here affects indexing or querying.

use serde::Serialize;
use serde_json::Value;

/// Kind of editor control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    /// Single line text.
    Text,
    /// Numeric input.
    Number,
    /// Drop-down list.
    Select,
    /// On/off toggle.
    Switcher,
}

/// One option of a select control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlOption {
    /// Stored value.
    pub value: String,
    /// Display label.
    pub label: String,
}

/// A configurable property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSpec {
    /// Property name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Control kind.
    #[serde(rename = "type")]
    pub control: ControlType,
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Options of a select control.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ControlOption>,
}

impl ControlSpec {
    fn new(name: &str, label: &str, control: ControlType) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            control,
            default: None,
            options: Vec::new(),
        }
    }

    /// A text control.
    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, ControlType::Text)
    }

    /// A number control.
    pub fn number(name: &str, label: &str) -> Self {
        Self::new(name, label, ControlType::Number)
    }

    /// A switcher control.
    pub fn switcher(name: &str, label: &str) -> Self {
        Self::new(name, label, ControlType::Switcher)
    }

    /// A select control over `(value, label)` pairs.
    pub fn select(name: &str, label: &str, options: &[(&str, &str)]) -> Self {
        let mut control = Self::new(name, label, ControlType::Select);
        control.options = options
            .iter()
            .map(|(value, label)| ControlOption {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect();
        control
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Controls shared by every filter.
pub fn common_controls(label: &str) -> Vec<ControlSpec> {
    vec![
        ControlSpec::text("key", "Filter key"),
        ControlSpec::text("label", "Label").with_default(label),
    ]
}
