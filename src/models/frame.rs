// Columnar data frames: typed fields of equal length, optional labels and display config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value label metadata attached to a field (e.g. `level="error"`).
pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Time,
    Number,
    String,
    Boolean,
}

/// Values of one field. Time values are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Time(Vec<Option<i64>>),
    Number(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
}

impl FieldValues {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValues::Time(_) => FieldType::Time,
            FieldValues::Number(_) => FieldType::Number,
            FieldValues::String(_) => FieldType::String,
            FieldValues::Boolean(_) => FieldType::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Number(v) => v.len(),
            FieldValues::String(v) => v.len(),
            FieldValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldColorMode {
    Fixed,
    PaletteClassic,
    Thresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldColor {
    pub mode: FieldColorMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrawStyle {
    Line,
    Bars,
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BarAlignment {
    Before,
    Center,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StackingMode {
    None,
    Normal,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackingConfig {
    pub mode: StackingMode,
    pub group: String,
}

/// Graph styling consumed by the bar chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphFieldConfig {
    pub draw_style: DrawStyle,
    pub bar_alignment: BarAlignment,
    pub bar_width_factor: f64,
    pub bar_max_width: f64,
    pub line_color: String,
    pub point_color: String,
    pub fill_color: String,
    pub line_width: u32,
    pub fill_opacity: u32,
    pub stacking: StackingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name_from_ds: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<FieldColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<GraphFieldConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub values: FieldValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default)]
    pub config: FieldConfig,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            values,
            labels: None,
            config: FieldConfig::default(),
        }
    }

    pub fn time(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self::new(name, FieldValues::Time(values))
    }

    pub fn number(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, FieldValues::Number(values))
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.values.field_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    pub fields: Vec<Field>,
}

impl Frame {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            name: None,
            ref_id: None,
            fields,
        }
    }

    /// Row count, taken from the first field (fields are equal length).
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, Field::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_field_of_type(&self, field_type: FieldType) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_type() == field_type)
    }

    pub fn fields_of_type(&self, field_type: FieldType) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.field_type() == field_type)
    }
}

/// Legacy time series shape: `datapoints` are `[value, time_ms]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub target: String,
    pub datapoints: Vec<(Option<f64>, i64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
}

/// One item of a partial query response, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResult {
    Frame(Frame),
    TimeSeries(TimeSeries),
}

impl From<Frame> for RawResult {
    fn from(frame: Frame) -> Self {
        RawResult::Frame(frame)
    }
}

impl From<TimeSeries> for RawResult {
    fn from(series: TimeSeries) -> Self {
        RawResult::TimeSeries(series)
    }
}

/// Normalizes a raw result to a frame. Time series become `Time` + `Value` fields,
/// with the series tags as the value field's labels.
pub fn to_frame(raw: RawResult) -> Frame {
    match raw {
        RawResult::Frame(frame) => frame,
        RawResult::TimeSeries(series) => {
            let (values, times): (Vec<Option<f64>>, Vec<Option<i64>>) = series
                .datapoints
                .into_iter()
                .map(|(value, time)| (value, Some(time)))
                .unzip();
            let mut value_field = Field::number("Value", values);
            value_field.labels = series.tags;
            Frame {
                name: Some(series.target),
                ref_id: series.ref_id,
                fields: vec![Field::time("Time", times), value_field],
            }
        }
    }
}
