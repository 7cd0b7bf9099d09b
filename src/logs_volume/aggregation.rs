// Pure reduction: group raw volume frames by level, sum each group into one Time/Value frame.

use crate::level::{LogLevel, level_from_labels};
use crate::models::{
    BarAlignment, DrawStyle, Field, FieldColor, FieldColorMode, FieldConfig, FieldType,
    FieldValues, Frame, GraphFieldConfig, StackingConfig, StackingMode,
};
use tracing::debug;

pub const TIME_FIELD_NAME: &str = "Time";
pub const VALUE_FIELD_NAME: &str = "Value";
const STACKING_GROUP: &str = "A";

/// One output frame per level, in first-encountered order. Empty input gives empty output.
pub fn aggregate_logs_volume(frames: &[Frame]) -> Vec<Frame> {
    group_by_level(frames)
        .into_iter()
        .filter_map(|(level, group)| {
            let out = aggregate_fields(&group, level_field_config(level));
            if out.is_none() {
                debug!(level = %level, frames = group.len(), "dropping level group without time field");
            }
            out
        })
        .collect()
}

/// Level of a frame: labels of its first number field, `Unknown` when absent.
pub fn frame_level(frame: &Frame) -> LogLevel {
    frame
        .first_field_of_type(FieldType::Number)
        .and_then(|f| f.labels.as_ref())
        .map_or(LogLevel::Unknown, level_from_labels)
}

/// Buckets frames by level, preserving the order levels are first seen.
pub fn group_by_level(frames: &[Frame]) -> Vec<(LogLevel, Vec<&Frame>)> {
    let mut groups: Vec<(LogLevel, Vec<&Frame>)> = Vec::new();
    for frame in frames {
        let level = frame_level(frame);
        match groups.iter_mut().find(|(l, _)| *l == level) {
            Some((_, group)) => group.push(frame),
            None => groups.push((level, vec![frame])),
        }
    }
    groups
}

/// Sums every number field of every frame pointwise into a single Time/Value frame.
/// Length and timestamps come from the first frame; `None` if it has no time field.
pub fn aggregate_fields(frames: &[&Frame], config: FieldConfig) -> Option<Frame> {
    let first = frames.first()?;
    let time_field = first.first_field_of_type(FieldType::Time)?;
    let FieldValues::Time(times) = &time_field.values else {
        return None;
    };
    let total_length = first.len();

    let mut time_values = times.clone();
    time_values.resize(total_length, None);

    let mut totals: Vec<Option<f64>> = vec![None; total_length];
    for frame in frames {
        for field in frame.fields_of_type(FieldType::Number) {
            let FieldValues::Number(values) = &field.values else {
                continue;
            };
            for (point_index, total) in totals.iter_mut().enumerate() {
                let value = values.get(point_index).copied().flatten();
                *total = add_nullable(*total, value);
            }
        }
    }

    Some(Frame::new(vec![
        Field::time(TIME_FIELD_NAME, time_values),
        Field::number(VALUE_FIELD_NAME, totals).with_config(config),
    ]))
}

/// Null-aware addition: both absent stays absent, otherwise absent counts as zero.
pub fn add_nullable(total: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (total, value) {
        (None, None) => None,
        (total, value) => Some(total.unwrap_or(0.0) + value.unwrap_or(0.0)),
    }
}

/// Stacked bar styling for a level's value field.
pub fn level_field_config(level: LogLevel) -> FieldConfig {
    let color = level.color().to_string();
    FieldConfig {
        display_name_from_ds: Some(level.as_str().to_string()),
        color: Some(FieldColor {
            mode: FieldColorMode::Fixed,
            fixed_color: Some(color.clone()),
        }),
        custom: Some(GraphFieldConfig {
            draw_style: DrawStyle::Bars,
            bar_alignment: BarAlignment::Center,
            bar_width_factor: 0.9,
            bar_max_width: 5.0,
            line_color: color.clone(),
            point_color: color.clone(),
            fill_color: color,
            line_width: 1,
            fill_opacity: 100,
            stacking: StackingConfig {
                mode: StackingMode::Normal,
                group: STACKING_GROUP.to_string(),
            },
        }),
    }
}
