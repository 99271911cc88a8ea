use crate::model::{InstallationRecord, MetricPoint, SeriesPolicy, SeriesSample, Target};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Deserialize, Debug)]
struct InstallationsResponse {
    records: Vec<Value>,
}

#[derive(Deserialize, Debug)]
struct StatsResponse {
    records: HashMap<String, Value>,
}

#[derive(Deserialize, Debug)]
struct SeriesRecord {
    #[serde(default)]
    y: Vec<Value>,
}

/// Maps a fetched document to points for the given target. `None` means the
/// document did not have the expected shape or held nothing worth writing.
pub fn extract(target: &Target, document: &Value) -> Option<Vec<MetricPoint>> {
    match target {
        Target::Installations { .. } => extract_installations(document),
        Target::Series { site_id, policy } => {
            let sample = extract_latest_sample(document, &policy.series_name)?;
            Some(vec![series_point(&sample, site_id, policy)])
        }
    }
}

pub fn extract_installations(document: &Value) -> Option<Vec<MetricPoint>> {
    let response = match InstallationsResponse::deserialize(document) {
        Ok(response) => response,
        Err(e) => {
            debug!("Installation list does not match expected shape: {}", e);
            return None;
        }
    };

    let points: Vec<MetricPoint> = response
        .records
        .iter()
        .filter_map(|value| {
            let record = InstallationRecord::from_value(value);
            if record.is_none() {
                debug!("Skipping installation record that is not an object: {}", value);
            }
            record
        })
        .map(|record| record.to_point())
        .collect();

    if points.is_empty() {
        return None;
    }

    Some(points)
}

/// Takes the last element of `records.<series_name>.y` as the latest value.
pub fn extract_latest_sample(document: &Value, series_name: &str) -> Option<SeriesSample> {
    let response = match StatsResponse::deserialize(document) {
        Ok(response) => response,
        Err(e) => {
            debug!("Stats response does not match expected shape: {}", e);
            return None;
        }
    };

    let series = SeriesRecord::deserialize(response.records.get(series_name)?).ok()?;
    let value = numeric(series.y.last()?)?;

    Some(SeriesSample {
        metric_name: series_name.to_string(),
        value,
    })
}

pub fn series_point(sample: &SeriesSample, site_id: &str, policy: &SeriesPolicy) -> MetricPoint {
    MetricPoint::new(policy.measurement.as_str())
        .with_tag("site_id", site_id)
        .with_field(policy.field_name.as_str(), sample.value)
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if number.is_finite() {
        Some(number)
    } else {
        None
    }
}

/// Short description of a document's top level, for logging shape drift.
pub fn describe_shape(document: &Value) -> String {
    match document {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("keys=[{}]", keys.join(", "))
        }
        Value::Array(_) => "array".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}
