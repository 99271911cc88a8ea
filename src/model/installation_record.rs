use crate::model::MetricPoint;
use serde_json::Value;

pub const INSTALLATION_MEASUREMENT: &str = "vrm_installation";
pub const UNKNOWN_SITE_ID: &str = "unknown";

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InstallationRecord {
    pub id_site: Option<String>,
    pub name: Option<String>,
    pub identifier: Option<String>,
}

impl InstallationRecord {
    /// Reads one element of the installation list. Scalars are stringified;
    /// a field holding an array or object counts as absent. Returns `None`
    /// only when the element is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_object()?;

        Some(Self {
            id_site: record.get("idSite").and_then(scalar_to_string),
            name: record.get("name").and_then(scalar_to_string),
            identifier: record.get("identifier").and_then(scalar_to_string),
        })
    }

    pub fn to_point(&self) -> MetricPoint {
        let id_site = self
            .id_site
            .clone()
            .unwrap_or_else(|| UNKNOWN_SITE_ID.to_string());

        MetricPoint::new(INSTALLATION_MEASUREMENT)
            .with_tag("idSite", id_site)
            .with_tag("identifier", self.identifier.clone().unwrap_or_default())
            .with_field("name", self.name.clone().unwrap_or_default())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
