use serde::{Deserialize, Serialize};

pub const DEFAULT_SERIES_NAME: &str = "soc";
pub const DEFAULT_SERIES_MEASUREMENT: &str = "battery";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPolicy {
    #[serde(default)]
    pub series_name: String,
    #[serde(default)]
    pub measurement: String,
    #[serde(default)]
    pub field_name: String,
}

impl SeriesPolicy {
    pub fn set_defaults(&mut self) {
        if self.series_name.is_empty() {
            self.series_name = DEFAULT_SERIES_NAME.to_string();
        }
        if self.measurement.is_empty() {
            self.measurement = DEFAULT_SERIES_MEASUREMENT.to_string();
        }
        if self.field_name.is_empty() {
            self.field_name = self.series_name.clone();
        }
    }
}

impl Default for SeriesPolicy {
    fn default() -> Self {
        let mut policy = Self {
            series_name: String::new(),
            measurement: String::new(),
            field_name: String::new(),
        };
        policy.set_defaults();
        policy
    }
}
