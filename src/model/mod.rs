mod field_value;
mod installation_record;
mod metric_point;
mod series_policy;
mod series_sample;
mod target;

pub use crate::model::field_value::FieldValue;
pub use crate::model::installation_record::{
    InstallationRecord, INSTALLATION_MEASUREMENT, UNKNOWN_SITE_ID,
};
pub use crate::model::metric_point::MetricPoint;
pub use crate::model::series_policy::{
    SeriesPolicy, DEFAULT_SERIES_MEASUREMENT, DEFAULT_SERIES_NAME,
};
pub use crate::model::series_sample::SeriesSample;
pub use crate::model::target::Target;
