use crate::model::SeriesPolicy;

/// What the collector polls and how the response is turned into points.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Target {
    Installations { user_id: String },
    Series { site_id: String, policy: SeriesPolicy },
}

impl Target {
    /// Resource path relative to the API base url.
    pub fn path(&self) -> String {
        match self {
            Target::Installations { user_id } => format!("users/{}/installations", user_id),
            Target::Series { site_id, .. } => format!("installations/{}/stats", site_id),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Target::Installations { .. } => "installation".to_string(),
            Target::Series { policy, .. } => policy.measurement.clone(),
        }
    }
}
