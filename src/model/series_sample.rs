/// Latest reading taken from a named stats series.
#[derive(Clone, PartialEq, Debug)]
pub struct SeriesSample {
    pub metric_name: String,
    pub value: f64,
}
