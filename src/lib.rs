pub mod collector_service;
pub mod config_client;
pub mod error;
pub mod extractor;
pub mod influx_client;
pub mod model;
pub mod vrm_client;
