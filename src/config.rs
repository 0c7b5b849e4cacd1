use std::{net::SocketAddr, path::PathBuf};

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP service binds to. Defaults to localhost:8000.
    pub listen_address: Option<SocketAddr>,
    /// Persisted ledger storage.
    pub data: DataConfig,
    /// Optional metrics exporter.
    pub metrics: Option<MetricConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DataConfig {
    /// Root directory for the per-user and per-post document stores.
    pub path: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum MetricConfig {
    PrometheusPush(PrometheusPushConfig),
}

#[derive(Deserialize, Debug, Clone)]
pub struct PrometheusPushConfig {
    /// Push gateway endpoint.
    pub url: String,
}
