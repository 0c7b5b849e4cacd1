//! Metric name constants.

use std::time::Duration;

use anyhow::Context;
use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config;

pub const XP_AWARDS: &str = "meeplehall.xp.awards"; // Counter.
pub const XP_CAPPED: &str = "meeplehall.xp.capped"; // Counter.
pub const XP_LEVEL_UPS: &str = "meeplehall.xp.level_ups"; // Counter.
pub const XP_LIMIT_BLOCKED: &str = "meeplehall.xp.limit_blocked"; // Counter.
pub const XP_SPAM_BLOCKED: &str = "meeplehall.xp.spam_blocked"; // Counter.

pub const VOTES_CAST: &str = "meeplehall.votes.cast"; // Counter.

/// Must be ran exactly once on startup. This will declare all of the instruments for `metrics`.
pub fn setup(config: Option<&config::MetricConfig>) -> anyhow::Result<()> {
    describe_counter!(XP_AWARDS, "The number of XP awards credited.");
    describe_counter!(
        XP_CAPPED,
        "The number of awards logged with zero XP because a daily XP cap was reached."
    );
    describe_counter!(XP_LEVEL_UPS, "The number of level-ups across all users.");
    describe_counter!(
        XP_LIMIT_BLOCKED,
        "The number of awards rejected by a daily action-count limit."
    );
    describe_counter!(
        XP_SPAM_BLOCKED,
        "The number of awards rejected by the spam cooldown."
    );

    describe_counter!(VOTES_CAST, "The number of post votes applied.");

    if let Some(config) = config {
        match config {
            config::MetricConfig::PrometheusPush(prometheus_config) => {
                PrometheusBuilder::new()
                    .with_push_gateway(
                        prometheus_config.url.clone(),
                        Duration::from_secs(10),
                        None,
                        None,
                    )
                    .context("failed to set up push gateway")?
                    .install()
                    .context("failed to install metrics exporter")?;
            }
        }
    }

    Ok(())
}
