use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

pub(crate) const METRIC_CACHE_HIT: &str = "staffetta_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "staffetta_cache_miss_total";
pub(crate) const METRIC_CACHE_INVALIDATION: &str = "staffetta_cache_invalidation_total";
pub(crate) const METRIC_TRANSMIT: &str = "staffetta_transmit_total";
pub(crate) const METRIC_TRANSMIT_FAILURE: &str = "staffetta_transmit_failure_total";

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of deliveries served by a cached remote identifier."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of delivery requests with no usable cache entry."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATION,
            Unit::Count,
            "Total number of cache entries invalidated, by reason."
        );
        describe_counter!(
            METRIC_TRANSMIT,
            Unit::Count,
            "Total number of source transmissions attempted."
        );
        describe_counter!(
            METRIC_TRANSMIT_FAILURE,
            Unit::Count,
            "Total number of source transmissions that failed or timed out."
        );
    });
}
