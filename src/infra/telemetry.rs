use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

const QUIET_QUERIES: &str = "sqlx::query=warn";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber and register metric descriptions.
///
/// Fails if a subscriber is already installed.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let mut env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // sqlx logs every statement at `info`; keep that behind an explicit RUST_LOG.
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        let quiet_queries: Directive = QUIET_QUERIES
            .parse()
            .map_err(|err| InfraError::telemetry(format!("invalid log directive: {err}")))?;
        env_filter = env_filter.add_directive(quiet_queries);
    }

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
            "yatube_page_cache_hit_total",
            Unit::Count,
            "Total number of page cache hits."
        );
        describe_counter!(
            "yatube_page_cache_miss_total",
            Unit::Count,
            "Total number of page cache misses."
        );
        describe_counter!(
            "yatube_page_cache_expired_total",
            Unit::Count,
            "Total number of page cache entries dropped after their TTL."
        );
        describe_counter!(
            "yatube_page_cache_store_total",
            Unit::Count,
            "Total number of responses stored in the page cache."
        );
        describe_counter!(
            "yatube_page_cache_evict_total",
            Unit::Count,
            "Total number of page cache evictions due to capacity."
        );
        describe_counter!(
            "yatube_page_cache_clear_total",
            Unit::Count,
            "Total number of explicit page cache clears."
        );
        describe_counter!(
            "yatube_http_requests_total",
            Unit::Count,
            "Total number of HTTP responses by status class."
        );
        describe_histogram!(
            "yatube_http_request_ms",
            Unit::Milliseconds,
            "HTTP request latency in milliseconds."
        );
    });
}
