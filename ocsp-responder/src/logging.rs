use std::env;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Set to `production` for JSON log lines.
pub const ENV_MODE: &str = "OCSP_ENV";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
///
/// # Errors
/// Returns an error when a global subscriber is already installed.
pub fn init_tracing(verbose: bool, json: bool) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let production = env::var(ENV_MODE).map(|mode| mode == "production").unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ocsp_responder={level},ocsp_api={level},response_cache={level},audit=info,sqlx=warn").into()
    });

    if json || production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init()?;
    }
    Ok(())
}
