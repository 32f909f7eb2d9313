mod env;

use deadline_probe_workflows::{CaseConfig, DeadlineProbe};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = CaseConfig::new(env::node_url(), env::private_key())
        .with_poll_interval(env::poll_interval())
        .with_timeout(env::timeout());

    // Single error boundary: failures are logged once, nothing is retried.
    match DeadlineProbe::new(config).execute().await {
        Ok(report) => {
            info!(
                verdict = %report.verdict,
                heights = ?report.block_heights,
                dynamic_hash = report.dynamic_hash.as_ref().map(|h| h.as_str()),
                static_hash = report.static_hash.as_ref().map(|h| h.as_str()),
                "deadline probe finished"
            );
        }
        Err(err) => {
            error!(error = %err, source = ?std::error::Error::source(&err), "deadline probe aborted");
        }
    }
}
