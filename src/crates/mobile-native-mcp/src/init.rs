//! Tracing setup
//!
//! stdout carries the MCP protocol, so all logs go to stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose logs the server shows at `info` by default
pub const LOG_TARGETS: &[&str] = &[
    "mobile_native_mcp",
    "workflow_orchestrator",
    "workflow_state",
    "workflow_graph",
    "workflow_checkpoint",
];

/// Add a `<target>=info` directive for each of `targets`
pub fn log_filter(base: EnvFilter, targets: &[&str]) -> anyhow::Result<EnvFilter> {
    targets
        .iter()
        .try_fold(base, |filter, target| -> anyhow::Result<EnvFilter> {
            Ok(filter.add_directive(format!("{}=info", target).parse()?))
        })
}

/// Initialize logging with `info` as the default level for `targets`
///
/// `RUST_LOG` adds further directives. `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing(targets: &[&str]) -> anyhow::Result<()> {
    let filter = log_filter(EnvFilter::from_default_env(), targets)?;

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}
