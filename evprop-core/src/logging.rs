//! Structured logging using **tracing**.
//!
//! Library code only emits events (`info!`, `warn!`, `debug!`). Installing a
//! subscriber is left to the binary, through [`init_structured_logging`].
//! Diagnostics always go to stderr so stdout stays free for reports.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "evprop=info,evprop_core=info,warn";

/// Initializes the global tracing subscriber.
///
/// Call once at program start. With `json` set, events are written as JSON
/// lines for log collectors; otherwise a compact human-readable format is used.
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one stays active and the failure is reported on stderr.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=evprop_core=debug`)
pub fn init_structured_logging(json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        builder
            .json()
            .with_ansi(false)
            .with_current_span(true)
            .try_init()
    } else {
        builder.compact().try_init()
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            eprintln!("[WARN] Tracing subscriber not installed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_failure() {
        init_structured_logging(false);
        assert!(!init_structured_logging(true));
    }
}
