use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "nmt_core=info,nmt_cli=info";

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("nmt_core=debug,nmt_cli=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}

/// Install the global subscriber.
///
/// Without `log_dir`, human-readable events go to stderr. With it, JSON
/// lines (including span close timings) go to `nmtdecode-trace.jsonl` in that
/// directory; keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_tracing(log_dir: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::never(dir, "nmtdecode-trace.jsonl");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let installed = tracing_subscriber::fmt()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_env_filter(env_filter(verbose))
                .try_init();
            installed.ok().map(|_| guard)
        }
        None => {
            // Keeps an already-installed subscriber.
            let _ = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_env_filter(env_filter(verbose))
                .try_init();
            None
        }
    }
}
