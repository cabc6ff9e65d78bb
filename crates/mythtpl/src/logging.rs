use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

/// Default filter directive when `RUST_LOG` is unset.
fn default_directive(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. Keep the returned guard alive until exit
/// so buffered events are flushed.
pub fn init_tracing(args: &GlobalArgs) -> WorkerGuard {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(args)));
    let stderr_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(args.verbose > 1)
        .with_filter(env_filter);

    Registry::default().with(stderr_layer).init();

    guard
}
