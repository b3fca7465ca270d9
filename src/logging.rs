use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Build the level filter. Without debug logging the level is pinned to
/// `info`; with it `RUST_LOG` may override the `debug` default.
pub fn filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

/// Initialise logging, optionally into `log_file` instead of stdout.
///
/// The file writer is non-blocking so the hook threads never wait on disk.
/// Calling this more than once keeps the first subscriber.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let Some(path) = log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter(debug))
            .try_init();
        return;
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "drag_anywhere.log".into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();
    if installed {
        let _ = FILE_GUARD.set(guard);
    }
}
