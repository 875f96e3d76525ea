mod api;
mod app;
mod application;
mod domain;
mod settings;
mod ui;
mod utils;

use std::path::Path;

use tracing::{error, info};

/// Log to stderr and a daily file. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "loop-library-manager.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,loop_library_manager=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> iced::Result {
    let data_dir = settings::data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    let _log_guard = init_logging(&data_dir);

    info!(version = env!("CARGO_PKG_VERSION"), "Loop Library Manager starting");

    let settings = settings::Settings::load(&data_dir);
    settings.save(&data_dir);
    info!(
        clip_library_dir = %settings.clip_library_dir_or_default().display(),
        catalog = %settings.catalog_url,
        "Settings ready"
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start download runtime");
            std::process::exit(1);
        }
    };
    let handle = runtime.handle().clone();

    iced::application(
        move || app::LibraryApp::new(settings.clone(), handle.clone()),
        app::update,
        app::view,
    )
    .title(settings::APP_NAME)
    .subscription(app::subscription)
    .run()
}
