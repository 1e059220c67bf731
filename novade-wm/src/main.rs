use std::process::ExitCode;

use novade_core::{init_logging, init_minimal_logging, ConfigLoader};
use novade_wm::backend::headless::HeadlessBackend;
use novade_wm::{event_loop, Compositor, NoopPolicy, StartupError};

fn main() -> ExitCode {
    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            init_minimal_logging();
            tracing::error!("Configuration error: {}", e);
            eprintln!("novade-wm: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging, false) {
        init_minimal_logging();
        tracing::warn!("Falling back to minimal logging: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "NovaDE window manager starting up...");

    match start(config) {
        Ok(()) => {
            tracing::info!("NovaDE window manager exited cleanly.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Fatal: {}", e);
            eprintln!("novade-wm: {e}");
            ExitCode::FAILURE
        }
    }
}

fn start(config: novade_core::WmConfig) -> Result<(), StartupError> {
    let mut backend = HeadlessBackend::from_config(&config.headless);
    let mut compositor = Compositor::new(config, Box::new(NoopPolicy))?;
    event_loop::run(&mut compositor, &mut backend)
}
