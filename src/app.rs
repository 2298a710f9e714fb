use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::config;
use crate::data::{self, BundledStreamService, FileStreamService, StreamService};
use crate::logging;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file,
        env_prefix: None,
    })
    .context("load config")?;
    let _log_guard = logging::init(&cfg.logging).context("init logging")?;
    info!(version = crate::VERSION, "starting live-tui");

    let stack = cfg.stack.settings().context("stack settings")?;
    let overlay = if cfg.overlay.enabled {
        Some(cfg.overlay.settings().context("overlay settings")?)
    } else {
        None
    };

    let service: Box<dyn StreamService> = match opts.data_file.or(cfg.data.path.clone()) {
        Some(path) => Box::new(FileStreamService::new(path)),
        None => Box::new(BundledStreamService),
    };
    let stream = data::load_first(service.as_ref());

    let status_message = match (&stream, cfg.logging.file.as_ref()) {
        (Some(_), Some(path)) => format!("Logging to {}", friendly_path(path)),
        (Some(_), None) => String::new(),
        (None, _) => "No stream data; showing an empty screen.".to_string(),
    };

    let options = ui::Options {
        status_message,
        stream,
        identity: cfg.identity.user(),
        stack,
        overlay,
    };

    let mut model = ui::Model::new(options, Instant::now());
    model.run()?;
    info!("live-tui exited");

    Ok(())
}

pub(crate) fn friendly_path(path: &std::path::Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            let mut display = String::from("~");
            if !stripped.as_os_str().is_empty() {
                display.push_str(&format!("/{}", stripped.display()));
            }
            return display;
        }
    }
    path.display().to_string()
}
