use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config;

pub fn load_settings(path: Option<PathBuf>) -> config::Settings {
    debug!(
        path = ?path.clone().or_else(config::resolve_config_path),
        "loading settings"
    );
    match config::Settings::load(path) {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                warn!("invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            warn!("failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
