use crate::config::{self, Settings};

/// Load and validate the config. A broken config never blocks startup: the
/// problem goes to stderr and the defaults are used.
pub fn load_settings() -> Settings {
    checked(Settings::load()).unwrap_or_else(|problem| {
        eprintln!("astoria: {problem}; using defaults");
        Settings::default()
    })
}

fn checked(loaded: Result<Settings, ::config::ConfigError>) -> Result<Settings, String> {
    let settings = loaded.map_err(|e| match config::resolve_config_path() {
        Some(path) => format!("cannot read {}: {e}", path.display()),
        None => format!("cannot read config: {e}"),
    })?;
    settings
        .validate()
        .map_err(|msg| format!("invalid config: {msg}"))?;
    Ok(settings)
}
