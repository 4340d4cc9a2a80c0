use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use kiln_config::ProjectSettings;
use serde::Serialize;

use crate::error::{ConfigError, Result};

/// Settings file looked up in the project root.
pub const CONFIG_FILE: &str = "kiln.config.json";

/// Environment prefix. `__` separates nested keys, so
/// `KILN_DEV_SERVER__PORT=8080` sets `dev_server.port`.
pub const ENV_PREFIX: &str = "KILN_";

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "DevServerOverrides::is_empty")]
    pub dev_server: DevServerOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DevServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl DevServerOverrides {
    fn is_empty(&self) -> bool {
        self.port.is_none() && self.open.is_none()
    }
}

impl Overrides {
    pub fn dev(port: Option<u16>, no_open: bool) -> Self {
        Self {
            dev_server: DevServerOverrides {
                port,
                open: no_open.then_some(false),
            },
        }
    }
}

/// Load and validate settings for the project at `root`.
///
/// `config_path` replaces the default `kiln.config.json` lookup and must
/// exist.
pub fn load_settings(
    root: &Path,
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<ProjectSettings> {
    // Defaults come from serde; a figment layer would merge into `entry`.
    let mut figment = Figment::new();

    let file = match config_path {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            Some(path.to_path_buf())
        }
        None => {
            let default_path: PathBuf = root.join(CONFIG_FILE);
            default_path.is_file().then_some(default_path)
        }
    };

    if let Some(path) = &file {
        tracing::debug!(path = %path.display(), "loading settings file");
        figment = figment.merge(Json::file(path));
    }

    figment = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Serialized::defaults(overrides));

    let settings: ProjectSettings = figment
        .extract()
        .map_err(|e| ConfigError::Extract(e.to_string()))?;

    settings.validate().map_err(ConfigError::from)?;
    Ok(settings)
}
