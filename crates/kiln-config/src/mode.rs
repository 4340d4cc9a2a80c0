//! Build mode selection.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which flavour of output a build produces.
///
/// Production is the default: only an explicit `--mode development` selects
/// development output. Any other mode value, or no mode at all, is production.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    #[default]
    Production,
}

impl BuildMode {
    const DEVELOPMENT_FLAG: &'static str = "development";

    /// Resolve the mode from the value of a `--mode` flag.
    pub fn from_flag(value: Option<&str>) -> Self {
        match value {
            Some(Self::DEVELOPMENT_FLAG) => BuildMode::Development,
            _ => BuildMode::Production,
        }
    }

    /// Resolve the mode from a raw argument list.
    ///
    /// Accepts `--mode development` and `--mode=development`. Every other
    /// argument is ignored. The last `--mode` occurrence wins.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut value: Option<String> = None;
        let mut expect_value = false;

        for arg in args {
            let arg = arg.as_ref();
            if expect_value {
                value = Some(arg.to_string());
                expect_value = false;
                continue;
            }
            if arg == "--mode" {
                expect_value = true;
            } else if let Some(v) = arg.strip_prefix("--mode=") {
                value = Some(v.to_string());
            }
        }

        Self::from_flag(value.as_deref())
    }

    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }

    pub fn is_development(self) -> bool {
        self == BuildMode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flag_is_production() {
        assert_eq!(BuildMode::from_flag(None), BuildMode::Production);
        assert!(BuildMode::from_flag(None).is_production());
    }

    #[test]
    fn development_flag_selects_development() {
        assert_eq!(
            BuildMode::from_flag(Some("development")),
            BuildMode::Development
        );
    }

    #[test]
    fn unknown_mode_values_fall_back_to_production() {
        assert_eq!(BuildMode::from_flag(Some("dev")), BuildMode::Production);
        assert_eq!(BuildMode::from_flag(Some("none")), BuildMode::Production);
        assert_eq!(
            BuildMode::from_flag(Some("Development")),
            BuildMode::Production
        );
    }

    #[test]
    fn from_args_ignores_unrecognized_flags() {
        let mode = BuildMode::from_args(["--progress", "--mode", "development", "--colors"]);
        assert_eq!(mode, BuildMode::Development);

        let mode = BuildMode::from_args(["--watch", "--hot"]);
        assert_eq!(mode, BuildMode::Production);
    }

    #[test]
    fn from_args_accepts_equals_form() {
        assert_eq!(
            BuildMode::from_args(["--mode=development"]),
            BuildMode::Development
        );
        assert_eq!(
            BuildMode::from_args(["--mode=production"]),
            BuildMode::Production
        );
    }

    #[test]
    fn from_args_last_occurrence_wins() {
        let mode = BuildMode::from_args(["--mode", "development", "--mode=production"]);
        assert_eq!(mode, BuildMode::Production);
    }

    #[test]
    fn dangling_mode_flag_is_production() {
        assert_eq!(BuildMode::from_args(["--mode"]), BuildMode::Production);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&BuildMode::Development).unwrap();
        assert_eq!(json, "\"development\"");
    }
}
