//! Minimizer settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::mode::BuildMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Optimization {
    /// Empty outside production.
    #[serde(default)]
    pub minimizer: Vec<Minimizer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Minimizer {
    pub source_map: bool,
    pub compress: CompressSettings,
}

/// Compressor switches, named as minifiers traditionally name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompressSettings {
    pub inline: bool,
    pub drop_console: bool,
}

impl Optimization {
    pub fn for_mode(mode: BuildMode) -> Self {
        if mode.is_development() {
            return Self::default();
        }
        Self {
            minimizer: vec![Minimizer {
                source_map: true,
                compress: CompressSettings {
                    inline: false,
                    drop_console: true,
                },
            }],
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.minimizer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_has_no_minimizer() {
        let optimization = Optimization::for_mode(BuildMode::Development);
        assert!(!optimization.is_enabled());
    }

    #[test]
    fn production_drops_console_and_keeps_source_map() {
        let optimization = Optimization::for_mode(BuildMode::Production);
        assert_eq!(optimization.minimizer.len(), 1);

        let json = serde_json::to_value(&optimization).unwrap();
        let minimizer = &json["minimizer"][0];
        assert_eq!(minimizer["sourceMap"], true);
        assert_eq!(minimizer["compress"]["inline"], false);
        assert_eq!(minimizer["compress"]["drop_console"], true);
    }
}
