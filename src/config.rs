//! Sections of a scenario file that configure the run rather than the game.

use serde::{Deserialize, Serialize};

use crate::worldgen::GeneratorParams;

fn default_width() -> u32 {
    74
}

fn default_height() -> u32 {
    46
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_report_dir() -> String {
    "reports".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(flatten)]
    pub generator: GeneratorParams,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            generator: GeneratorParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rounds between turn reports; 0 turns reporting off.
    #[serde(default)]
    pub every_turns: u32,
    #[serde(default = "default_report_dir")]
    pub output_dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            every_turns: 0,
            output_dir: default_report_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_defaults_fill_missing_fields() {
        let map: MapConfig = serde_yaml::from_str("width: 20\noctaves: 3\n").unwrap();
        assert_eq!(map.width, 20);
        assert_eq!(map.height, 46);
        assert_eq!(map.generator.octaves, 3);
        assert_eq!(map.generator.elevation_scale, 0.05);
    }

    #[test]
    fn empty_sections_use_defaults() {
        let logging: LoggingConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(logging.level, "info");
        let report: ReportConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(report, ReportConfig::default());
    }
}
