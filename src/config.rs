use std::path::{Path, PathBuf};

use config_file::FromConfigFile;
use serde::Deserialize;
use thiserror::Error;

use crate::effects::flash::DEFAULT_FLASH_PROBABILITY;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot load config file {path}: {message}")]
    Load { path: String, message: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One entry of the ordered effect list.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectConfig {
    Sun {
        image: PathBuf,
        #[serde(default)]
        rot: f64,
    },
    Flash {
        #[serde(default = "default_flash_probability")]
        probability: f64,
    },
    Procedural,
}

fn default_flash_probability() -> f64 {
    DEFAULT_FLASH_PROBABILITY
}

fn default_effects() -> Vec<EffectConfig> {
    vec![
        EffectConfig::Sun {
            image: PathBuf::from("line.png"),
            rot: 0.0,
        },
        EffectConfig::Sun {
            image: PathBuf::from("redline.png"),
            rot: 0.0,
        },
        EffectConfig::Flash {
            probability: DEFAULT_FLASH_PROBABILITY,
        },
    ]
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// host:port of the Open Pixel Control server
    pub server: String,
    pub fps: f32,
    /// OPC channel, 0 addresses every output of the server
    pub channel: u8,
    /// Smoothing of the frame pacing, in (0, 1]
    pub filter_gain: f64,
    /// Fixed seed for reproducible animations
    pub seed: Option<u64>,
    pub weather_file: Option<PathBuf>,
    pub weather_refresh_secs: u64,
    /// Offset of the installation's local time from UTC
    pub utc_offset_minutes: i32,
    pub effects: Vec<EffectConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: "127.0.0.1:7890".to_string(),
            fps: 20.0,
            channel: 0,
            filter_gain: 0.05,
            seed: None,
            weather_file: Some(PathBuf::from("weather.json")),
            weather_refresh_secs: 60,
            // Chatham Islands standard time
            utc_offset_minutes: 12 * 60 + 45,
            effects: default_effects(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let config = match Config::from_config_file(path) {
            Ok(config) => config,
            Err(err) => {
                return Err(ConfigError::Load {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })
            }
        };

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }

        if !(self.filter_gain > 0.0 && self.filter_gain <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "filter_gain must be in (0, 1], got {}",
                self.filter_gain
            )));
        }

        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }

        for (index, effect) in self.effects.iter().enumerate() {
            if let EffectConfig::Flash { probability } = effect {
                if !(0.0..=1.0).contains(probability) {
                    return Err(ConfigError::Invalid(format!(
                        "effect {index}: flash probability must be in [0, 1], got {probability}"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_reference_installation() {
        let config = Config::default();
        assert_eq!(config.fps, 20.0);
        assert_eq!(config.server, "127.0.0.1:7890");
        assert_eq!(config.effects.len(), 3);
        assert!(matches!(config.effects[2], EffectConfig::Flash { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_suns_have_no_rotation_offset() {
        let rotations: Vec<f64> = Config::default()
            .effects
            .iter()
            .filter_map(|effect| match effect {
                EffectConfig::Sun { rot, .. } => Some(*rot),
                _ => None,
            })
            .collect();
        assert_eq!(rotations, vec![0.0, 0.0]);
    }

    #[test]
    fn loads_effect_list_in_order() {
        let file = write_config(
            r#"
            fps = 30.0
            seed = 7

            [[effects]]
            kind = "procedural"

            [[effects]]
            kind = "sun"
            image = "sunset.png"
            rot = 1.5

            [[effects]]
            kind = "flash"
            "#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.filter_gain, 0.05);
        assert_eq!(
            config.effects,
            vec![
                EffectConfig::Procedural,
                EffectConfig::Sun {
                    image: PathBuf::from("sunset.png"),
                    rot: 1.5
                },
                EffectConfig::Flash {
                    probability: DEFAULT_FLASH_PROBABILITY
                },
            ]
        );
    }

    #[test]
    fn empty_effect_list_is_allowed() {
        let file = write_config("effects = []\n");
        let config = Config::load(file.path()).unwrap();
        assert!(config.effects.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_effects() {
        let file = write_config("[[effects]]\nkind = \"strobe\"\n");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Load { .. })
        ));
    }

    #[test]
    fn validation_catches_bad_values() {
        let config = Config {
            fps: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            filter_gain: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            effects: vec![EffectConfig::Flash { probability: 2.0 }],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            utc_offset_minutes: 24 * 60,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
