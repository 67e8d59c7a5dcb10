//! Configuration loading for the query compiler and ranking engine
//!
//! Resolution priority:
//! 1. Explicit path (`--config`)
//! 2. `MFQ_CONFIG` environment variable
//! 3. `<user config dir>/mfq/config.toml`
//! 4. Built-in defaults
//!
//! A missing file at priority 3 falls back to defaults with a warning. An
//! explicit path (1 or 2) that cannot be read or parsed is an error.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "MFQ_CONFIG";

/// How a duration tolerance factor widens the accepted range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBounds {
    /// `[q / f, q * f]`
    #[default]
    Symmetric,
    /// `[q * (2 - f), q * f]`, lower bound floored at 0
    Asymmetric,
}

impl DurationBounds {
    /// Accepted `(min, max)` durations around `duration` for `factor`
    pub fn bounds(self, duration: f64, factor: f64) -> (f64, f64) {
        match self {
            DurationBounds::Symmetric => (duration / factor, duration * factor),
            DurationBounds::Asymmetric => {
                ((duration * (2.0 - factor)).max(0.0), duration * factor)
            }
        }
    }

    /// Duration degree of `matched` against `requested` for `factor`
    ///
    /// 1.0 on exact match, falling linearly to 0 at the bound.
    pub fn degree(self, requested: f64, matched: f64, factor: f64) -> f64 {
        if factor <= 1.0 {
            return if matched == requested { 1.0 } else { 0.0 };
        }
        let degree = match self {
            DurationBounds::Symmetric => {
                if requested <= 0.0 || matched <= 0.0 {
                    return 0.0;
                }
                let ratio = (matched / requested).max(requested / matched);
                1.0 - (ratio - 1.0) / (factor - 1.0)
            }
            DurationBounds::Asymmetric => {
                if requested <= 0.0 {
                    return 0.0;
                }
                1.0 - (matched - requested).abs() / (requested * (factor - 1.0))
            }
        };
        degree.clamp(0.0, 1.0)
    }
}

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MfqConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[compiler]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub duration_bounds: DurationBounds,

    /// Center octave for pitch neighborhoods when a note omits its octave
    #[serde(default = "default_octave")]
    pub default_octave: i32,

    /// Shortest representable note length, bounds variable-length paths
    #[serde(default = "default_shortest_note")]
    pub shortest_note: f64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            duration_bounds: DurationBounds::default(),
            default_octave: default_octave(),
            shortest_note: default_shortest_note(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error)
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

fn default_octave() -> i32 {
    4
}

fn default_shortest_note() -> f64 {
    0.125
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Options threaded into `compiler::compile`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileOptions {
    pub duration_bounds: DurationBounds,
    pub default_octave: i32,
    pub shortest_note: f64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        MfqConfig::default().compile_options()
    }
}

/// Options threaded into `ranking::rank`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankOptions {
    /// Must match the bounds the query was compiled with
    pub duration_bounds: DurationBounds,
}

impl MfqConfig {
    /// Resolve and load the configuration following the priority order
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            info!("Loading configuration from command line: {}", path.display());
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            if !env_path.is_empty() {
                info!("Loading configuration from {}: {}", CONFIG_ENV_VAR, env_path);
                return Self::from_file(Path::new(&env_path));
            }
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "No configuration file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No user configuration directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read, parse and validate one TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: MfqConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let shortest = self.compiler.shortest_note;
        if !(shortest.is_finite() && shortest > 0.0) {
            return Err(Error::Config(format!(
                "compiler.shortest_note must be positive, got {}",
                shortest
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            duration_bounds: self.compiler.duration_bounds,
            default_octave: self.compiler.default_octave,
            shortest_note: self.compiler.shortest_note,
        }
    }

    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            duration_bounds: self.compiler.duration_bounds,
        }
    }
}

/// `<user config dir>/mfq/config.toml`, when the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mfq").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MfqConfig::default();
        assert_eq!(config.compiler.duration_bounds, DurationBounds::Symmetric);
        assert_eq!(config.compiler.default_octave, 4);
        assert_eq!(config.compiler.shortest_note, 0.125);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MfqConfig::from_toml("[compiler]\nduration_bounds = \"asymmetric\"\n").unwrap();
        assert_eq!(config.compiler.duration_bounds, DurationBounds::Asymmetric);
        assert_eq!(config.compiler.shortest_note, 0.125);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_non_positive_shortest_note() {
        let err = MfqConfig::from_toml("[compiler]\nshortest_note = 0.0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_bounds() {
        let err = MfqConfig::from_toml("[compiler]\nduration_bounds = \"loose\"\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_symmetric_bounds() {
        assert_eq!(DurationBounds::Symmetric.bounds(0.25, 2.0), (0.125, 0.5));
        assert_eq!(DurationBounds::Symmetric.bounds(0.25, 1.0), (0.25, 0.25));
    }

    #[test]
    fn test_asymmetric_bounds() {
        assert_eq!(DurationBounds::Asymmetric.bounds(0.25, 1.5), (0.125, 0.375));
        // lower bound floored at zero
        assert_eq!(DurationBounds::Asymmetric.bounds(0.25, 3.0), (0.0, 0.75));
    }

    #[test]
    fn test_duration_degrees() {
        let sym = DurationBounds::Symmetric;
        assert_eq!(sym.degree(0.25, 0.25, 2.0), 1.0);
        assert_eq!(sym.degree(0.25, 0.5, 2.0), 0.0);
        assert!((sym.degree(0.25, 0.375, 2.0) - 0.5).abs() < 1e-9);
        assert!((sym.degree(0.5, 0.375, 2.0) - (1.0 - (0.5 / 0.375 - 1.0))).abs() < 1e-9);

        let asym = DurationBounds::Asymmetric;
        assert!((asym.degree(0.25, 0.3125, 1.5) - 0.5).abs() < 1e-9);
        assert_eq!(asym.degree(0.25, 0.5, 1.5), 0.0);

        assert_eq!(sym.degree(0.25, 0.25, 1.0), 1.0);
        assert_eq!(sym.degree(0.25, 0.5, 1.0), 0.0);
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = MfqConfig::default();
        config.compiler.duration_bounds = DurationBounds::Asymmetric;
        config.compiler.default_octave = 5;
        let options = config.compile_options();
        assert_eq!(options.default_octave, 5);
        assert_eq!(options.duration_bounds, DurationBounds::Asymmetric);
        assert_eq!(config.rank_options().duration_bounds, DurationBounds::Asymmetric);
    }
}
