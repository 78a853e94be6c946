//! Configuration loading from pipebench.toml
//!
//! Harness configuration can be specified in a `pipebench.toml` file,
//! discovered by walking up from the current directory. CLI flags override
//! file values; every field has a default matching the classic deployment
//! (stage binaries under `build/`, logs under `/tmp`, queues `/input`,
//! `/output` and `/settings`).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Sweep range and load parameter
    #[serde(default)]
    pub sweep: SweepSection,
    /// Stage program locations
    #[serde(default)]
    pub stages: StagesSection,
    /// Timestamp log and report locations
    #[serde(default)]
    pub paths: PathsSection,
    /// Well-known queue names
    #[serde(default)]
    pub queues: QueuesSection,
    /// Analysis options
    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// Sweep range and load parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSection {
    /// First filter count in the sweep (inclusive)
    #[serde(default)]
    pub filters_from: u32,
    /// End of the filter-count range (exclusive)
    #[serde(default = "default_filters_to")]
    pub filters_to: u32,
    /// Load parameter passed unchanged to every stage
    #[serde(default = "default_periods")]
    pub periods: u32,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            filters_from: 0,
            filters_to: default_filters_to(),
            periods: default_periods(),
        }
    }
}

fn default_filters_to() -> u32 {
    31
}
fn default_periods() -> u32 {
    1000
}

/// Stage program locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesSection {
    /// Capture stage program
    #[serde(default = "default_capture_program")]
    pub capture: String,
    /// Filter stage program
    #[serde(default = "default_filter_program")]
    pub filter: String,
    /// Playback stage program
    #[serde(default = "default_playback_program")]
    pub playback: String,
}

impl Default for StagesSection {
    fn default() -> Self {
        Self {
            capture: default_capture_program(),
            filter: default_filter_program(),
            playback: default_playback_program(),
        }
    }
}

fn default_capture_program() -> String {
    "build/capture".to_string()
}
fn default_filter_program() -> String {
    "build/filter".to_string()
}
fn default_playback_program() -> String {
    "build/playback".to_string()
}

/// Timestamp log and report locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Capture stage's timestamp log
    #[serde(default = "default_capture_log")]
    pub capture_log: String,
    /// Filter stage's timestamp log
    #[serde(default = "default_filter_log")]
    pub filter_log: String,
    /// Playback stage's timestamp log
    #[serde(default = "default_playback_log")]
    pub playback_log: String,
    /// Sweep report output file
    #[serde(default = "default_report")]
    pub report: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            capture_log: default_capture_log(),
            filter_log: default_filter_log(),
            playback_log: default_playback_log(),
            report: default_report(),
        }
    }
}

fn default_capture_log() -> String {
    "/tmp/log-capture".to_string()
}
fn default_filter_log() -> String {
    "/tmp/log-filter".to_string()
}
fn default_playback_log() -> String {
    "/tmp/log-playback".to_string()
}
fn default_report() -> String {
    "results.csv".to_string()
}

/// Well-known queue names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuesSection {
    /// Capture→filter transport queue (created by the stages)
    #[serde(default = "default_input_queue")]
    pub input: String,
    /// Filter→playback transport queue (created by the stages)
    #[serde(default = "default_output_queue")]
    pub output: String,
    /// Settings queue (created and populated by the harness)
    #[serde(default = "default_settings_queue")]
    pub settings: String,
}

impl Default for QueuesSection {
    fn default() -> Self {
        Self {
            input: default_input_queue(),
            output: default_output_queue(),
            settings: default_settings_queue(),
        }
    }
}

fn default_input_queue() -> String {
    "/input".to_string()
}
fn default_output_queue() -> String {
    "/output".to_string()
}
fn default_settings_queue() -> String {
    "/settings".to_string()
}

/// Analysis options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    /// Aggregate-total mode: "join" (per-event) or "positional" (legacy
    /// output parity)
    #[serde(default = "default_total_mode")]
    pub total_mode: String,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            total_mode: default_total_mode(),
        }
    }
}

fn default_total_mode() -> String {
    "join".to_string()
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from the
    /// current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("pipebench.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.sweep.filters_from, 0);
        assert_eq!(config.sweep.filters_to, 31);
        assert_eq!(config.sweep.periods, 1000);
        assert_eq!(config.stages.capture, "build/capture");
        assert_eq!(config.paths.capture_log, "/tmp/log-capture");
        assert_eq!(config.queues.settings, "/settings");
        assert_eq!(config.analysis.total_mode, "join");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [sweep]
            filters_to = 4
            periods = 50

            [analysis]
            total_mode = "positional"
        "#;

        let config: HarnessConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sweep.filters_to, 4);
        assert_eq!(config.sweep.periods, 50);
        assert_eq!(config.analysis.total_mode, "positional");
        // Defaults should still apply
        assert_eq!(config.sweep.filters_from, 0);
        assert_eq!(config.paths.report, "results.csv");
        assert_eq!(config.queues.input, "/input");
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipebench.toml");
        std::fs::write(&path, "[sweep]\nperiods = 7\n").unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.sweep.periods, 7);
    }
}
