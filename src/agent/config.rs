use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::channels::bookmarks::{BookmarkExtractor, DEFAULT_BOOKMARK_PATTERN};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_local_ip")]
    pub local_ip: String,
    #[serde(default = "default_local_port")]
    pub local_port: u16,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Deliveries older than this are dropped even without a `finished`.
    #[serde(default = "default_delivery_ttl_secs")]
    pub delivery_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_yaw_limits")]
    pub yaw_limits: [f64; 2],
    #[serde(default = "default_pitch_limits")]
    pub pitch_limits: [f64; 2],
    #[serde(default = "default_tolerance_deg")]
    pub tolerance_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_weight_max")]
    pub weight_max: f64,
    #[serde(default = "default_action_units")]
    pub action_units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDefinition {
    pub name: String,
    pub first_pose: usize,
    pub frames: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GesturesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_gesture_time_ms")]
    pub default_time_ms: f64,
    #[serde(default = "default_gesture_registry")]
    pub registry: Vec<GestureDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bookmark_pattern")]
    pub bookmark_pattern: String,
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub gaze: GazeConfig,
    #[serde(default)]
    pub face: FaceConfig,
    #[serde(default)]
    pub gestures: GesturesConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

fn default_local_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_local_port() -> u16 {
    1241
}

fn default_buffer_size() -> usize {
    4096
}

fn default_delivery_ttl_secs() -> u64 {
    600
}

fn default_tick_interval_ms() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_yaw_limits() -> [f64; 2] {
    [-90.0, 90.0]
}

fn default_pitch_limits() -> [f64; 2] {
    [-60.0, 60.0]
}

fn default_tolerance_deg() -> f64 {
    0.1
}

fn default_weight_max() -> f64 {
    100.0
}

// FACS action units the default face rig carries blend shapes for.
const ACTION_UNITS: [&str; 30] = [
    "au01", "au02", "au04", "au05", "au06", "au07", "au09", "au10", "au11", "au12", "au13",
    "au14", "au15", "au16", "au17", "au18", "au20", "au22", "au23", "au24", "au25", "au26",
    "au27", "au28", "au38", "au39", "au41", "au43", "au45", "au46",
];

fn default_action_units() -> Vec<String> {
    ACTION_UNITS.iter().map(|au| au.to_string()).collect()
}

fn default_gesture_time_ms() -> f64 {
    1000.0
}

fn default_gesture_registry() -> Vec<GestureDefinition> {
    [("nod", 0, 24), ("shake", 24, 30), ("wave", 54, 40), ("shrug", 94, 20)]
        .into_iter()
        .map(|(name, first_pose, frames)| GestureDefinition {
            name: name.to_string(),
            first_pose,
            frames,
        })
        .collect()
}

fn default_bookmark_pattern() -> String {
    DEFAULT_BOOKMARK_PATTERN.to_string()
}

fn default_words_per_minute() -> f64 {
    150.0
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_ip: default_local_ip(),
            local_port: default_local_port(),
            buffer_size: default_buffer_size(),
            delivery_ttl_secs: default_delivery_ttl_secs(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            yaw_limits: default_yaw_limits(),
            pitch_limits: default_pitch_limits(),
            tolerance_deg: default_tolerance_deg(),
        }
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight_max: default_weight_max(),
            action_units: default_action_units(),
        }
    }
}

impl Default for GesturesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_time_ms: default_gesture_time_ms(),
            registry: default_gesture_registry(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bookmark_pattern: default_bookmark_pattern(),
            words_per_minute: default_words_per_minute(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut cfg: Config = serde_json::from_str(&raw).context("parsing JSON")?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if given, otherwise `config.json` when present, otherwise defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new("config.json").exists() => Self::from_file("config.json"),
            None => Ok(Self::default()),
        }
    }

    /// Lower-case AU ids and drop duplicates so lookups are case-insensitive.
    pub fn normalize(&mut self) {
        let mut seen = std::collections::BTreeSet::new();
        self.face.action_units = self
            .face
            .action_units
            .iter()
            .map(|au| au.trim().to_ascii_lowercase())
            .filter(|au| !au.is_empty() && seen.insert(au.clone()))
            .collect();
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.buffer_size == 0 {
            bail!("network.buffer_size must be greater than zero");
        }
        if self.scheduler.tick_interval_ms == 0 {
            bail!("scheduler.tick_interval_ms must be greater than zero");
        }
        for (name, [lo, hi]) in [
            ("gaze.yaw_limits", self.gaze.yaw_limits),
            ("gaze.pitch_limits", self.gaze.pitch_limits),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                bail!("{name} must be an increasing pair, got [{lo}, {hi}]");
            }
        }
        if !(self.face.weight_max.is_finite() && self.face.weight_max > 0.0) {
            bail!("face.weight_max must be positive");
        }
        for gesture in &self.gestures.registry {
            if gesture.frames == 0 {
                bail!("gesture {} has no frames", gesture.name);
            }
        }
        if !(self.speech.words_per_minute.is_finite() && self.speech.words_per_minute > 0.0) {
            bail!("speech.words_per_minute must be positive");
        }
        BookmarkExtractor::new(&self.speech.bookmark_pattern)
            .context("speech.bookmark_pattern")?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.local_ip, self.network.local_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn test_config_parsing() {
        let file = write_config(
            r##"{
                "network": {"local_ip": "0.0.0.0", "local_port": 5000},
                "gaze": {"enabled": false},
                "face": {"action_units": ["AU12", "au12", " au01 "]},
                "speech": {"bookmark_pattern": "#(\\w+)"}
            }"##,
        );

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.network.buffer_size, 4096);
        assert!(!config.gaze.enabled);
        assert_eq!(config.gaze.yaw_limits, [-90.0, 90.0]);
        assert_eq!(config.face.action_units, vec!["au12", "au01"]);
        assert_eq!(config.speech.bookmark_pattern, "#(\\w+)");
    }

    #[test]
    fn test_empty_object_yields_defaults() {
        let file = write_config("{}");
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:1241");
        assert_eq!(config.scheduler.tick_interval_ms, 20);
        assert_eq!(config.network.delivery_ttl_secs, 600);
        assert_eq!(config.face.weight_max, 100.0);
        assert!(config.gestures.registry.iter().any(|g| g.name == "nod"));
        assert_eq!(config.speech.bookmark_pattern, DEFAULT_BOOKMARK_PATTERN);
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::from_file("/nonexistent/path/config.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_invalid_json() {
        let file = write_config("{invalid json");
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        for body in [
            r#"{"network": {"buffer_size": 0}}"#,
            r#"{"scheduler": {"tick_interval_ms": 0}}"#,
            r#"{"gaze": {"yaw_limits": [10.0, -10.0]}}"#,
            r#"{"speech": {"bookmark_pattern": "("}}"#,
            r#"{"speech": {"bookmark_pattern": "x*"}}"#,
            r#"{"gestures": {"registry": [{"name": "blink", "first_pose": 0, "frames": 0}]}}"#,
        ] {
            let file = write_config(body);
            assert!(Config::from_file(file.path()).is_err(), "accepted {body}");
        }
    }

    #[test]
    fn test_explicit_path_must_exist() {
        assert!(Config::load(Some("/nonexistent/remote-engine.json")).is_err());

        let file = write_config(r#"{"network": {"local_port": 7000}}"#);
        let config = Config::load(file.path().to_str()).unwrap();
        assert_eq!(config.network.local_port, 7000);
    }
}
