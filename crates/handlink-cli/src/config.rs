//! Configuration – reads/writes `~/.handlink/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use handlink_middleware::{DEFAULT_PORT, Endpoint, FrameDecoder, decoder::DEFAULT_DELIMITER};
use handlink_runtime::{SessionConfig, TriggerMode};
use handlink_types::{HandError, Side};

/// Where the glove's WebSocket server lives and how it frames data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GloveConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub delimiter: char,
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.12".to_string(),
            port: DEFAULT_PORT,
            path: String::new(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// Persisted user configuration stored in `~/.handlink/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Simulation ticks per second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Bones per finger in the simulated rig.
    #[serde(default = "default_bone_segments")]
    pub bone_segments: usize,

    #[serde(default)]
    pub glove: GloveConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

fn default_tick_hz() -> u32 {
    60
}
fn default_bone_segments() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            bone_segments: default_bone_segments(),
            glove: GloveConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.glove.host.clone(), self.glove.port).with_path(self.glove.path.clone())
    }

    pub fn decoder(&self) -> FrameDecoder {
        FrameDecoder::new(self.glove.delimiter, Side::Left)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), HandError> {
        if self.tick_hz == 0 {
            return Err(HandError::Config("tick_hz must be at least 1".to_string()));
        }
        if self.glove.host.trim().is_empty() {
            return Err(HandError::Config("glove.host is empty".to_string()));
        }
        if self.glove.delimiter.is_whitespace() {
            return Err(HandError::Config("glove.delimiter cannot be whitespace".to_string()));
        }
        Ok(())
    }
}

/// Return the path to `~/.handlink/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".handlink").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(Some(cfg))
}

/// Apply `HANDLINK_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HANDLINK_HOST` | `glove.host` |
/// | `HANDLINK_PORT` | `glove.port` |
/// | `HANDLINK_TICK_HZ` | `tick_hz` |
/// | `HANDLINK_TRIGGER_MODE` | `session.gestures.trigger_mode` (`level` or `edge`) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("HANDLINK_HOST") {
        cfg.glove.host = v;
    }
    if let Ok(v) = std::env::var("HANDLINK_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.glove.port = port;
    }
    if let Ok(v) = std::env::var("HANDLINK_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("HANDLINK_TRIGGER_MODE")
        && let Ok(mode) = v.parse::<TriggerMode>()
    {
        cfg.session.gestures.trigger_mode = mode;
    }
}

/// Save the config to disk, creating `~/.handlink/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
