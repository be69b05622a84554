use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
    /// Forward log records to the connected peer once it subscribes
    #[serde(default = "default_true")]
    pub ble_backend_enabled: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
            ble_backend_enabled: default_true(),
        }
    }
}

fn default_level() -> String {
    "debug".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "accel_log_node".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Knobs for the simulated radio and accelerometer used when no real hardware is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_true")]
    pub accel_runtime_odr: bool,
    /// Data-ready rate used when the rate cannot be changed at runtime
    #[serde(default = "default_compiled_odr_hz")]
    pub compiled_odr_hz: u32,
    #[serde(default = "default_peer_address")]
    pub peer_address: String,
    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,
    #[serde(default = "default_session_ms")]
    pub session_ms: u64,
    /// Number of simulated peer sessions; `None` keeps reconnecting forever
    #[serde(default = "default_sessions")]
    pub sessions: Option<u32>,
    #[serde(default = "default_true")]
    pub inject_read_failure: bool,
    #[serde(default = "default_true")]
    pub cancel_pairing: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            accel_runtime_odr: default_true(),
            compiled_odr_hz: default_compiled_odr_hz(),
            peer_address: default_peer_address(),
            connect_delay_ms: default_connect_delay_ms(),
            session_ms: default_session_ms(),
            sessions: default_sessions(),
            inject_read_failure: default_true(),
            cancel_pairing: default_true(),
        }
    }
}

fn default_compiled_odr_hz() -> u32 {
    10
}
fn default_peer_address() -> String {
    "C0:11:22:33:44:55 (random)".to_string()
}
fn default_connect_delay_ms() -> u64 {
    3000
}
fn default_session_ms() -> u64 {
    10_000
}
fn default_sessions() -> Option<u32> {
    Some(2)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Complete local name carried in the scan response
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Requested accelerometer output data rate, applied only if the driver supports it
    #[serde(default = "default_sampling_rate_hz")]
    pub sampling_rate_hz: Option<u32>,
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            sampling_rate_hz: default_sampling_rate_hz(),
            idle_interval_ms: default_idle_interval_ms(),
            log_settings: LogSettings::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    "Croxel Accel Demo".to_string()
}
fn default_sampling_rate_hz() -> Option<u32> {
    Some(1)
}
fn default_idle_interval_ms() -> u64 {
    2000
}

pub struct SettingsService {
    settings: NodeSettings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    /// Load from an explicit path, falling back to defaults if the file is unusable
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("AccelLogNode");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<NodeSettings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    /// Write the current settings if no settings file exists yet. Returns whether it wrote.
    pub fn save_if_missing(&self) -> anyhow::Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &NodeSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: NodeSettings =
            serde_json::from_str(r#"{ "device_name": "Bench Node", "sampling_rate_hz": null }"#)
                .unwrap();
        assert_eq!(settings.device_name, "Bench Node");
        assert_eq!(settings.sampling_rate_hz, None);
        assert_eq!(settings.idle_interval_ms, 2000);
        assert!(settings.log_settings.ble_backend_enabled);
        assert_eq!(settings.simulation.sessions, Some(2));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("accel_log_node_missing_settings.json");
        let _ = fs::remove_file(&path);

        let service = SettingsService::from_path(path);
        assert_eq!(service.get().device_name, "Croxel Accel Demo");
        assert_eq!(service.get().sampling_rate_hz, Some(1));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "accel_log_node_settings_{}.json",
            std::process::id()
        ));
        let service = SettingsService::from_path(path.clone());
        service.save().unwrap();

        let reloaded = SettingsService::from_path(path.clone());
        assert_eq!(reloaded.get().device_name, service.get().device_name);
        assert_eq!(reloaded.path(), path.as_path());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_first_run_writes_defaults_once() {
        let path = std::env::temp_dir().join(format!(
            "accel_log_node_first_run_{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        let service = SettingsService::from_path(path.clone());
        assert!(service.save_if_missing().unwrap());
        assert!(path.exists());

        // An existing file is left alone
        fs::write(&path, r#"{ "device_name": "Bench Node" }"#).unwrap();
        assert!(!service.save_if_missing().unwrap());
        assert_eq!(
            SettingsService::from_path(path.clone()).get().device_name,
            "Bench Node"
        );
        let _ = fs::remove_file(path);
    }
}
