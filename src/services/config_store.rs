// Configuration Storage Service
// Handles config file read/write and version backup

use crate::models::CategoryFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Read-only detector configuration, constructed once and passed by
/// reference into the pipeline. Never a hidden process singleton.
///
/// Pixel thresholds are expressed in upscaled-OCR space; `upscale` is the
/// factor the capture is scaled by before the OCR pass and is what callers
/// use to convert boxes back to raw-capture space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Tokens below this OCR confidence are discarded.
    #[serde(default)]
    pub min_confidence: f64,
    #[serde(default = "default_upscale")]
    pub upscale: f64,
    /// Max horizontal gap (px) between token boxes fused into one run.
    #[serde(default = "default_merge_gap")]
    pub merge_gap_px: i32,
    /// Fraction of the capture height covered by the bottom ROI band pass.
    #[serde(default = "default_band_ratio")]
    pub roi_band_ratio: f64,
    /// Mask blatant secrets before the text leaves the process.
    #[serde(default = "default_true")]
    pub privacy_first: bool,
    /// Run the regex/checksum detector ahead of the LLM.
    #[serde(default = "default_true")]
    pub use_fallback: bool,
    /// Offset slack for collapsing near-duplicate findings from the two
    /// detectors. A tunable heuristic, not a guaranteed-correct rule.
    #[serde(default = "default_slack")]
    pub near_duplicate_slack: usize,
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    /// Initial attempt plus retries for the remote detector.
    #[serde(default = "default_llm_attempts")]
    pub llm_max_attempts: usize,
    /// Category toggles; empty means detect all categories.
    #[serde(default)]
    pub categories: CategoryFilter,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            upscale: 1.9,
            merge_gap_px: 6,
            roi_band_ratio: 0.2,
            privacy_first: true,
            use_fallback: true,
            near_duplicate_slack: 2,
            llm_timeout_secs: 60,
            llm_max_attempts: 3,
            categories: CategoryFilter::new(),
        }
    }
}

fn default_upscale() -> f64 { 1.9 }
fn default_merge_gap() -> i32 { 6 }
fn default_band_ratio() -> f64 { 0.2 }
fn default_true() -> bool { true }
fn default_slack() -> usize { 2 }
fn default_llm_timeout() -> u64 { 60 }
fn default_llm_attempts() -> usize { 3 }

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub version: String,
    pub default_provider: Option<String>,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("screenguard"))
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &PathBuf, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Sort by modification time (oldest first)
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        // Remove oldest entries
        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Get provider API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_detector_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.merge_gap_px, 6);
        assert_eq!(config.upscale, 1.9);
        assert_eq!(config.near_duplicate_slack, 2);
        assert!(config.privacy_first);
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            version: "1.0.0".to_string(),
            default_provider: Some("gemini".to_string()),
            detector: DetectorConfig::default(),
            api_keys: HashMap::new(),
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.detector.merge_gap_px, 6);
    }

    #[test]
    fn test_partial_detector_config_uses_defaults() {
        let parsed: DetectorConfig = serde_json::from_str(r#"{"mergeGapPx": 10}"#).unwrap();
        assert_eq!(parsed.merge_gap_px, 10);
        assert_eq!(parsed.llm_timeout_secs, 60);
        assert!(parsed.use_fallback);
    }
}
