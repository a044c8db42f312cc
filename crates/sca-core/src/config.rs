//! Config - TOML 設定と環境変数オーバーライド
//!
//! 優先順位: 環境変数 > TOML ファイル > 既定値
//!
//! ```toml
//! [executor]
//! poll_interval_secs = 10
//!
//! [earthly]
//! executable = "earthly"
//! earthfile_dir = "assets/earthly"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ScaError;

pub const ENV_EARTHLY_EXECUTABLE: &str = "EARTHLY_EXECUTABLE";
pub const ENV_EXECUTOR_IMAGE: &str = "EXECUTOR_IMAGE";
pub const ENV_EARTHFILE_DIR: &str = "SCA_EARTHFILE_DIR";

/// Upper bounds for the maintenance thresholds (100 years).
pub const MAX_STUCK_ANALYSIS_TIMEOUT_SECS: u64 = 100 * 365 * 86_400;
pub const MAX_OLD_TASK_RETENTION_DAYS: u32 = 100 * 365;

/// Earthly target building the executor image, relative to the Earthfile directory.
pub const DEFAULT_EXECUTOR_IMAGE: &str = "../../../../../apps/executor+docker-image";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaConfig {
    pub executor: ExecutorConfig,
    pub sampling: SamplingConfig,
    pub maintenance: MaintenanceConfig,
    pub ingestion: IngestionConfig,
    pub earthly: EarthlyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub poll_interval_secs: u64,
    pub page_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            page_size: 100,
        }
    }
}

impl ExecutorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub max_years: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { max_years: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub interval_secs: u64,
    pub stuck_analysis_timeout_secs: u64,
    pub old_task_retention_days: u32,
    pub batch_size: usize,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            stuck_analysis_timeout_secs: 86_400,
            old_task_retention_days: 7,
            batch_size: 100,
        }
    }
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// `None` when the value does not fit a `chrono::Duration`.
    pub fn stuck_analysis_timeout(&self) -> Option<chrono::Duration> {
        i64::try_from(self.stuck_analysis_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    /// `None` when the value does not fit a `chrono::Duration`.
    pub fn old_task_retention(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_days(i64::from(self.old_task_retention_days))
    }

    fn validate(&self) -> Result<(), ScaError> {
        if self.stuck_analysis_timeout_secs > MAX_STUCK_ANALYSIS_TIMEOUT_SECS {
            return Err(ScaError::Config(format!(
                "maintenance.stuck_analysis_timeout_secs must be at most {MAX_STUCK_ANALYSIS_TIMEOUT_SECS}, got {}",
                self.stuck_analysis_timeout_secs
            )));
        }
        if self.old_task_retention_days > MAX_OLD_TASK_RETENTION_DAYS {
            return Err(ScaError::Config(format!(
                "maintenance.old_task_retention_days must be at most {MAX_OLD_TASK_RETENTION_DAYS}, got {}",
                self.old_task_retention_days
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub bulk_chunk_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            bulk_chunk_size: crate::ports::DEFAULT_BULK_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthlyConfig {
    pub executable: String,
    pub earthfile_dir: PathBuf,
    pub executor_image: String,
    pub build_timeout_secs: Option<u64>,
}

impl Default for EarthlyConfig {
    fn default() -> Self {
        Self {
            executable: "earthly".to_string(),
            earthfile_dir: PathBuf::from("assets/earthly"),
            executor_image: DEFAULT_EXECUTOR_IMAGE.to_string(),
            build_timeout_secs: None,
        }
    }
}

impl EarthlyConfig {
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }
}

impl ScaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ScaError> {
        let cfg: Self = toml::from_str(s).map_err(|e| ScaError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ScaError> {
        self.maintenance.validate()
    }

    /// Loads `path` (or defaults when `None`) and applies process env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ScaError> {
        let mut cfg = match path {
            Some(path) => {
                let s = std::fs::read_to_string(path).map_err(|e| {
                    ScaError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&s)?
            }
            None => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_blank(ENV_EARTHLY_EXECUTABLE) {
            self.earthly.executable = v;
        }
        if let Some(v) = non_blank(ENV_EXECUTOR_IMAGE) {
            self.earthly.executor_image = v;
        }
        if let Some(v) = non_blank(ENV_EARTHFILE_DIR) {
            self.earthly.earthfile_dir = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = ScaConfig::default();
        assert_eq!(cfg.executor.poll_interval(), Duration::from_secs(10));
        assert_eq!(cfg.executor.page_size, 100);
        assert_eq!(cfg.sampling.max_years, 5);
        assert_eq!(
            cfg.maintenance.stuck_analysis_timeout(),
            Some(chrono::Duration::hours(24))
        );
        assert_eq!(
            cfg.maintenance.old_task_retention(),
            Some(chrono::Duration::days(7))
        );
        assert_eq!(cfg.ingestion.bulk_chunk_size, 100);
        assert_eq!(cfg.earthly.executable, "earthly");
        assert_eq!(cfg.earthly.executor_image, DEFAULT_EXECUTOR_IMAGE);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = ScaConfig::from_toml_str(
            r#"
            [maintenance]
            old_task_retention_days = 30

            [earthly]
            build_timeout_secs = 900
            "#,
        )
        .unwrap();

        assert_eq!(cfg.maintenance.old_task_retention_days, 30);
        assert_eq!(cfg.maintenance.interval_secs, 3600);
        assert_eq!(cfg.earthly.build_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(cfg.executor, ExecutorConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = ScaConfig::from_toml_str("[executor]\npage_size = \"many\"").unwrap_err();
        assert!(matches!(err, ScaError::Config(_)));
    }

    #[rstest]
    #[case::stuck_timeout_past_bound("stuck_analysis_timeout_secs = 3153600001")]
    #[case::retention("old_task_retention_days = 4294967295")]
    fn out_of_range_thresholds_are_rejected(#[case] line: &str) {
        let err = ScaConfig::from_toml_str(&format!("[maintenance]\n{line}")).unwrap_err();
        assert!(matches!(err, ScaError::Config(ref msg) if msg.contains("maintenance.")));
    }

    #[test]
    fn unrepresentable_thresholds_have_no_duration() {
        let cfg = MaintenanceConfig {
            stuck_analysis_timeout_secs: u64::MAX,
            old_task_retention_days: u32::MAX,
            ..MaintenanceConfig::default()
        };
        assert_eq!(cfg.stuck_analysis_timeout(), None);
        assert!(cfg.old_task_retention().is_some_and(|d| d > chrono::Duration::days(1)));
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_EARTHLY_EXECUTABLE, "/opt/earthly"),
            (ENV_EXECUTOR_IMAGE, "registry.local/executor:1"),
            (ENV_EARTHFILE_DIR, "  "),
        ]);

        let mut cfg = ScaConfig::default();
        cfg.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.earthly.executable, "/opt/earthly");
        assert_eq!(cfg.earthly.executor_image, "registry.local/executor:1");
        assert_eq!(cfg.earthly.earthfile_dir, PathBuf::from("assets/earthly"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sampling]\nmax_years = 3").unwrap();

        let cfg = ScaConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.sampling.max_years, 3);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = ScaConfig::load(Some(Path::new("/nonexistent/sca.toml"))).unwrap_err();
        assert!(matches!(err, ScaError::Config(_)));
    }
}
