//! EarthlyRunner - Earthly による BuildRunner 実装
//!
//! # フロー
//! 1. `executor-` プレフィックスの一時ディレクトリを作成
//! 2. `earthly --artifact +<target>/* <tmp>/` を Earthfile のディレクトリで実行
//! 3. 成功時のみ `<tmp>/result.json` を読み、JSON としてデコード
//! 4. 一時ディレクトリは TempDir の drop で必ず削除される

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{DEFAULT_EXECUTOR_IMAGE, EarthlyConfig};
use crate::domain::ScaError;
use crate::ports::{BuildRequest, BuildResult, BuildRunner};

pub const RESULT_FILE: &str = "result.json";

pub struct EarthlyRunner {
    executable: String,
    earthfile_dir: PathBuf,
    executor_image: String,
    timeout: Option<Duration>,
}

impl EarthlyRunner {
    pub fn new(executable: impl Into<String>, earthfile_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            earthfile_dir: earthfile_dir.into(),
            executor_image: DEFAULT_EXECUTOR_IMAGE.to_string(),
            timeout: None,
        }
    }

    pub fn from_config(config: &EarthlyConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            earthfile_dir: config.earthfile_dir.clone(),
            executor_image: config.executor_image.clone(),
            timeout: config.build_timeout(),
        }
    }

    pub fn with_executor_image(mut self, image: impl Into<String>) -> Self {
        self.executor_image = image.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full environment handed to earthly on top of the inherited one.
    ///
    /// `EXECUTOR_IMAGE` is always passed as a build arg. The key lists are
    /// only exported when non-empty.
    fn environment(&self, request: &BuildRequest) -> Vec<(String, String)> {
        let mut args = request.args.clone();
        args.insert("EXECUTOR_IMAGE".to_string(), self.executor_image.clone());

        let build_arg_keys: Vec<&str> = args.keys().map(String::as_str).collect();
        let secret_keys: Vec<&str> = request.secrets.keys().map(String::as_str).collect();

        let mut env: Vec<(String, String)> = Vec::new();
        if !build_arg_keys.is_empty() {
            env.push(("EARTHLY_BUILD_ARGS".into(), build_arg_keys.join(",")));
        }
        if !secret_keys.is_empty() {
            env.push(("EARTHLY_SECRETS".into(), secret_keys.join(",")));
        }
        env.push(("EARTHLY_ALLOW_PRIVILEGED".into(), "true".into()));
        env.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
        env.extend(request.secrets.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

#[async_trait]
impl BuildRunner for EarthlyRunner {
    async fn run(&self, request: &BuildRequest) -> Result<BuildResult, ScaError> {
        let scratch = tempfile::Builder::new().prefix("executor-").tempdir()?;
        let destination = format!("{}/", scratch.path().display());
        let artifact = format!("+{}/*", request.target);

        debug!(target_name = %request.target, dir = %self.earthfile_dir.display(), "earthly build");

        let mut cmd = Command::new(&self.executable);
        cmd.arg("--artifact")
            .arg(&artifact)
            .arg(&destination)
            .current_dir(&self.earthfile_dir)
            .envs(self.environment(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(output) => output,
                Err(_) => {
                    warn!(target_name = %request.target, ?limit, "earthly build timed out");
                    return Ok(BuildResult::failure(
                        "",
                        format!("build {artifact} timed out after {limit:?}"),
                    ));
                }
            },
            None => cmd.output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(executable = %self.executable, error = %e, "failed to spawn earthly");
                return Ok(BuildResult::failure("", e.to_string()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Ok(BuildResult::failure(stdout, stderr));
        }

        let result_path = scratch.path().join(RESULT_FILE);
        let raw = match tokio::fs::read(&result_path).await {
            Ok(raw) => raw,
            Err(e) => {
                return Err(ScaError::ExternalTool {
                    message: format!("cannot read {}: {e}", result_path.display()),
                    stdout,
                    stderr,
                });
            }
        };
        let result_data = match serde_json::from_slice(&raw) {
            Ok(data) => data,
            Err(e) => {
                return Err(ScaError::ExternalTool {
                    message: format!("{RESULT_FILE} is not valid JSON: {e}"),
                    stdout,
                    stderr,
                });
            }
        };

        Ok(BuildResult {
            success: true,
            stdout,
            stderr,
            result_data: Some(result_data),
        })
    }
}
