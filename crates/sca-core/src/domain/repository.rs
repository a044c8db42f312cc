//! Repository as seen by the task handlers: identity plus default build configuration.

use serde::{Deserialize, Serialize};

use super::ids::RepositoryId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefaults {
    #[serde(default = "none")]
    pub build_tool: String,
    #[serde(default = "none")]
    pub java_version: String,
    #[serde(default, rename = "isSonarQubeEnabled")]
    pub is_sonarqube_enabled: bool,
    #[serde(default = "none")]
    pub python_version: String,
    #[serde(default = "current_dir")]
    pub workdir: String,
}

fn none() -> String {
    "none".to_string()
}

fn current_dir() -> String {
    ".".to_string()
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            build_tool: none(),
            java_version: none(),
            is_sonarqube_enabled: false,
            python_version: none(),
            workdir: current_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepositoryId,
    pub repository_name: String,
    pub git_clone_url: String,
    #[serde(default)]
    pub defaults: BuildDefaults,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn defaults_fill_missing_fields() {
        let repo: Repository = serde_json::from_value(json!({
            "id": Ulid::new().to_string(),
            "repositoryName": "demo",
            "gitCloneUrl": "https://example.com/demo.git",
            "defaults": { "buildTool": "maven" }
        }))
        .unwrap();

        assert_eq!(repo.defaults.build_tool, "maven");
        assert_eq!(repo.defaults.workdir, ".");
        assert_eq!(repo.defaults.java_version, "none");
        assert!(!repo.defaults.is_sonarqube_enabled);
    }
}
