use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::traces::Project;

use super::cli::CliConfig;
use super::constants::{CONFIG_FILE_NAME, DEFAULT_PROJECT_ID, FALLBACK_WORKERS};

// =============================================================================
// File Config Structs (deserialized from JSON, all optional)
// =============================================================================

/// Pipeline configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PipelineFileConfig {
    pub workers: Option<usize>,
    pub default_project_id: Option<u32>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub projects: Option<Vec<Project>>,
    pub pipeline: Option<PipelineFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Projects replace the whole list
        if other.projects.is_some() {
            tracing::trace!("Merging projects");
            self.projects = other.projects;
        }

        // Pipeline
        if let Some(pipeline) = other.pipeline {
            let current = self
                .pipeline
                .get_or_insert_with(PipelineFileConfig::default);
            if pipeline.workers.is_some() {
                tracing::trace!(workers = ?pipeline.workers, "Merging pipeline.workers");
                current.workers = pipeline.workers;
            }
            if pipeline.default_project_id.is_some() {
                tracing::trace!(
                    default_project_id = ?pipeline.default_project_id,
                    "Merging pipeline.default_project_id"
                );
                current.default_project_id = pipeline.default_project_id;
            }
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub default_project_id: u32,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub projects: Vec<Project>,
    pub pipeline: PipelineConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Local directory config OR CLI-specified config path
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();

        // 1. Load from CLI-specified path OR local directory
        let path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            tracing::debug!(path = %path.display(), "Config file loaded");
        }

        Self::from_sources(cli, file_config)
    }

    /// Layer defaults, file config and CLI overrides
    fn from_sources(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_pipeline = file_config.pipeline.unwrap_or_default();

        let workers = cli
            .workers
            .or(file_pipeline.workers)
            .unwrap_or_else(default_workers);
        let default_project_id = cli
            .project_id
            .or(file_pipeline.default_project_id)
            .unwrap_or(DEFAULT_PROJECT_ID);

        // No configured projects: synthesize one for the default project id
        let projects = match file_config.projects {
            Some(projects) if !projects.is_empty() => projects,
            _ => {
                tracing::debug!(project_id = default_project_id, "Using default project");
                vec![Project {
                    id: default_project_id,
                    ..Default::default()
                }]
            }
        };

        let config = Self {
            projects,
            pipeline: PipelineConfig {
                workers,
                default_project_id,
            },
            debug: cli.debug || file_config.debug.unwrap_or(false),
        };

        config.validate()?;
        tracing::debug!(
            projects = config.projects.len(),
            workers = config.pipeline.workers,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            anyhow::bail!("Configuration error: pipeline.workers must be greater than 0");
        }

        let mut seen = std::collections::HashSet::new();
        for project in &self.projects {
            if !seen.insert(project.id) {
                anyhow::bail!(
                    "Configuration error: duplicate project id {} in projects",
                    project.id
                );
            }
            if project.unknown_service.is_empty() {
                anyhow::bail!(
                    "Configuration error: projects[{}].unknown_service must not be empty",
                    project.id
                );
            }
        }

        Ok(())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "projects": [
                { "id": 1, "name": "shop", "group_by_env": true },
                { "id": 2, "group_funcs_by_service": true, "unknown_service": "n/a" }
            ],
            "pipeline": { "workers": 8, "default_project_id": 2 },
            "debug": true
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let projects = config.projects.as_ref().unwrap();
        assert_eq!(projects.len(), 2);
        assert!(projects[0].group_by_env);
        assert_eq!(projects[0].unknown_service, "unknown_service");
        assert_eq!(projects[1].unknown_service, "n/a");

        let pipeline = config.pipeline.as_ref().unwrap();
        assert_eq!(pipeline.workers, Some(8));
        assert_eq!(pipeline.default_project_id, Some(2));
        assert_eq!(config.debug, Some(true));
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.projects.is_none());
        assert!(config.pipeline.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "pipeline": { "workers": 2 }, "unknown_field": 123 }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("unknown_field").unwrap(), 123);
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "pipeline": { "workers": 2, "default_project_id": 5 },
                "projects": [{ "id": 5 }]
            }"#,
        )
        .unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "pipeline": { "workers": 6 }, "debug": true }"#).unwrap();

        base.merge(overlay);

        let pipeline = base.pipeline.as_ref().unwrap();
        assert_eq!(pipeline.workers, Some(6));
        assert_eq!(pipeline.default_project_id, Some(5));
        assert_eq!(base.projects.as_ref().unwrap().len(), 1);
        assert_eq!(base.debug, Some(true));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_sources(&CliConfig::default(), FileConfig::default()).unwrap();

        assert!(config.pipeline.workers > 0);
        assert_eq!(config.pipeline.default_project_id, DEFAULT_PROJECT_ID);
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects[0].id, DEFAULT_PROJECT_ID);
        assert!(!config.projects[0].group_by_env);
        assert!(!config.debug);
    }

    #[test]
    fn test_app_config_cli_override() {
        let file = write_config(r#"{ "pipeline": { "workers": 2, "default_project_id": 3 } }"#);
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            workers: Some(16),
            project_id: None,
            debug: true,
        };
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.pipeline.workers, 16);
        assert_eq!(config.pipeline.default_project_id, 3);
        assert_eq!(config.projects[0].id, 3);
        assert!(config.debug);
    }

    #[test]
    fn test_app_config_projects_from_file() {
        let file = write_config(
            r#"{ "projects": [{ "id": 1, "group_funcs_by_service": true }, { "id": 9 }] }"#,
        );
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.projects.len(), 2);
        assert!(config.projects[0].group_funcs_by_service);
        assert_eq!(config.projects[1].id, 9);
    }

    #[test]
    fn test_app_config_missing_file() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/spangroup.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_app_config_invalid_json() {
        let file = write_config("{ not json");
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_app_config_validation_zero_workers() {
        let cli = CliConfig {
            workers: Some(0),
            ..Default::default()
        };
        let err = AppConfig::from_sources(&cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("pipeline.workers"));
    }

    #[test]
    fn test_app_config_validation_duplicate_project() {
        let file_config: FileConfig =
            serde_json::from_str(r#"{ "projects": [{ "id": 4 }, { "id": 4 }] }"#).unwrap();
        let err = AppConfig::from_sources(&CliConfig::default(), file_config).unwrap_err();
        assert!(err.to_string().contains("duplicate project id 4"));
    }
}
