//! Project settings that influence grouping, and the lookup seam used to find them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Service name used when a span carries none.
pub const DEFAULT_UNKNOWN_SERVICE: &str = "unknown_service";

fn default_unknown_service() -> String {
    DEFAULT_UNKNOWN_SERVICE.to_string()
}

/// Per-project grouping options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Group root, non-internal and `code.function` spans per service.
    #[serde(default)]
    pub group_funcs_by_service: bool,
    /// Prefix every group with the deployment environment.
    #[serde(default)]
    pub group_by_env: bool,
    #[serde(default = "default_unknown_service")]
    pub unknown_service: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            group_funcs_by_service: false,
            group_by_env: false,
            unknown_service: default_unknown_service(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("project {0} not found")]
    NotFound(u32),
}

/// Resolves project settings by id.
pub trait ProjectResolver: Send + Sync {
    fn resolve(&self, project_id: u32) -> Result<Arc<Project>, ProjectError>;
}

/// Resolver backed by a fixed set of projects, typically loaded from config.
#[derive(Debug, Default)]
pub struct StaticProjects {
    projects: HashMap<u32, Arc<Project>>,
}

impl StaticProjects {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|p| (p.id, Arc::new(p)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ProjectResolver for StaticProjects {
    fn resolve(&self, project_id: u32) -> Result<Arc<Project>, ProjectError> {
        self.projects
            .get(&project_id)
            .cloned()
            .ok_or(ProjectError::NotFound(project_id))
    }
}
