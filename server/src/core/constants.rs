// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "spangroup";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "spangroup.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SPANGROUP_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "SPANGROUP_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SPANGROUP_LOG";

/// Environment variable for the number of pipeline workers
pub const ENV_WORKERS: &str = "SPANGROUP_WORKERS";

/// Environment variable for the project id assigned to spans that carry none
pub const ENV_PROJECT_ID: &str = "SPANGROUP_PROJECT_ID";

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Project id assigned to input spans without one
pub const DEFAULT_PROJECT_ID: u32 = 1;

/// Worker count used when available parallelism cannot be determined
pub const FALLBACK_WORKERS: usize = 4;
