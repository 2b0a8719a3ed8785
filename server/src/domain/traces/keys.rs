//! Canonical attribute keys and event names
//!
//! Every alias resolved by the normalizer lands on one of these keys, and the
//! classifiers only ever look attributes up through them.

// Resource
pub const PROJECT_ID: &str = "spangroup.project_id";
pub const SERVICE_NAME: &str = "service.name";
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

// Display
pub const DISPLAY_NAME: &str = "display.name";

// Code
pub const CODE_FUNCTION: &str = "code.function";

// HTTP
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_ROUTE: &str = "http.route";
pub const HTTP_TARGET: &str = "http.target";
pub const HTTP_USER_AGENT: &str = "http.user_agent";
pub const HTTP_USER_AGENT_NAME: &str = "http.user_agent.name";
pub const HTTP_USER_AGENT_VERSION: &str = "http.user_agent.version";
pub const HTTP_USER_AGENT_OS: &str = "http.user_agent.os";
pub const HTTP_USER_AGENT_OS_VERSION: &str = "http.user_agent.os_version";
pub const HTTP_USER_AGENT_DEVICE: &str = "http.user_agent.device";
pub const HTTP_USER_AGENT_BOT: &str = "http.user_agent.bot";

// RPC
pub const RPC_SYSTEM: &str = "rpc.system";
pub const RPC_SERVICE: &str = "rpc.service";
pub const RPC_METHOD: &str = "rpc.method";

// Messaging
pub const MESSAGING_SYSTEM: &str = "messaging.system";
pub const MESSAGING_OPERATION: &str = "messaging.operation";
pub const MESSAGING_DESTINATION_NAME: &str = "messaging.destination.name";
pub const MESSAGING_DESTINATION_KIND: &str = "messaging.destination.kind";
pub const MESSAGE_TYPE: &str = "message.type";

// Database
pub const DB_SYSTEM: &str = "db.system";
pub const DB_NAME: &str = "db.name";
pub const DB_OPERATION: &str = "db.operation";
pub const DB_STATEMENT: &str = "db.statement";
pub const DB_SQL_TABLE: &str = "db.sql.table";

// Logs
pub const LOG_SEVERITY: &str = "log.severity";
pub const LOG_MESSAGE: &str = "log.message";

// Exceptions
pub const EXCEPTION_TYPE: &str = "exception.type";
pub const EXCEPTION_MESSAGE: &str = "exception.message";

/// Free-text attributes never expanded as JSON
pub const VERBATIM_KEYS: &[&str] = &[LOG_MESSAGE, EXCEPTION_MESSAGE];

// Span event names
pub const EVENT_LOG: &str = "log";
pub const EVENT_EXCEPTION: &str = "exception";
pub const EVENT_ERROR: &str = "error";
pub const EVENT_MESSAGE: &str = "message";
