use std::time::Duration;

pub const EXIT_CODE_GENERIC_ERROR: i32 = 1;

pub const BACKEND_URL_VAR: &str = "ANYFLOW_BACKEND_URL";
pub const BASE_RPC_URL_VAR: &str = "ANYFLOW_BASE_RPC_URL";
pub const API_KEY_VAR: &str = "ANYFLOW_API_KEY";
pub const CHAIN_DEPLOYMENT_ID_VAR: &str = "ANYFLOW_CHAIN_DEPLOYMENT_ID";
pub const ENVIRONMENT_VAR: &str = "ANYFLOW_ENV";
pub const DEBUG_VAR: &str = "ANYFLOW_DEBUG";

pub const DOTENV_FILE: &str = ".env";
pub const PACKAGE_JSON_FILE: &str = "package.json";
pub const SDK_PACKAGE: &str = "anyflow-sdk";

pub const EVENTS_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);
pub const CHAINS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const FALLBACK_CHAINS_TTL: Duration = Duration::from_secs(60);
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);
