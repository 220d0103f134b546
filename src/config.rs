/// Configuration management for the user store service
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub backend: BackendKind,
    pub ldap: LdapConfig,
    pub file: FileStoreConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Deadline applied to every identity call
    pub request_timeout: Duration,
}

/// Which identity backend serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ldap,
    File,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ldap => "ldap",
            BackendKind::File => "file",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ldap" => Ok(BackendKind::Ldap),
            "file" => Ok(BackendKind::File),
            other => Err(StoreError::Config(format!(
                "Unsupported backend '{}', expected 'ldap' or 'file'",
                other
            ))),
        }
    }
}

/// Directory (LDAP / Active Directory) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Service account used for the initial bind
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub server: String,
    pub port: u16,
    pub tls: LdapTlsConfig,
    /// Base container for every search
    pub container: String,
    pub schema: LdapSchema,
}

impl LdapConfig {
    /// Connection URL for the configured server
    pub fn url(&self) -> String {
        let scheme = if self.tls.enabled { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.server, self.port)
    }

    /// Whether both service account credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// TLS settings for the directory connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapTlsConfig {
    pub enabled: bool,
    /// PEM bundles used as trust anchors
    pub root_cas: Vec<PathBuf>,
    pub insecure_skip_verify: bool,
}

/// How a directory attribute value is turned into a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Raw value
    String,
    /// 16-byte Windows GUID rendered canonically
    Guid,
}

/// A claim synthesized next to its parent claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildClaim {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Claim name tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimsConfig {
    /// Claim name -> attribute name
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
    /// Claim name -> child claim
    #[serde(default)]
    pub children: BTreeMap<String, ChildClaim>,
}

/// Attribute conversion and claim tables, loaded from the schema file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapSchema {
    /// Attribute name -> conversion kind
    #[serde(default)]
    pub attributes: HashMap<String, AttributeKind>,
    #[serde(default)]
    pub claims: ClaimsConfig,
}

impl LdapSchema {
    /// Load the schema from a JSON file
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read LDAP schema file {:?}: {}", path, e))
        })?;
        let schema = serde_json::from_str(&data).map_err(|e| {
            StoreError::Config(format!("Invalid LDAP schema file {:?}: {}", path, e))
        })?;
        Ok(schema)
    }

    /// Conversion kind for an attribute. Attribute names compare
    /// case-insensitively, an exact match wins.
    pub fn kind_of(&self, attr: &str) -> Option<AttributeKind> {
        self.attributes.get(attr).copied().or_else(|| {
            self.attributes
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(attr))
                .map(|(_, kind)| *kind)
        })
    }
}

/// Flat-file store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    pub users_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .unwrap_or_else(|_| "false".to_string())
        .parse()
        .unwrap_or(false)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> StoreResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("USERSTORE_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("USERSTORE_PORT")
            .unwrap_or_else(|_| "2584".to_string())
            .parse()
            .map_err(|_| StoreError::Config("Invalid port number".to_string()))?;
        let request_timeout_secs = env::var("USERSTORE_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let backend: BackendKind = env::var("USERSTORE_BACKEND")
            .unwrap_or_else(|_| "ldap".to_string())
            .parse()?;

        let users_file = env::var("USERSTORE_USERS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("users.json"));

        let tls_enabled = env_flag("LDAP_TLS_ENABLED");
        let root_cas = env::var("LDAP_TLS_ROOT_CAS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>();
        let insecure_skip_verify = env_flag("LDAP_TLS_INSECURE_SKIP_VERIFY");

        let default_port = if tls_enabled { "636" } else { "389" };
        let ldap_port = env::var("LDAP_PORT")
            .unwrap_or_else(|_| default_port.to_string())
            .parse()
            .map_err(|_| StoreError::Config("Invalid LDAP port number".to_string()))?;

        // The schema only matters when the directory serves requests
        let schema = match backend {
            BackendKind::Ldap => {
                let schema_file = env::var("LDAP_SCHEMA_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("ldap-schema.json"));
                LdapSchema::from_file(&schema_file)?
            }
            BackendKind::File => LdapSchema::default(),
        };

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "userstore=debug,tower_http=debug".to_string());
        let log_json = env::var("USERSTORE_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
            backend,
            ldap: LdapConfig {
                username: env::var("LDAP_USERNAME").unwrap_or_default(),
                password: env::var("LDAP_PASSWORD").unwrap_or_default(),
                server: env::var("LDAP_SERVER").unwrap_or_else(|_| "localhost".to_string()),
                port: ldap_port,
                tls: LdapTlsConfig {
                    enabled: tls_enabled,
                    root_cas,
                    insecure_skip_verify,
                },
                container: env::var("LDAP_CONTAINER").unwrap_or_default(),
                schema,
            },
            file: FileStoreConfig { users_file },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> StoreResult<()> {
        if self.service.request_timeout.is_zero() {
            return Err(StoreError::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.backend == BackendKind::Ldap {
            if self.ldap.server.is_empty() {
                return Err(StoreError::Config("LDAP server cannot be empty".to_string()));
            }
            if self.ldap.tls.enabled {
                for ca in &self.ldap.tls.root_cas {
                    if !ca.exists() {
                        return Err(StoreError::Config(format!(
                            "LDAP root CA file {:?} does not exist",
                            ca
                        )));
                    }
                }
            }
            // Missing service credentials are reported per call, not here
        }

        Ok(())
    }
}
