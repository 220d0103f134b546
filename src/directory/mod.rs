/// Directory access
///
/// Provides the per-call directory session (bind, search, rebind, close),
/// filter construction and account-state decoding. The wire protocol sits
/// behind the `DirectoryConnector` / `DirectoryConnection` traits so it can be
/// served by the ldap3 client or by any other implementation.

pub mod account;
pub mod filter;
pub mod ldap;
pub mod session;

pub use account::AccountState;
pub use ldap::Ldap3Connector;
pub use session::{DirectorySession, SessionError};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Attribute name of the synthetic distinguished-name entry in a `Record`
pub const DN_ATTR: &str = "dn";

/// A decoded search result row: attribute name -> string value, plus `dn`
pub type Record = HashMap<String, String>;

/// An entry as returned by the directory, before any decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl RawEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add a single-valued attribute
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.attributes.insert(name.into(), vec![value.into()]);
        self
    }

    /// First raw value of an attribute.
    ///
    /// Directories may echo attribute names in a different case than requested,
    /// so an exact match is preferred and a case-insensitive one accepted.
    pub fn first_value(&self, name: &str) -> Option<&[u8]> {
        let values = self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })?;
        values.first().map(Vec::as_slice)
    }
}

/// Transport-level directory errors
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid certificate bundle {0:?}")]
    Certificate(std::path::PathBuf),

    /// Bind rejected by the server (or refused locally)
    #[error("Bind failed: {0}")]
    Bind(String),

    #[error("Search failed: {0}")]
    Search(String),
}

/// Opens fresh directory connections. One connection per call, never pooled.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// One open directory connection
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Simple bind
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Subtree search under `base`, never dereferencing aliases
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<RawEntry>, DirectoryError>;

    /// Graceful unbind
    async fn unbind(&mut self) -> Result<(), DirectoryError>;

    /// Tear the transport down without any protocol exchange. Must be idempotent.
    fn abort(&mut self);
}
