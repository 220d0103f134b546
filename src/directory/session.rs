/// Directory session - one bind/search/close lifecycle per call
use crate::{
    config::{AttributeKind, LdapConfig},
    directory::{DirectoryConnection, DirectoryConnector, DirectoryError, RawEntry, Record, DN_ATTR},
    guid::Guid,
};
use thiserror::Error;

const MISSING_CREDENTIALS: &str =
    "Could not read LDAP credentials. Please define 'LDAP_USERNAME' and 'LDAP_PASSWORD' environment variables.";

/// Session failures, one variant per protocol step
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport could not be established or the service bind failed
    #[error("Could not open LDAP connection: {0}")]
    Connect(#[source] DirectoryError),

    #[error("LDAP search failed: {0}")]
    Search(#[source] DirectoryError),

    /// Rebind with the principal's credentials failed
    #[error("Domain controller binding failed: {0}")]
    Bind(#[source] DirectoryError),

    #[error("LDAP session already closed")]
    Closed,
}

/// An open, service-bound directory connection.
///
/// `close()` should be awaited on every exit path. If the session is dropped
/// instead (for example because the owning future was cancelled), the
/// transport is aborted so the connection is still released.
pub struct DirectorySession<'a> {
    conn: Option<Box<dyn DirectoryConnection>>,
    config: &'a LdapConfig,
}

impl<'a> DirectorySession<'a> {
    /// Connect and bind with the service account
    pub async fn open(
        connector: &dyn DirectoryConnector,
        config: &'a LdapConfig,
    ) -> Result<DirectorySession<'a>, SessionError> {
        if !config.has_credentials() {
            // The bind below fails and reports the connection failure
            tracing::error!("{}", MISSING_CREDENTIALS);
        }

        let conn = connector.connect().await.map_err(SessionError::Connect)?;
        let mut session = DirectorySession {
            conn: Some(conn),
            config,
        };

        // A failed bind drops the session, which aborts the transport
        simple_bind(session.connection()?, &config.username, &config.password)
            .await
            .map_err(SessionError::Connect)?;

        Ok(session)
    }

    fn connection(&mut self) -> Result<&mut Box<dyn DirectoryConnection>, SessionError> {
        self.conn.as_mut().ok_or(SessionError::Closed)
    }

    /// Search under the configured container and decode the requested attributes
    pub async fn search(
        &mut self,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<Record>, SessionError> {
        let config = self.config;
        let entries = self
            .connection()?
            .search(&config.container, filter, attributes)
            .await
            .map_err(SessionError::Search)?;

        Ok(entries
            .iter()
            .map(|entry| self.decode_entry(entry, attributes))
            .collect())
    }

    /// Rebind as the given principal
    pub async fn rebind(&mut self, dn: &str, password: &str) -> Result<(), SessionError> {
        simple_bind(self.connection()?, dn, password)
            .await
            .map_err(SessionError::Bind)
    }

    /// Unbind and release the connection
    pub async fn close(mut self) {
        if let Some(conn) = self.conn.as_mut() {
            if let Err(e) = conn.unbind().await {
                tracing::debug!("LDAP unbind failed: {}", e);
            }
        }
        if let Some(mut conn) = self.conn.take() {
            conn.abort();
        }
    }

    /// Turn a raw entry into a record using the configured conversion kinds
    fn decode_entry(&self, entry: &RawEntry, attributes: &[String]) -> Record {
        let mut record = Record::with_capacity(attributes.len() + 1);

        for attr in attributes {
            match self.config.schema.kind_of(attr) {
                Some(AttributeKind::String) => {
                    let value = entry
                        .first_value(attr)
                        .map(|v| String::from_utf8_lossy(v).into_owned())
                        .unwrap_or_default();
                    record.insert(attr.clone(), value);
                }
                Some(AttributeKind::Guid) => {
                    match entry.first_value(attr).and_then(Guid::from_windows_slice) {
                        Some(guid) => {
                            record.insert(attr.clone(), guid.to_string());
                        }
                        None => tracing::warn!(
                            "Attribute '{}' of {} does not hold a 16-byte GUID",
                            attr,
                            entry.dn
                        ),
                    }
                }
                None => tracing::warn!("Unsupported conversion type for attribute: {}", attr),
            }
        }

        record.insert(DN_ATTR.to_string(), entry.dn.clone());
        record
    }
}

impl Drop for DirectorySession<'_> {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            tracing::debug!("LDAP session dropped before close, aborting connection");
            conn.abort();
        }
    }
}

/// Simple bind that refuses empty passwords.
///
/// An LDAP simple bind with an empty password is an unauthenticated bind that
/// most servers accept, so it must never reach the wire.
async fn simple_bind(
    conn: &mut Box<dyn DirectoryConnection>,
    dn: &str,
    password: &str,
) -> Result<(), DirectoryError> {
    if password.is_empty() {
        return Err(DirectoryError::Bind("empty password not allowed".to_string()));
    }
    conn.bind(dn, password).await
}
