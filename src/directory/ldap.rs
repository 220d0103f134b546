/// ldap3-backed directory transport
use crate::{
    config::{LdapConfig, LdapTlsConfig},
    directory::{DirectoryConnection, DirectoryConnector, DirectoryError, RawEntry},
};
use async_trait::async_trait;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Opens plaintext or TLS connections to the configured directory server
#[derive(Debug, Clone)]
pub struct Ldap3Connector {
    url: String,
    tls: LdapTlsConfig,
}

impl Ldap3Connector {
    pub fn new(config: &LdapConfig) -> Self {
        Self {
            url: config.url(),
            tls: config.tls.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn settings(&self) -> Result<LdapConnSettings, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(CONNECT_TIMEOUT);
        if !self.tls.enabled {
            return Ok(settings);
        }

        let mut roots = Vec::new();
        for path in &self.tls.root_cas {
            roots.extend(load_certificates(path).await?);
        }

        let mut builder = native_tls::TlsConnector::builder();
        for cert in roots {
            builder.add_root_certificate(cert);
        }
        if self.tls.insecure_skip_verify {
            tracing::warn!("LDAP server certificate verification is disabled");
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }

        Ok(settings.set_connector(builder.build()?))
    }
}

/// Read every certificate of a PEM bundle
async fn load_certificates(path: &Path) -> Result<Vec<native_tls::Certificate>, DirectoryError> {
    let data = tokio::fs::read_to_string(path).await?;
    let certs = pem_blocks(&data)
        .map(|block| native_tls::Certificate::from_pem(block.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| DirectoryError::Certificate(path.to_path_buf()))?;

    if certs.is_empty() {
        return Err(DirectoryError::Certificate(path.to_path_buf()));
    }
    Ok(certs)
}

/// Split a PEM bundle into its certificate blocks, markers included
fn pem_blocks(data: &str) -> impl Iterator<Item = &str> + '_ {
    data.match_indices(PEM_BEGIN).filter_map(move |(start, _)| {
        let end = data[start..].find(PEM_END)? + start + PEM_END.len();
        Some(&data[start..end])
    })
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let settings = self.settings().await?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url).await?;

        // The connection future must be polled for the handle to make progress
        let driver = tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!("LDAP connection error: {}", e);
            }
        });

        Ok(Box::new(Ldap3Connection { ldap, driver }))
    }
}

struct Ldap3Connection {
    ldap: Ldap,
    driver: JoinHandle<()>,
}

#[async_trait]
impl DirectoryConnection for Ldap3Connection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.ldap
            .simple_bind(dn, password)
            .await?
            .success()
            .map_err(|e| DirectoryError::Bind(e.to_string()))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<RawEntry>, DirectoryError> {
        let (entries, _result) = self
            .ldap
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .search(base, Scope::Subtree, filter, attributes.to_vec())
            .await?
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(into_raw_entry)
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.ldap.unbind().await?;
        Ok(())
    }

    fn abort(&mut self) {
        self.driver.abort();
    }
}

/// ldap3 splits values into text and binary maps; both become raw bytes here
fn into_raw_entry(entry: SearchEntry) -> RawEntry {
    let mut raw = RawEntry::new(entry.dn);
    for (name, values) in entry.attrs {
        raw.attributes
            .entry(name)
            .or_default()
            .extend(values.into_iter().map(String::into_bytes));
    }
    for (name, values) in entry.bin_attrs {
        raw.attributes.entry(name).or_default().extend(values);
    }
    raw
}
