/// Directory-backed identity provider (LDAP / Active Directory)
use crate::{
    claims::ClaimsMapper,
    config::LdapConfig,
    directory::{
        filter, AccountState, DirectoryConnector, DirectorySession, Ldap3Connector, Record, DN_ATTR,
    },
    guid::Guid,
    store::{
        AuthRequest, AuthResponse, ClaimsRequest, ClaimsResponse, IdentifierType,
        IdentityProvider, SearchRequest, SearchResponse, SearchResult,
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// `objectGUID`, the principal's subject
pub const OBJECT_GUID_ATTR: &str = "objectGUID";
/// `userAccountControl`, the account state flags
pub const USER_ACCOUNT_CONTROL_ATTR: &str = "userAccountControl";

/// Error codes reported by the directory backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LdapErrorCode {
    /// The connection or the service bind failed
    ConnectionFailed = 1,
    /// A directory search failed, or returned unusable data
    SearchFailed = 2,
    UserNotFound = 3,
    /// The principal's credentials were rejected
    BindFailed = 4,
    AccountDisabled = 5,
    AccountLocked = 6,
}

impl LdapErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Identity provider answering from a directory server.
///
/// Every call opens its own session and closes it before returning.
pub struct LdapIdentityProvider {
    config: Arc<LdapConfig>,
    connector: Arc<dyn DirectoryConnector>,
    mapper: ClaimsMapper,
}

impl LdapIdentityProvider {
    /// Create a provider talking to the configured server through ldap3
    pub fn new(config: LdapConfig) -> Self {
        let connector = Arc::new(Ldap3Connector::new(&config));
        Self::with_connector(config, connector)
    }

    /// Create a provider over any directory transport
    pub fn with_connector(config: LdapConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        let mapper = ClaimsMapper::from_config(&config.schema.claims);
        Self {
            config: Arc::new(config),
            connector,
            mapper,
        }
    }

    async fn open(&self) -> Result<DirectorySession<'_>, LdapErrorCode> {
        tracing::debug!("Opening LDAP connection.");
        DirectorySession::open(self.connector.as_ref(), &self.config)
            .await
            .map_err(|e| {
                tracing::error!("{}", e);
                LdapErrorCode::ConnectionFailed
            })
    }

    async fn search(
        &self,
        session: &mut DirectorySession<'_>,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<Record>, LdapErrorCode> {
        session.search(filter, attrs).await.map_err(|e| {
            tracing::error!("{} (filter: {})", e, filter);
            LdapErrorCode::SearchFailed
        })
    }

    async fn authenticate_with(
        &self,
        session: &mut DirectorySession<'_>,
        req: &AuthRequest,
    ) -> Result<String, LdapErrorCode> {
        tracing::debug!("Searching the distinguished name of the user: {}", req.username);

        let filter = filter::by_account_name(&req.username);
        let attrs = vec![
            OBJECT_GUID_ATTR.to_string(),
            USER_ACCOUNT_CONTROL_ATTR.to_string(),
        ];
        let items = self.search(session, &filter, &attrs).await?;
        let item = items.first().ok_or(LdapErrorCode::UserNotFound)?;

        tracing::debug!("Checking if the account is disabled or locked.");
        let control = item
            .get(USER_ACCOUNT_CONTROL_ATTR)
            .map(String::as_str)
            .unwrap_or_default();
        let state = AccountState::parse(control).map_err(|e| {
            tracing::error!(
                "Could not parse the user account control flag {:?}: {}",
                control,
                e
            );
            LdapErrorCode::SearchFailed
        })?;
        match state {
            AccountState::Disabled => return Err(LdapErrorCode::AccountDisabled),
            AccountState::Locked => return Err(LdapErrorCode::AccountLocked),
            AccountState::Enabled => {}
        }

        let dn = item.get(DN_ATTR).map(String::as_str).unwrap_or_default();
        tracing::debug!("Binding to the domain controller using distinguished name: {}", dn);

        session.rebind(dn, &req.password).await.map_err(|e| {
            tracing::warn!("{} (dn: {}, user: {})", e, dn, req.username);
            LdapErrorCode::BindFailed
        })?;

        match item.get(OBJECT_GUID_ATTR) {
            Some(subject) if !subject.is_empty() => Ok(subject.clone()),
            _ => {
                tracing::error!("No usable {} on {}", OBJECT_GUID_ATTR, dn);
                Err(LdapErrorCode::SearchFailed)
            }
        }
    }

    /// Filter selecting the principal a claims request refers to.
    ///
    /// A subject that is not a GUID cannot name any entry, so it is reported
    /// as not found without contacting the directory.
    fn identity_filter(&self, req: &ClaimsRequest) -> Result<String, LdapErrorCode> {
        match IdentifierType::try_from(req.identifier_type) {
            Ok(IdentifierType::Subject) => match Guid::parse(&req.identifier) {
                Ok(guid) => Ok(filter::by_object_guid(&guid)),
                Err(e) => {
                    tracing::error!("Could not parse the identifier into a GUID: {}", e);
                    Err(LdapErrorCode::UserNotFound)
                }
            },
            Ok(IdentifierType::UserName) => Ok(filter::by_account_name(&req.identifier)),
            Err(other) => {
                tracing::warn!("Unsupported identifier type: {}", other);
                Err(LdapErrorCode::SearchFailed)
            }
        }
    }

    async fn find_claims_with(
        &self,
        session: &mut DirectorySession<'_>,
        filter: &str,
        req: &ClaimsRequest,
    ) -> Result<ClaimsResponse, LdapErrorCode> {
        let attrs = self.mapper.claims_to_attributes(&req.claims);
        let items = self.search(session, filter, &attrs).await?;
        let item = items.first().ok_or(LdapErrorCode::UserNotFound)?;
        Ok(ClaimsResponse::success(self.mapper.attributes_to_claims(item)))
    }

    async fn search_claims_with(
        &self,
        session: &mut DirectorySession<'_>,
        req: &SearchRequest,
    ) -> Result<SearchResponse, LdapErrorCode> {
        let filter = filter::fuzzy(&req.search);
        tracing::debug!("LDAP filter: {}", filter);

        let attrs = self.mapper.claims_to_attributes(&req.claims);
        let items = self.search(session, &filter, &attrs).await?;

        let results = items
            .iter()
            .map(|item| SearchResult {
                properties: self.mapper.attributes_to_claims(item),
            })
            .collect();
        Ok(SearchResponse::success(results))
    }
}

#[async_trait]
impl IdentityProvider for LdapIdentityProvider {
    async fn authenticate(&self, req: AuthRequest) -> AuthResponse {
        tracing::info!("Authenticating user: {}", req.username);

        let mut session = match self.open().await {
            Ok(session) => session,
            Err(code) => return AuthResponse::failed(code.code()),
        };
        let result = self.authenticate_with(&mut session, &req).await;
        session.close().await;

        match result {
            Ok(subject) => AuthResponse::success(subject),
            Err(code) => AuthResponse::failed(code.code()),
        }
    }

    async fn find_claims(&self, req: ClaimsRequest) -> ClaimsResponse {
        tracing::info!(
            "Searching claims for the user: {}:{}",
            req.identifier_type,
            req.identifier
        );

        let filter = match self.identity_filter(&req) {
            Ok(filter) => filter,
            Err(code) => return ClaimsResponse::failed(code.code()),
        };

        let mut session = match self.open().await {
            Ok(session) => session,
            Err(code) => return ClaimsResponse::failed(code.code()),
        };
        let result = self.find_claims_with(&mut session, &filter, &req).await;
        session.close().await;

        result.unwrap_or_else(|code| ClaimsResponse::failed(code.code()))
    }

    async fn search_claims(&self, req: SearchRequest) -> SearchResponse {
        tracing::info!("Searching through the directory using: {}", req.search);

        let mut session = match self.open().await {
            Ok(session) => session,
            Err(code) => return SearchResponse::failed(code.code()),
        };
        let result = self.search_claims_with(&mut session, &req).await;
        session.close().await;

        result.unwrap_or_else(|code| SearchResponse::failed(code.code()))
    }
}
