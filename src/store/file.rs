/// Flat-file identity provider
///
/// Users live in a JSON array of `{id, username, password_hash, claims}`
/// records. The file is read on every call so edits apply immediately.
use crate::{
    config::FileStoreConfig,
    error::StoreResult,
    store::{
        AuthRequest, AuthResponse, ClaimsRequest, ClaimsResponse, IdentifierType,
        IdentityProvider, SearchRequest, SearchResponse, SearchResult,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

/// Claim matched by `search_claims` besides the username
const NAME_CLAIM: &str = "name";

/// Error codes reported by the flat-file backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FileErrorCode {
    UserNotFound = 1,
    /// The users file is missing or malformed
    UsersMissing = 2,
    InvalidPassword = 3,
}

impl FileErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A user record of the users file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// Lowercase hex SHA-256 of the password
    pub password_hash: String,
    #[serde(default)]
    pub claims: HashMap<String, String>,
}

impl UserRecord {
    fn matches(&self, identifier: &str, identifier_type: IdentifierType) -> bool {
        match identifier_type {
            IdentifierType::Subject => self.id.eq_ignore_ascii_case(identifier),
            IdentifierType::UserName => self.username.eq_ignore_ascii_case(identifier),
        }
    }

    /// Requested claims; claims the record lacks are returned empty
    fn project(&self, claims: &[String]) -> HashMap<String, String> {
        claims
            .iter()
            .map(|k| (k.clone(), self.claims.get(k).cloned().unwrap_or_default()))
            .collect()
    }
}

/// Hash a password the way the users file stores it
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub struct FileIdentityProvider {
    users_file: PathBuf,
}

impl FileIdentityProvider {
    pub fn new(config: &FileStoreConfig) -> Self {
        Self {
            users_file: config.users_file.clone(),
        }
    }

    async fn load_users(&self) -> StoreResult<Vec<UserRecord>> {
        let data = tokio::fs::read(&self.users_file).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn users(&self) -> Result<Vec<UserRecord>, FileErrorCode> {
        self.load_users().await.map_err(|e| {
            tracing::error!("Could not load users from {:?}: {}", self.users_file, e);
            FileErrorCode::UsersMissing
        })
    }

    async fn find_user(
        &self,
        identifier: &str,
        identifier_type: Option<IdentifierType>,
    ) -> Result<UserRecord, FileErrorCode> {
        let users = self.users().await?;
        let Some(identifier_type) = identifier_type else {
            return Err(FileErrorCode::UserNotFound);
        };
        users
            .into_iter()
            .find(|u| u.matches(identifier, identifier_type))
            .ok_or(FileErrorCode::UserNotFound)
    }
}

#[async_trait]
impl IdentityProvider for FileIdentityProvider {
    async fn authenticate(&self, req: AuthRequest) -> AuthResponse {
        tracing::info!("Authenticating user: {}", req.username);

        let user = match self
            .find_user(&req.username, Some(IdentifierType::UserName))
            .await
        {
            Ok(user) => user,
            Err(code) => return AuthResponse::failed(code.code()),
        };

        if hash_password(&req.password).eq_ignore_ascii_case(&user.password_hash) {
            AuthResponse::success(user.id)
        } else {
            tracing::warn!("Invalid password for user: {}", req.username);
            AuthResponse::failed(FileErrorCode::InvalidPassword.code())
        }
    }

    async fn find_claims(&self, req: ClaimsRequest) -> ClaimsResponse {
        tracing::info!(
            "Searching claims for the user: {}:{}",
            req.identifier_type,
            req.identifier
        );

        let identifier_type = IdentifierType::try_from(req.identifier_type).ok();
        match self.find_user(&req.identifier, identifier_type).await {
            Ok(user) => ClaimsResponse::success(user.project(&req.claims)),
            Err(code) => ClaimsResponse::failed(code.code()),
        }
    }

    async fn search_claims(&self, req: SearchRequest) -> SearchResponse {
        tracing::info!("Searching through the users file using: {}", req.search);

        let users = match self.users().await {
            Ok(users) => users,
            Err(code) => return SearchResponse::failed(code.code()),
        };

        let search = req.search.to_lowercase();
        let results = users
            .iter()
            .filter(|u| {
                u.username.to_lowercase().contains(&search)
                    || u.claims
                        .get(NAME_CLAIM)
                        .is_some_and(|name| name.to_lowercase().contains(&search))
            })
            .map(|u| SearchResult {
                properties: u.project(&req.claims),
            })
            .collect();

        SearchResponse::success(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn users_file() -> NamedTempFile {
        let users = serde_json::json!([
            {
                "id": "u-1",
                "username": "jdoe",
                "password_hash": hash_password("hunter2").to_uppercase(),
                "claims": {"name": "Jane Doe", "email": "jane@example.com"}
            },
            {
                "id": "u-2",
                "username": "bsmith",
                "password_hash": hash_password("swordfish"),
                "claims": {"name": "Bob Smith"}
            }
        ]);
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), users.to_string()).unwrap();
        file
    }

    fn provider(file: &NamedTempFile) -> FileIdentityProvider {
        FileIdentityProvider::new(&FileStoreConfig {
            users_file: file.path().to_path_buf(),
        })
    }

    #[test]
    fn test_hash_password_is_lowercase_sha256() {
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[tokio::test]
    async fn test_authenticate() {
        let file = users_file();
        let p = provider(&file);

        // Stored hash is upper-case: comparison ignores case
        let ok = p
            .authenticate(AuthRequest {
                username: "JDOE".to_string(),
                password: "hunter2".to_string(),
            })
            .await;
        assert_eq!(ok, AuthResponse::success("u-1".to_string()));

        let wrong = p
            .authenticate(AuthRequest {
                username: "jdoe".to_string(),
                password: "nope".to_string(),
            })
            .await;
        assert_eq!(wrong.error, FileErrorCode::InvalidPassword.code());
        assert!(!wrong.succeeded);

        let unknown = p
            .authenticate(AuthRequest {
                username: "ghost".to_string(),
                password: "hunter2".to_string(),
            })
            .await;
        assert_eq!(unknown.error, FileErrorCode::UserNotFound.code());
    }

    #[tokio::test]
    async fn test_find_claims_by_subject_and_username() {
        let file = users_file();
        let p = provider(&file);

        let by_subject = p
            .find_claims(ClaimsRequest::new("U-1", IdentifierType::Subject, &["email", "phone"]))
            .await;
        assert!(by_subject.succeeded);
        assert_eq!(by_subject.claims["email"], "jane@example.com");
        // Requested but absent claims are present and empty
        assert_eq!(by_subject.claims["phone"], "");

        let by_name = p
            .find_claims(ClaimsRequest::new("bsmith", IdentifierType::UserName, &["name"]))
            .await;
        assert_eq!(by_name.claims["name"], "Bob Smith");
    }

    #[tokio::test]
    async fn test_find_claims_unknown_user() {
        let file = users_file();
        let p = provider(&file);

        let resp = p
            .find_claims(ClaimsRequest::new("u-9", IdentifierType::Subject, &["name"]))
            .await;
        assert_eq!(resp, ClaimsResponse::failed(FileErrorCode::UserNotFound.code()));

        let bad_type = p
            .find_claims(ClaimsRequest {
                identifier: "u-1".to_string(),
                identifier_type: 5,
                claims: vec!["name".to_string()],
            })
            .await;
        assert_eq!(bad_type.error, FileErrorCode::UserNotFound.code());
    }

    #[tokio::test]
    async fn test_search_claims_matches_username_or_name() {
        let file = users_file();
        let p = provider(&file);

        let resp = p.search_claims(SearchRequest::new("SMI", &["name"])).await;
        assert!(resp.succeeded);
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].properties["name"], "Bob Smith");

        // Matches both, in file order
        let resp = p.search_claims(SearchRequest::new("o", &["name"])).await;
        let names: Vec<&str> = resp
            .results
            .iter()
            .map(|r| r.properties["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Jane Doe", "Bob Smith"]);

        let empty = p.search_claims(SearchRequest::new("zzz", &["name"])).await;
        assert_eq!(empty, SearchResponse::success(Vec::new()));
    }

    #[tokio::test]
    async fn test_missing_users_file() {
        let p = FileIdentityProvider::new(&FileStoreConfig {
            users_file: PathBuf::from("/nonexistent/users.json"),
        });

        let search = p.search_claims(SearchRequest::new("a", &[])).await;
        assert!(!search.succeeded);
        assert_eq!(search.error, FileErrorCode::UsersMissing.code());

        let auth = p
            .authenticate(AuthRequest {
                username: "jdoe".to_string(),
                password: "hunter2".to_string(),
            })
            .await;
        assert_eq!(auth.error, FileErrorCode::UsersMissing.code());
    }

    #[tokio::test]
    async fn test_malformed_users_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{not json").unwrap();
        let p = provider(&file);

        let resp = p
            .find_claims(ClaimsRequest::new("jdoe", IdentifierType::UserName, &[]))
            .await;
        assert_eq!(resp.error, FileErrorCode::UsersMissing.code());
    }

    #[tokio::test]
    async fn test_bundled_users_file() {
        let p = FileIdentityProvider::new(&FileStoreConfig {
            users_file: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/users.json"),
        });
        let resp = p
            .authenticate(AuthRequest {
                username: "jdoe".to_string(),
                password: "changeme".to_string(),
            })
            .await;
        assert!(resp.succeeded);
        assert_eq!(resp.subject, "0f8fad5b-d9cb-469f-a165-70867728950e");
    }
}
