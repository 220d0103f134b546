/// Identity stores
///
/// Every backend answers the same three calls. Failures are reported through
/// the `error` code of the response, never as a transport fault.

pub mod file;
pub mod ldap;

pub use file::{FileErrorCode, FileIdentityProvider};
pub use ldap::{LdapErrorCode, LdapIdentityProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity provider contract
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check a username / password pair and return the principal's subject
    async fn authenticate(&self, req: AuthRequest) -> AuthResponse;

    /// Resolve the requested claims of a single principal
    async fn find_claims(&self, req: ClaimsRequest) -> ClaimsResponse;

    /// Resolve the requested claims of every principal matching a search term
    async fn search_claims(&self, req: SearchRequest) -> SearchResponse;
}

/// How `ClaimsRequest::identifier` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    Subject = 0,
    UserName = 1,
}

impl TryFrom<i32> for IdentifierType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IdentifierType::Subject),
            1 => Ok(IdentifierType::UserName),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub succeeded: bool,
    pub subject: String,
    pub error: i32,
}

impl AuthResponse {
    pub fn failed(error: i32) -> Self {
        Self {
            error,
            ..Default::default()
        }
    }

    pub fn success(subject: String) -> Self {
        Self {
            succeeded: true,
            subject,
            error: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsRequest {
    pub identifier: String,
    /// Raw wire value, see `IdentifierType`
    #[serde(default)]
    pub identifier_type: i32,
    #[serde(default)]
    pub claims: Vec<String>,
}

impl ClaimsRequest {
    pub fn new(identifier: impl Into<String>, identifier_type: IdentifierType, claims: &[&str]) -> Self {
        Self {
            identifier: identifier.into(),
            identifier_type: identifier_type as i32,
            claims: claims.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsResponse {
    pub succeeded: bool,
    pub claims: HashMap<String, String>,
    pub error: i32,
}

impl ClaimsResponse {
    pub fn failed(error: i32) -> Self {
        Self {
            error,
            ..Default::default()
        }
    }

    pub fn success(claims: HashMap<String, String>) -> Self {
        Self {
            succeeded: true,
            claims,
            error: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,
    #[serde(default)]
    pub claims: Vec<String>,
}

impl SearchRequest {
    pub fn new(search: impl Into<String>, claims: &[&str]) -> Self {
        Self {
            search: search.into(),
            claims: claims.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One matching principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub succeeded: bool,
    pub results: Vec<SearchResult>,
    pub error: i32,
}

impl SearchResponse {
    pub fn failed(error: i32) -> Self {
        Self {
            error,
            ..Default::default()
        }
    }

    pub fn success(results: Vec<SearchResult>) -> Self {
        Self {
            succeeded: true,
            results,
            error: 0,
        }
    }
}
