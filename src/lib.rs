/// Userstore - identity and claims resolution service
///
/// Authenticates principals and resolves their claims against an LDAP /
/// Active Directory server or a flat JSON users file.

pub mod api;
pub mod claims;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod guid;
pub mod server;
pub mod store;

pub use context::AppContext;
pub use error::{StoreError, StoreResult};
