#![allow(dead_code)]

// In-memory directory used by the integration tests

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use userstore::config::{
    AttributeKind, ChildClaim, ClaimsConfig, LdapConfig, LdapSchema, LdapTlsConfig,
};
use userstore::directory::{DirectoryConnection, DirectoryConnector, DirectoryError, RawEntry};

pub const SERVICE_DN: &str = "CN=svc,OU=Service,DC=example,DC=com";
pub const SERVICE_PASSWORD: &str = "service-secret";
pub const BASE_DN: &str = "DC=example,DC=com";

/// Subject of the sample user, and its Windows byte layout
pub const JDOE_SUBJECT: &str = "00112233-4455-6677-8899-aabbccddeeff";
pub const JDOE_GUID_BYTES: [u8; 16] = [
    0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
];
pub const JDOE_DN: &str = "CN=Jane Doe,OU=Users,DC=example,DC=com";
pub const JDOE_PASSWORD: &str = "hunter2";

/// Everything the fake directory saw
#[derive(Debug, Default)]
pub struct Activity {
    pub connects: usize,
    pub binds: Vec<(String, String)>,
    pub searches: Vec<Search>,
    pub unbinds: usize,
    pub aborts: usize,
}

#[derive(Debug, Clone)]
pub struct Search {
    pub base: String,
    pub filter: String,
    pub attributes: Vec<String>,
}

#[derive(Default)]
struct State {
    entries: Vec<RawEntry>,
    passwords: HashMap<String, String>,
    search_error: bool,
    search_hangs: bool,
    activity: Activity,
}

/// Directory that answers every search with the configured entries
#[derive(Clone, Default)]
pub struct FakeDirectory {
    state: Arc<Mutex<State>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        let dir = Self::default();
        dir.add_account(SERVICE_DN, SERVICE_PASSWORD);
        dir
    }

    /// Directory holding the sample user with the given account control value
    pub fn with_jdoe(control: &str) -> Self {
        let dir = Self::new();
        dir.add_account(JDOE_DN, JDOE_PASSWORD);
        dir.push_entry(jdoe_entry(control));
        dir
    }

    pub fn add_account(&self, dn: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .passwords
            .insert(dn.to_string(), password.to_string());
    }

    pub fn push_entry(&self, entry: RawEntry) {
        self.state.lock().unwrap().entries.push(entry);
    }

    pub fn fail_searches(&self) {
        self.state.lock().unwrap().search_error = true;
    }

    /// Searches never complete
    pub fn hang_searches(&self) {
        self.state.lock().unwrap().search_hangs = true;
    }

    pub fn with_activity<R>(&self, f: impl FnOnce(&Activity) -> R) -> R {
        f(&self.state.lock().unwrap().activity)
    }

    pub fn last_filter(&self) -> Option<String> {
        self.with_activity(|a| a.searches.last().map(|s| s.filter.clone()))
    }

    /// Every connection opened was released exactly once
    pub fn assert_all_released(&self) {
        self.with_activity(|a| {
            assert!(a.connects > 0, "no connection was opened");
            assert_eq!(a.aborts, a.connects, "connections opened vs released");
        });
    }
}

#[async_trait]
impl DirectoryConnector for FakeDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        self.state.lock().unwrap().activity.connects += 1;
        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
            aborted: false,
        }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<State>>,
    aborted: bool,
}

#[async_trait]
impl DirectoryConnection for FakeConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        state
            .activity
            .binds
            .push((dn.to_string(), password.to_string()));
        match state.passwords.get(dn) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(DirectoryError::Bind("invalid credentials".to_string())),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<RawEntry>, DirectoryError> {
        let (hangs, result) = {
            let mut state = self.state.lock().unwrap();
            state.activity.searches.push(Search {
                base: base.to_string(),
                filter: filter.to_string(),
                attributes: attributes.to_vec(),
            });
            let result = if state.search_error {
                Err(DirectoryError::Search("size limit exceeded".to_string()))
            } else {
                Ok(state.entries.clone())
            };
            (state.search_hangs, result)
        };

        if hangs {
            std::future::pending::<()>().await;
        }
        result
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.state.lock().unwrap().activity.unbinds += 1;
        Ok(())
    }

    fn abort(&mut self) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        self.state.lock().unwrap().activity.aborts += 1;
    }
}

pub fn jdoe_entry(control: &str) -> RawEntry {
    RawEntry::new(JDOE_DN)
        .with("objectGUID", JDOE_GUID_BYTES.to_vec())
        .with("userAccountControl", control)
        .with("mail", "jdoe@example.com")
        .with("displayName", "Jane Doe")
        .with("department", "Engineering")
}

pub fn schema() -> LdapSchema {
    let attributes = HashMap::from([
        ("objectGUID".to_string(), AttributeKind::Guid),
        ("userAccountControl".to_string(), AttributeKind::String),
        ("mail".to_string(), AttributeKind::String),
        ("displayName".to_string(), AttributeKind::String),
        ("department".to_string(), AttributeKind::String),
    ]);
    let mapping = BTreeMap::from([
        ("sub".to_string(), "objectGUID".to_string()),
        ("email".to_string(), "mail".to_string()),
        ("name".to_string(), "displayName".to_string()),
        ("dept".to_string(), "department".to_string()),
    ]);
    let children = BTreeMap::from([(
        "dept".to_string(),
        ChildClaim {
            name: "deptLabel".to_string(),
            value: "Department".to_string(),
        },
    )]);

    LdapSchema {
        attributes,
        claims: ClaimsConfig { mapping, children },
    }
}

pub fn ldap_config() -> LdapConfig {
    LdapConfig {
        username: SERVICE_DN.to_string(),
        password: SERVICE_PASSWORD.to_string(),
        server: "dc.example.com".to_string(),
        port: 389,
        tls: LdapTlsConfig::default(),
        container: BASE_DN.to_string(),
        schema: schema(),
    }
}
