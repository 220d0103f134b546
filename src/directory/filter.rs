/// Search filter construction
///
/// Caller-supplied values are escaped per RFC 4515 before they are placed in a
/// filter, so a login name such as `*)(objectClass=*` matches literally.
use crate::guid::Guid;
use ldap3::ldap_escape;

const PERSON: &str = "(objectCategory=person)(objectClass=user)";

/// Exact match on the login name
pub fn by_account_name(account_name: &str) -> String {
    format!(
        "(&{}(sAMAccountName={}))",
        PERSON,
        ldap_escape(account_name)
    )
}

/// Exact match on `objectGUID`, using the escaped Windows byte layout
pub fn by_object_guid(guid: &Guid) -> String {
    format!("(&{}(objectGUID={}))", PERSON, guid.to_filter_escaped())
}

/// Prefix match across login name, surname, given name, display name and mail
pub fn fuzzy(term: &str) -> String {
    let term = ldap_escape(term);
    format!(
        "(&{}(|(sAMAccountName={t}*)(sn={t}*)(givenName={t}*)(displayName={t}*)(mail={t}*)))",
        PERSON,
        t = term
    )
}
