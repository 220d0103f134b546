/// Claims mapping between abstract claim names and directory attribute names
use crate::config::{ChildClaim, ClaimsConfig};
use std::collections::{BTreeMap, HashMap};

/// Bidirectional claim <-> attribute lookup, built once from configuration
#[derive(Debug, Clone, Default)]
pub struct ClaimsMapper {
    /// Claim name -> attribute name
    forward: BTreeMap<String, String>,
    /// Attribute name -> claim name
    inverse: HashMap<String, String>,
    children: BTreeMap<String, ChildClaim>,
}

impl ClaimsMapper {
    /// Build the mapper and its inverse table.
    ///
    /// Claims are visited in name order; when several claims target the same
    /// attribute the first one keeps the reverse mapping.
    pub fn new(mapping: BTreeMap<String, String>, children: BTreeMap<String, ChildClaim>) -> Self {
        let mut inverse = HashMap::with_capacity(mapping.len());
        for (claim, attr) in &mapping {
            if attr.is_empty() {
                continue;
            }
            if let Some(existing) = inverse.get(attr) {
                tracing::warn!(
                    "Attribute '{}' is mapped by both '{}' and '{}', reverse lookups use '{}'",
                    attr,
                    existing,
                    claim,
                    existing
                );
                continue;
            }
            inverse.insert(attr.clone(), claim.clone());
        }

        Self {
            forward: mapping,
            inverse,
            children,
        }
    }

    pub fn from_config(config: &ClaimsConfig) -> Self {
        Self::new(config.mapping.clone(), config.children.clone())
    }

    /// Attribute name for a claim, if mapped
    pub fn attribute_for(&self, claim: &str) -> Option<&str> {
        self.forward
            .get(claim)
            .map(String::as_str)
            .filter(|attr| !attr.is_empty())
    }

    /// Claim name for an attribute, if mapped
    pub fn claim_for(&self, attr: &str) -> Option<&str> {
        self.inverse.get(attr).map(String::as_str)
    }

    /// Map requested claim names to attribute names. Unmapped claims are dropped.
    pub fn claims_to_attributes<S: AsRef<str>>(&self, claims: &[S]) -> Vec<String> {
        claims
            .iter()
            .filter_map(|claim| self.attribute_for(claim.as_ref()))
            .map(str::to_string)
            .collect()
    }

    /// Map a decoded directory record back to claim values, adding child claims.
    pub fn attributes_to_claims(&self, record: &HashMap<String, String>) -> HashMap<String, String> {
        let mut claims = HashMap::with_capacity(record.len());

        for (attr, value) in record {
            let Some(claim) = self.claim_for(attr) else {
                continue;
            };
            claims.insert(claim.to_string(), value.clone());

            // Children only accompany a parent that actually resolved
            if value.is_empty() {
                continue;
            }
            if let Some(child) = self.children.get(claim) {
                if !child.name.is_empty() {
                    claims.insert(child.name.clone(), child.value.clone());
                }
            }
        }

        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ClaimsMapper {
        let mapping = BTreeMap::from([
            ("dept".to_string(), "department".to_string()),
            ("email".to_string(), "mail".to_string()),
            ("sub".to_string(), "objectGUID".to_string()),
        ]);
        let children = BTreeMap::from([(
            "dept".to_string(),
            ChildClaim {
                name: "deptLabel".to_string(),
                value: "HR".to_string(),
            },
        )]);
        ClaimsMapper::new(mapping, children)
    }

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_claims_to_attributes_drops_unmapped() {
        let m = mapper();
        let requested = ["email", "unknown", "sub"];
        let attrs = m.claims_to_attributes(&requested);
        assert_eq!(attrs, vec!["mail".to_string(), "objectGUID".to_string()]);
        assert!(attrs.len() <= requested.len());
    }

    #[test]
    fn test_claims_to_attributes_empty_input() {
        let m = mapper();
        let requested: Vec<String> = Vec::new();
        assert!(m.claims_to_attributes(&requested).is_empty());
    }

    #[test]
    fn test_child_claim_emission() {
        let m = mapper();
        let claims = m.attributes_to_claims(&record(&[("department", "Finance")]));
        assert_eq!(
            claims,
            record(&[("dept", "Finance"), ("deptLabel", "HR")])
        );
    }

    #[test]
    fn test_child_claim_skipped_for_empty_parent() {
        let m = mapper();
        let claims = m.attributes_to_claims(&record(&[("department", "")]));
        assert_eq!(claims, record(&[("dept", "")]));
    }

    #[test]
    fn test_unmapped_attributes_and_dn_are_ignored() {
        let m = mapper();
        let claims = m.attributes_to_claims(&record(&[
            ("mail", "jane@example.com"),
            ("dn", "CN=Jane,DC=example,DC=com"),
            ("telephoneNumber", "555"),
        ]));
        assert_eq!(claims, record(&[("email", "jane@example.com")]));
    }

    #[test]
    fn test_duplicate_attribute_targets_resolve_to_first_claim() {
        let mapping = BTreeMap::from([
            ("mail_b".to_string(), "mail".to_string()),
            ("mail_a".to_string(), "mail".to_string()),
        ]);
        let m = ClaimsMapper::new(mapping, BTreeMap::new());
        assert_eq!(m.claim_for("mail"), Some("mail_a"));
        // Forward lookups are unaffected
        assert_eq!(m.attribute_for("mail_b"), Some("mail"));
    }

    #[test]
    fn test_empty_attribute_mapping_is_treated_as_unmapped() {
        let mapping = BTreeMap::from([("nickname".to_string(), String::new())]);
        let m = ClaimsMapper::new(mapping, BTreeMap::new());
        assert_eq!(m.attribute_for("nickname"), None);
        assert!(m.claims_to_attributes(&["nickname"]).is_empty());
    }
}
