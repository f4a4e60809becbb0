//! Endorsement policies: model, evaluation, and the CLI literal grammar.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::LitefabError;

/// Boolean predicate kind over the set of endorsing organizations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyType {
    Any,
    All,
    Majority,
}

/// An endorsement policy: which organizations must have endorsed a
/// transaction for it to be considered properly backed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndorsementPolicy {
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub orgs: Vec<String>,
}

impl EndorsementPolicy {
    pub fn new(policy_type: PolicyType, orgs: Vec<String>) -> Self {
        Self { policy_type, orgs }
    }

    /// The implicit policy used when a DEPLOY carries none: any endorsement
    /// from the creator's own organization.
    pub fn any_of_creator(creator_org_id: &str) -> Self {
        Self::new(PolicyType::Any, vec![creator_org_id.to_string()])
    }

    /// Evaluates the policy against the set of organizations whose
    /// endorsements verified.
    ///
    /// Only organizations named in the policy count; duplicates in either
    /// set are collapsed. MAJORITY requires at least ⌊n/2⌋+1 of the n
    /// distinct policy organizations.
    pub fn is_satisfied_by<'a, I>(&self, endorsed_orgs: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let endorsed: BTreeSet<&str> = endorsed_orgs.into_iter().collect();
        let policy_orgs: BTreeSet<&str> = self.orgs.iter().map(String::as_str).collect();
        let present = policy_orgs.iter().filter(|o| endorsed.contains(**o)).count();

        match self.policy_type {
            PolicyType::Any => present >= 1,
            PolicyType::All => !policy_orgs.is_empty() && present == policy_orgs.len(),
            PolicyType::Majority => present >= policy_orgs.len() / 2 + 1,
        }
    }

    /// Parses the CLI literal `(ANY|ALL|MAJORITY):Org1,Org2[,…]`.
    ///
    /// The type is case-insensitive; organization names are trimmed and
    /// empty entries rejected.
    pub fn parse(literal: &str) -> Result<Self, LitefabError> {
        let (kind, orgs) = literal.split_once(':').ok_or_else(|| {
            LitefabError::BadRequest(format!(
                "policy literal '{literal}' must look like TYPE:Org1,Org2"
            ))
        })?;

        let policy_type = match kind.trim().to_ascii_uppercase().as_str() {
            "ANY" => PolicyType::Any,
            "ALL" => PolicyType::All,
            "MAJORITY" => PolicyType::Majority,
            other => {
                return Err(LitefabError::BadRequest(format!(
                    "unknown policy type '{other}' (expected ANY, ALL, or MAJORITY)"
                )))
            }
        };

        let orgs: Vec<String> = orgs
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if orgs.is_empty() {
            return Err(LitefabError::BadRequest(
                "policy must name at least one organization".into(),
            ));
        }

        Ok(Self { policy_type, orgs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(policy_type: PolicyType, orgs: &[&str]) -> EndorsementPolicy {
        EndorsementPolicy::new(policy_type, orgs.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn any_needs_one_named_org() {
        let p = policy(PolicyType::Any, &["Org1", "Org2"]);
        assert!(p.is_satisfied_by(["Org2"]));
        assert!(!p.is_satisfied_by(["Org3"]));
        assert!(!p.is_satisfied_by([]));
    }

    #[test]
    fn all_needs_every_named_org() {
        let p = policy(PolicyType::All, &["Org1", "Org2"]);
        assert!(p.is_satisfied_by(["Org1", "Org2"]));
        assert!(p.is_satisfied_by(["Org2", "Org1", "Org3"]));
        assert!(!p.is_satisfied_by(["Org1"]));
    }

    #[test]
    fn majority_is_floor_half_plus_one() {
        // n = 3, threshold 2
        let p3 = policy(PolicyType::Majority, &["Org1", "Org2", "Org3"]);
        assert!(!p3.is_satisfied_by(["Org1"]));
        assert!(p3.is_satisfied_by(["Org1", "Org3"]));

        // n = 4, threshold 3
        let p4 = policy(PolicyType::Majority, &["Org1", "Org2", "Org3", "Org4"]);
        assert!(!p4.is_satisfied_by(["Org1", "Org2"]));
        assert!(p4.is_satisfied_by(["Org1", "Org2", "Org4"]));

        // n = 1, threshold 1
        let p1 = policy(PolicyType::Majority, &["Org1"]);
        assert!(p1.is_satisfied_by(["Org1"]));
    }

    #[test]
    fn orgs_outside_the_policy_never_count() {
        let p = policy(PolicyType::Majority, &["Org1", "Org2"]);
        assert!(!p.is_satisfied_by(["Org3", "Org4", "Org5"]));
    }

    #[test]
    fn duplicate_endorsements_collapse() {
        let p = policy(PolicyType::All, &["Org1", "Org2"]);
        assert!(!p.is_satisfied_by(["Org1", "Org1", "Org1"]));
    }

    #[test]
    fn parse_accepts_mixed_case_and_trims() {
        let p = EndorsementPolicy::parse("majority: Org1 , Org2,Org3").unwrap();
        assert_eq!(p.policy_type, PolicyType::Majority);
        assert_eq!(p.orgs, vec!["Org1", "Org2", "Org3"]);
    }

    #[test]
    fn parse_rejects_bad_literals() {
        assert!(EndorsementPolicy::parse("ANY").is_err());
        assert!(EndorsementPolicy::parse("SOME:Org1").is_err());
        assert!(EndorsementPolicy::parse("ALL: , ,").is_err());
    }

    #[test]
    fn policy_type_serializes_uppercase() {
        let p = policy(PolicyType::Any, &["Org1"]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"type":"ANY","orgs":["Org1"]}"#);
    }
}
