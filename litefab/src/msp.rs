//! Membership service provider: the identity directory of the network.
//!
//! The MSP is loaded once from a JSON config at startup and is read-only
//! afterwards. It maps identity IDs to `(org, role, public key)` and is the
//! sole authority consulted when verifying signatures: the public key an
//! envelope happens to carry is never trusted over the registered one.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::LitefabError;

/// Role an identity plays in the network.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Client,
    Peer,
    Orderer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Admin => "ADMIN",
            Role::Client => "CLIENT",
            Role::Peer => "PEER",
            Role::Orderer => "ORDERER",
        };
        f.write_str(s)
    }
}

/// One registered identity. IDs are unique network-wide and the public key
/// is stable for the identity's lifetime.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub org_id: String,
    pub role: Role,
    /// SPKI PEM public key.
    pub public_key: String,
}

/// Per-organization slice of the MSP config.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgConfig {
    pub org_id: String,
    #[serde(default)]
    pub root_public_keys: Vec<String>,
    pub identities: Vec<Identity>,
}

/// On-disk MSP config: the full identity directory for the network.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MspConfig {
    pub orgs: Vec<OrgConfig>,
}

/// An organization as seen at runtime.
#[derive(Clone, Debug)]
pub struct Organization {
    pub org_id: String,
    pub root_public_keys: Vec<String>,
    /// IDs of the identities registered under this org.
    pub identity_ids: Vec<String>,
}

/// Result of a signature verification.
///
/// All failures are reported as values; verification never panics and
/// never returns `Err` for untrusted input.
#[derive(Clone, Debug)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub identity: Option<Identity>,
    pub error: Option<String>,
}

impl VerificationOutcome {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            identity: None,
            error: Some(error.into()),
        }
    }
}

/// Runtime identity directory.
#[derive(Clone, Debug)]
pub struct Msp {
    identities: HashMap<String, Identity>,
    orgs: HashMap<String, Organization>,
}

impl Msp {
    /// Builds the directory from a parsed config.
    ///
    /// Rejects duplicate identity IDs and identities whose `orgId` does not
    /// match the organization they are listed under.
    pub fn from_config(config: MspConfig) -> Result<Self, LitefabError> {
        let mut identities = HashMap::new();
        let mut orgs = HashMap::new();

        for org in config.orgs {
            let mut identity_ids = Vec::with_capacity(org.identities.len());
            for identity in org.identities {
                if identity.org_id != org.org_id {
                    return Err(LitefabError::BadRequest(format!(
                        "identity '{}' declares org '{}' but is listed under '{}'",
                        identity.id, identity.org_id, org.org_id
                    )));
                }
                if identities.contains_key(&identity.id) {
                    return Err(LitefabError::BadRequest(format!(
                        "duplicate identity id '{}'",
                        identity.id
                    )));
                }
                identity_ids.push(identity.id.clone());
                identities.insert(identity.id.clone(), identity);
            }
            orgs.insert(
                org.org_id.clone(),
                Organization {
                    org_id: org.org_id,
                    root_public_keys: org.root_public_keys,
                    identity_ids,
                },
            );
        }

        Ok(Self { identities, orgs })
    }

    /// Loads and parses an MSP config file.
    pub fn load(path: &Path) -> Result<Self, LitefabError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LitefabError::BadRequest(format!("reading MSP config {}: {e}", path.display()))
        })?;
        let config: MspConfig = serde_json::from_str(&raw)
            .map_err(|e| LitefabError::BadRequest(format!("parsing MSP config: {e}")))?;
        Self::from_config(config)
    }

    pub fn get_identity(&self, id: &str) -> Option<&Identity> {
        self.identities.get(id)
    }

    pub fn get_organization(&self, org_id: &str) -> Option<&Organization> {
        self.orgs.get(org_id)
    }

    /// Whether `id` exists and holds `role`.
    pub fn has_role(&self, id: &str, role: Role) -> bool {
        self.identities.get(id).is_some_and(|i| i.role == role)
    }

    /// Verifies `signature_b64` over `data` for `signer_id`, optionally
    /// enforcing the signer's role.
    pub fn verify_signature(
        &self,
        data: &str,
        signature_b64: &str,
        signer_id: &str,
        expected_role: Option<Role>,
    ) -> VerificationOutcome {
        let identity = match self.identities.get(signer_id) {
            Some(identity) => identity,
            None => return VerificationOutcome::failure(format!("unknown identity '{signer_id}'")),
        };

        if let Some(role) = expected_role {
            if identity.role != role {
                return VerificationOutcome::failure(format!(
                    "identity '{signer_id}' has role {} but {} is required",
                    identity.role, role
                ));
            }
        }

        match crypto::verify_base64(data, signature_b64, &identity.public_key) {
            Ok(true) => VerificationOutcome {
                valid: true,
                identity: Some(identity.clone()),
                error: None,
            },
            Ok(false) => {
                VerificationOutcome::failure(format!("signature mismatch for '{signer_id}'"))
            }
            Err(e) => VerificationOutcome::failure(format!("unverifiable signature: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningIdentity;

    fn one_org_config(key: &SigningIdentity) -> MspConfig {
        MspConfig {
            orgs: vec![OrgConfig {
                org_id: "Org1".into(),
                root_public_keys: vec![],
                identities: vec![Identity {
                    id: "org1-client".into(),
                    org_id: "Org1".into(),
                    role: Role::Client,
                    public_key: key.public_key_pem().unwrap(),
                }],
            }],
        }
    }

    fn test_key() -> SigningIdentity {
        use std::sync::OnceLock;
        static KEY: OnceLock<SigningIdentity> = OnceLock::new();
        KEY.get_or_init(|| SigningIdentity::generate().expect("keygen")).clone()
    }

    #[test]
    fn lookup_and_role_predicates() {
        let key = test_key();
        let msp = Msp::from_config(one_org_config(&key)).unwrap();

        assert!(msp.get_identity("org1-client").is_some());
        assert!(msp.get_organization("Org1").is_some());
        assert!(msp.has_role("org1-client", Role::Client));
        assert!(!msp.has_role("org1-client", Role::Peer));
        assert!(!msp.has_role("ghost", Role::Client));
    }

    #[test]
    fn verify_signature_happy_path() {
        let key = test_key();
        let msp = Msp::from_config(one_org_config(&key)).unwrap();

        let sig = key.sign_base64("data");
        let outcome = msp.verify_signature("data", &sig, "org1-client", Some(Role::Client));
        assert!(outcome.valid);
        assert_eq!(outcome.identity.unwrap().org_id, "Org1");
    }

    #[test]
    fn verify_signature_reports_failures_as_values() {
        let key = test_key();
        let msp = Msp::from_config(one_org_config(&key)).unwrap();
        let sig = key.sign_base64("data");

        // Unknown signer.
        let outcome = msp.verify_signature("data", &sig, "ghost", None);
        assert!(!outcome.valid);
        assert!(outcome.error.unwrap().contains("unknown identity"));

        // Wrong role.
        let outcome = msp.verify_signature("data", &sig, "org1-client", Some(Role::Peer));
        assert!(!outcome.valid);
        assert!(outcome.error.unwrap().contains("role"));

        // Tampered data.
        let outcome = msp.verify_signature("other", &sig, "org1-client", Some(Role::Client));
        assert!(!outcome.valid);

        // Garbage signature bytes.
        let outcome = msp.verify_signature("data", "%%%", "org1-client", Some(Role::Client));
        assert!(!outcome.valid);
    }

    #[test]
    fn config_validation_rejects_mismatched_org() {
        let key = test_key();
        let mut config = one_org_config(&key);
        config.orgs[0].identities[0].org_id = "Org2".into();
        assert!(Msp::from_config(config).is_err());
    }

    #[test]
    fn config_validation_rejects_duplicate_ids() {
        let key = test_key();
        let mut config = one_org_config(&key);
        let dup = config.orgs[0].identities[0].clone();
        config.orgs[0].identities.push(dup);
        assert!(Msp::from_config(config).is_err());
    }
}
