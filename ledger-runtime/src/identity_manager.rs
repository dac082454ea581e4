//! IdentityManager - the identity-to-participant registry.
//!
//! Identity records live in the reserved `$sysidentities` collection.
//!
//! ```text
//!   issue ──► ISSUED ──activate──► ACTIVATED
//!   bind  ──► BOUND  ──activate──┘     │
//!   revoke (from any state but REVOKED) ──► REVOKED
//! ```

use ledger_store::DataCollection;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{IdentityRejection, Result, RuntimeError};
use crate::identity::{certificate_fingerprint, issued_identity_id, IdentityService};
use crate::registry::RegistryType;
use crate::registry_manager::RegistryManager;
use crate::resource::{Relationship, Resource};

pub const SYSIDENTITIES: &str = "$sysidentities";
pub const IDENTITY_CLASS: &str = "ledger.system.Identity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityState {
    Issued,
    Bound,
    Activated,
    Revoked,
}

impl fmt::Display for IdentityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityState::Issued => "ISSUED",
            IdentityState::Bound => "BOUND",
            IdentityState::Activated => "ACTIVATED",
            IdentityState::Revoked => "REVOKED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(rename = "$class")]
    pub class: String,
    pub identity_id: String,
    pub name: String,
    pub issuer: String,
    pub certificate: String,
    pub state: IdentityState,
    /// Relationship to the participant, `resource:ns.Type#id`
    pub participant: String,
}

impl IdentityRecord {
    pub fn participant(&self) -> Result<Relationship> {
        Relationship::parse(&self.participant)
    }

    fn describe(&self) -> String {
        format!(
            "The current identity, with the name '{}' and the identifier '{}'",
            self.name, self.identity_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct IdentityManager {
    identities: DataCollection,
    registries: RegistryManager,
}

impl IdentityManager {
    pub fn new(identities: DataCollection, registries: RegistryManager) -> Self {
        Self {
            identities,
            registries,
        }
    }

    pub async fn get(&self, identity_id: &str) -> Result<IdentityRecord> {
        Ok(serde_json::from_value(self.identities.get(identity_id).await?)?)
    }

    /// The caller's record: by identifier first, then as an issued identity.
    pub async fn find_identity(&self, caller: &dyn IdentityService) -> Result<Option<IdentityRecord>> {
        let Some(identifier) = caller.identifier() else {
            return Ok(None);
        };
        if self.identities.exists(identifier).await? {
            return Ok(Some(self.get(identifier).await?));
        }
        if let (Some(name), Some(issuer)) = (caller.name(), caller.issuer()) {
            let issued_id = issued_identity_id(name, issuer);
            if self.identities.exists(&issued_id).await? {
                return Ok(Some(self.get(&issued_id).await?));
            }
        }
        Ok(None)
    }

    /// Check a record may make a call. ISSUED and BOUND identities may only
    /// activate themselves.
    pub fn validate(&self, record: &IdentityRecord, allow_activation: bool) -> std::result::Result<(), IdentityRejection> {
        match record.state {
            IdentityState::Activated => Ok(()),
            IdentityState::Revoked => Err(IdentityRejection::Revoked),
            IdentityState::Issued | IdentityState::Bound if allow_activation => Ok(()),
            IdentityState::Issued | IdentityState::Bound => Err(IdentityRejection::ActivationRequired),
        }
    }

    /// The participant an identity maps to.
    pub async fn participant(&self, record: &IdentityRecord) -> Result<Resource> {
        self.load_participant(&record.participant()?).await
    }

    /// Map a new identity `name` to a participant; it becomes usable once
    /// its holder activates it.
    pub async fn issue(&self, participant: &Relationship, name: &str, issuer: &str) -> Result<IdentityRecord> {
        if name.is_empty() {
            return Err(RuntimeError::Identity("Identity name must not be empty".into()));
        }
        self.require_participant(participant).await?;

        let record = IdentityRecord {
            class: IDENTITY_CLASS.to_string(),
            identity_id: issued_identity_id(name, issuer),
            name: name.to_string(),
            issuer: issuer.to_string(),
            certificate: String::new(),
            state: IdentityState::Issued,
            participant: participant.to_string(),
        };
        self.identities
            .add(&record.identity_id, serde_json::to_value(&record)?, false)
            .await?;
        info!(name = %name, participant = %participant, "Identity issued");
        Ok(record)
    }

    /// Map an existing certificate to a participant.
    pub async fn bind(&self, participant: &Relationship, certificate: &str) -> Result<IdentityRecord> {
        if certificate.trim().is_empty() {
            return Err(RuntimeError::Identity("Certificate must not be empty".into()));
        }
        self.require_participant(participant).await?;

        let record = IdentityRecord {
            class: IDENTITY_CLASS.to_string(),
            identity_id: certificate_fingerprint(certificate),
            name: String::new(),
            issuer: String::new(),
            certificate: certificate.to_string(),
            state: IdentityState::Bound,
            participant: participant.to_string(),
        };
        self.identities
            .add(&record.identity_id, serde_json::to_value(&record)?, false)
            .await?;
        info!(identity = %record.identity_id, participant = %participant, "Identity bound");
        Ok(record)
    }

    /// Activate the caller's identity.
    pub async fn activate(&self, caller: &dyn IdentityService) -> Result<IdentityRecord> {
        let record = self.find_identity(caller).await?.ok_or_else(|| {
            RuntimeError::Identity("The current identity has not been registered".into())
        })?;

        match record.state {
            IdentityState::Issued => {
                if caller.issuer() != Some(record.issuer.as_str()) {
                    return Err(RuntimeError::Identity(format!(
                        "{}, cannot be activated because the issuer is invalid",
                        record.describe()
                    )));
                }
                let identifier = caller.identifier().unwrap_or_default().to_string();
                let activated = IdentityRecord {
                    identity_id: identifier,
                    certificate: caller.certificate().unwrap_or_default().to_string(),
                    state: IdentityState::Activated,
                    ..record.clone()
                };
                self.identities.remove(&record.identity_id).await?;
                self.identities
                    .add(&activated.identity_id, serde_json::to_value(&activated)?, false)
                    .await?;
                info!(name = %activated.name, identity = %activated.identity_id, "Issued identity activated");
                Ok(activated)
            }
            IdentityState::Bound => {
                let activated = IdentityRecord {
                    state: IdentityState::Activated,
                    ..record
                };
                self.identities
                    .update(&activated.identity_id, serde_json::to_value(&activated)?)
                    .await?;
                info!(identity = %activated.identity_id, "Bound identity activated");
                Ok(activated)
            }
            state => Err(RuntimeError::Identity(format!(
                "{}, cannot be activated because it is in an unknown state '{}'",
                record.describe(),
                state
            ))),
        }
    }

    pub async fn revoke(&self, identity_id: &str) -> Result<IdentityRecord> {
        let record = self.get(identity_id).await?;
        if record.state == IdentityState::Revoked {
            return Err(RuntimeError::Identity(
                "The specified identity has already been revoked".into(),
            ));
        }
        let revoked = IdentityRecord {
            state: IdentityState::Revoked,
            ..record
        };
        self.identities
            .update(identity_id, serde_json::to_value(&revoked)?)
            .await?;
        info!(identity = %identity_id, "Identity revoked");
        Ok(revoked)
    }

    async fn load_participant(&self, participant: &Relationship) -> Result<Resource> {
        let registry = self
            .registries
            .get(RegistryType::Participant, &participant.fqn())
            .await?;
        registry.get(&participant.identifier).await
    }

    async fn require_participant(&self, participant: &Relationship) -> Result<()> {
        match self.load_participant(participant).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(RuntimeError::Identity(format!(
                "The participant '{participant}' does not exist"
            ))),
            Err(e) => Err(e),
        }
    }
}
