//! Two-tier token storage
//!
//! The persistent region survives restarts, the ephemeral region does not.
//! Tokens live in exactly one region at a time, picked by the policy;
//! every write to one region purges the token keys from the other.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use studyai_storage::{KeyValueStore, MemoryStore};

use crate::Result;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const REMEMBER_ME_KEY: &str = "remember_me";
pub const REMEMBERED_EMAIL_KEY: &str = "remembered_email";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, REMEMBER_ME_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// "Remember me": survives process restart
    Persistent,
    /// Cleared when the process ends
    SessionOnly,
}

impl PersistencePolicy {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            PersistencePolicy::Persistent
        } else {
            PersistencePolicy::SessionOnly
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, PersistencePolicy::Persistent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub policy: PersistencePolicy,
}

pub struct TokenStore {
    persistent: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(persistent: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            ephemeral,
        }
    }

    /// Both regions in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn persistent(&self) -> &Arc<dyn KeyValueStore> {
        &self.persistent
    }

    pub fn ephemeral(&self) -> &Arc<dyn KeyValueStore> {
        &self.ephemeral
    }

    fn region(&self, policy: PersistencePolicy) -> &dyn KeyValueStore {
        match policy {
            PersistencePolicy::Persistent => self.persistent.as_ref(),
            PersistencePolicy::SessionOnly => self.ephemeral.as_ref(),
        }
    }

    fn other_region(&self, policy: PersistencePolicy) -> &dyn KeyValueStore {
        match policy {
            PersistencePolicy::Persistent => self.ephemeral.as_ref(),
            PersistencePolicy::SessionOnly => self.persistent.as_ref(),
        }
    }

    /// Read back a saved session, persistent region first.
    ///
    /// The region's `remember_me` flag decides the policy; a region
    /// without the flag reports its own natural policy.
    pub fn load(&self) -> Result<Option<StoredTokens>> {
        for policy in [PersistencePolicy::Persistent, PersistencePolicy::SessionOnly] {
            let region = self.region(policy);
            let Some(access_token) = region.get(ACCESS_TOKEN_KEY)? else {
                continue;
            };

            let policy = match region.get(REMEMBER_ME_KEY)?.as_deref() {
                Some("true") => PersistencePolicy::Persistent,
                Some("false") => PersistencePolicy::SessionOnly,
                _ => policy,
            };

            return Ok(Some(StoredTokens {
                access_token,
                refresh_token: region.get(REFRESH_TOKEN_KEY)?,
                policy,
            }));
        }

        Ok(None)
    }

    pub fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        policy: PersistencePolicy,
    ) -> Result<()> {
        for key in SESSION_KEYS {
            self.other_region(policy).remove(key)?;
        }

        let region = self.region(policy);
        region.set(ACCESS_TOKEN_KEY, access_token)?;
        region.set(REFRESH_TOKEN_KEY, refresh_token)?;
        region.set(
            REMEMBER_ME_KEY,
            if policy.is_persistent() { "true" } else { "false" },
        )?;

        Ok(())
    }

    /// Remove session keys from both regions. The remembered email stays.
    pub fn clear(&self) -> Result<()> {
        for region in [self.persistent.as_ref(), self.ephemeral.as_ref()] {
            for key in SESSION_KEYS {
                region.remove(key)?;
            }
        }
        Ok(())
    }

    pub fn remembered_email(&self) -> Result<Option<String>> {
        Ok(self.persistent.get(REMEMBERED_EMAIL_KEY)?)
    }

    pub fn save_remembered_email(&self, email: &str) -> Result<()> {
        Ok(self.persistent.set(REMEMBERED_EMAIL_KEY, email)?)
    }

    pub fn clear_remembered_email(&self) -> Result<()> {
        Ok(self.persistent.remove(REMEMBERED_EMAIL_KEY)?)
    }
}

impl Clone for TokenStore {
    fn clone(&self) -> Self {
        Self {
            persistent: Arc::clone(&self.persistent),
            ephemeral: Arc::clone(&self.ephemeral),
        }
    }
}
