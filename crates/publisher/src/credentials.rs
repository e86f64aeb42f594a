//! Twitter keys loaded from a JSON keyfile.
//!
//! The keyfile holds a `twitter` object:
//!
//! ```json
//! { "twitter": { "consumer_key": "...", "consumer_secret": "...",
//!                "access_key": "...", "access_secret": "..." } }
//! ```
//!
//! The access pair is only needed for posting; `suncast authorize` produces
//! it from the consumer pair.

use std::path::Path;

use serde::Deserialize;
use suncast_common::error::{SuncastError, SuncastResult};

/// Application (consumer) key pair.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConsumerKeys {
    pub consumer_key: String,
    pub consumer_secret: String,
}

/// Everything needed to act as the account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_key: String,
    pub access_secret: String,
}

#[derive(Debug, Deserialize)]
struct Keyfile {
    twitter: KeyfileEntry,
}

#[derive(Debug, Deserialize)]
struct KeyfileEntry {
    consumer_key: String,
    consumer_secret: String,
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    access_secret: Option<String>,
}

impl ConsumerKeys {
    pub fn from_keyfile(path: &Path) -> SuncastResult<Self> {
        let entry = read_keyfile(path)?;
        Ok(Self {
            consumer_key: entry.consumer_key,
            consumer_secret: entry.consumer_secret,
        })
    }
}

impl Credentials {
    pub fn from_keyfile(path: &Path) -> SuncastResult<Self> {
        let entry = read_keyfile(path)?;
        match (entry.access_key, entry.access_secret) {
            (Some(access_key), Some(access_secret)) => Ok(Self {
                consumer_key: entry.consumer_key,
                consumer_secret: entry.consumer_secret,
                access_key,
                access_secret,
            }),
            _ => Err(SuncastError::credentials(format!(
                "{} has no access_key/access_secret; run `suncast authorize` first",
                path.display()
            ))),
        }
    }

    pub fn consumer(&self) -> ConsumerKeys {
        ConsumerKeys {
            consumer_key: self.consumer_key.clone(),
            consumer_secret: self.consumer_secret.clone(),
        }
    }
}

impl std::fmt::Debug for ConsumerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerKeys")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_key", &self.access_key)
            .field("access_secret", &"[REDACTED]")
            .finish()
    }
}

fn read_keyfile(path: &Path) -> SuncastResult<KeyfileEntry> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SuncastError::credentials(format!("cannot read keyfile {}: {e}", path.display()))
    })?;
    let keyfile: Keyfile = serde_json::from_str(&content).map_err(|e| {
        SuncastError::credentials(format!("a valid JSON keyfile is required ({}): {e}", path.display()))
    })?;
    Ok(keyfile.twitter)
}
