//! Per-user profile settings.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::Result;
use propcalc_store::KvStore;

/// Storage key for a profile.
pub(crate) fn profile_key(user_id: &str) -> String {
    format!("profile:{}", user_id)
}

/// Non-binary per-user settings.
///
/// Profiles are created lazily on first write and shallow-merged on
/// every update. Photo binaries are an external collaborator's
/// responsibility, so the `photo` field is unconditionally stripped
/// before persisting. Keys and values are otherwise not validated.
#[derive(Clone)]
pub struct ProfileManager {
    store: Arc<dyn KvStore>,
}

impl ProfileManager {
    /// Creates a manager over the given store.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Reads a user's settings. Returns an empty map when no profile
    /// exists or the stored value is not a JSON object.
    pub async fn get(&self, user_id: &str) -> Result<Map<String, Value>> {
        let existing = self.store.get(&profile_key(user_id)).await?;
        Ok(existing
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Shallow-merges `partial` onto the stored settings: new keys
    /// overwrite, untouched keys are preserved. The merge is a
    /// separate GET then SET, so two concurrent updates to the same
    /// profile can race and the later write wins.
    pub async fn set(&self, user_id: &str, partial: Map<String, Value>) -> Result<()> {
        let mut merged = self.get(user_id).await?;
        for (key, value) in partial {
            merged.insert(key, value);
        }
        merged.remove("photo");

        let payload = serde_json::to_string(&Value::Object(merged))?;
        self.store.set(&profile_key(user_id), &payload).await?;
        Ok(())
    }
}
