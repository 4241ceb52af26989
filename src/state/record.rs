//! User record definitions
//!
//! A record is what the API returns for a resolved identifier. Records are
//! only ever appended to the archive, never edited.

use serde::{Deserialize, Deserializer, Serialize};

/// A user resolved from the identifier space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identifier the record was fetched under
    pub id: u64,

    /// Wallet address; the archive's natural key
    pub address: String,

    /// Empty when the API had no linked account (`null` or missing in older archives)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub twitter_username: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub twitter_name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl UserRecord {
    /// Returns the key used for deduplication
    ///
    /// Addresses are hex strings whose casing varies between responses,
    /// so two records are the same user when their addresses match
    /// ignoring ASCII case.
    pub fn dedup_key(&self) -> String {
        self.address.to_ascii_lowercase()
    }
}
