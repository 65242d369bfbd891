//! SQLite columns without `NOT NULL` come back as JSON `null`. `#[serde(default)]` only
//! covers a missing key, so display fields that may be null also go through [`or_default`].

use serde::{Deserialize, Deserializer};

/// Decodes `null` as `T::default()`.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
