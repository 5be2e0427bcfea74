//! Serde support for the integer unix timestamps the API uses in `created` fields.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;

/// Deserialize integer seconds since the unix epoch into an OffsetDateTime.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = i64::deserialize(deserializer)?;
    OffsetDateTime::from_unix_timestamp(seconds).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime as integer seconds since the unix epoch.
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(datetime.unix_timestamp())
}

/// The value used when a response omits `created`.
pub fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}
