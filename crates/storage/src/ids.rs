use std::fmt;
use std::str::FromStr;

use rand::Rng;
use snafu::ensure;

use super::error::{InvalidSessionIdSnafu, StorageError, StorageResult};

/// Prefix every generated session identifier starts with.
pub const SESSION_ID_PREFIX: &str = "room_";
/// Number of random base36 characters following the prefix.
pub const SESSION_ID_RANDOM_LEN: usize = 9;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque client identifier; doubles as the server-side room name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Generates `room_` followed by nine random base36 characters.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let mut raw = String::with_capacity(SESSION_ID_PREFIX.len() + SESSION_ID_RANDOM_LEN);
        raw.push_str(SESSION_ID_PREFIX);
        for _ in 0..SESSION_ID_RANDOM_LEN {
            let index = rng.gen_range(0..BASE36_ALPHABET.len());
            raw.push(char::from(BASE36_ALPHABET[index]));
        }
        Self(raw)
    }

    /// Accepts any stored value that is not blank. Stored ids are opaque, so ids
    /// written by older clients without the `room_` prefix stay valid.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        ensure!(
            !raw.trim().is_empty(),
            InvalidSessionIdSnafu {
                stage: "parse-session-id",
                raw: raw.to_string(),
            }
        );
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = StorageError;

    fn from_str(raw: &str) -> StorageResult<Self> {
        Self::parse(raw)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_use_prefix_and_base36_suffix() {
        for _ in 0..64 {
            let id = SessionId::generate();
            let suffix = id
                .as_str()
                .strip_prefix(SESSION_ID_PREFIX)
                .expect("generated id should carry the room prefix");
            assert_eq!(suffix.len(), SESSION_ID_RANDOM_LEN);
            assert!(
                suffix
                    .chars()
                    .all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase())
            );
        }
    }

    #[test]
    fn parse_rejects_blank_values_only() {
        assert!(SessionId::parse("   ").is_err());
        assert!(SessionId::parse("").is_err());
        assert_eq!(
            SessionId::parse("legacy-id").map(String::from).ok(),
            Some("legacy-id".to_string())
        );
    }
}
