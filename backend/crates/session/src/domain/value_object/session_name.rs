//! Session Name
//!
//! The container name a user's session lives under. Derived from the user id
//! so repeated sign-ins reattach to the same container.

use std::fmt;

use super::user_id::UserId;

/// Upper bound on the readable prefix
const MAX_PREFIX_LEN: usize = 48;
/// Hex digits of the user-id digest appended for uniqueness
const DIGEST_HEX_LEN: usize = 8;
/// Upper bound accepted when parsing a client-supplied name
const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionName(String);

impl SessionName {
    /// Derive the session name for a user.
    ///
    /// `@` becomes `_at_`, `.` and any other character outside
    /// `[A-Za-z0-9_-]` become `_`; a digest suffix keeps names unique when
    /// escaping collides.
    pub fn derive(user_id: &UserId) -> Self {
        let mut prefix = String::with_capacity(user_id.as_str().len());
        for c in user_id.as_str().chars() {
            match c {
                '@' => prefix.push_str("_at_"),
                c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => prefix.push(c),
                _ => prefix.push('_'),
            }
        }
        prefix.truncate(MAX_PREFIX_LEN);

        let digest = platform::crypto::sha256(user_id.as_str().as_bytes());
        let mut name = prefix;
        name.push('_');
        for byte in &digest[..DIGEST_HEX_LEN / 2] {
            name.push_str(&format!("{:02x}", byte));
        }
        Self(name)
    }

    /// Accept a name read back from a client cookie
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_NAME_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registry path of the container (`/` + name)
    pub fn container_path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
