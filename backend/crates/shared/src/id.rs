//! Common ID Types
//!
//! Type-safe wrappers for opaque string identifiers (users, nodes).
//! The value is never interpreted; only its shape is checked on entry.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Maximum accepted identifier length in bytes
pub const MAX_ID_LENGTH: usize = 256;

/// Error when constructing an identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier exceeds {MAX_ID_LENGTH} bytes")]
    TooLong,
    #[error("identifier contains control characters")]
    ControlCharacter,
}

/// Generic typed string ID wrapper
///
/// Usage:
/// ```
/// use kernel::id::Id;
/// struct Node;
/// type NodeId = Id<Node>;
/// let id = NodeId::new("i-0abc").unwrap();
/// assert_eq!(id.as_str(), "i-0abc");
/// ```
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Create from an opaque string, rejecting empty/oversized/control input
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        if value.len() > MAX_ID_LENGTH {
            return Err(IdError::TooLong);
        }
        if value.chars().any(char::is_control) {
            return Err(IdError::ControlCharacter);
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Borrow the underlying string
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Convert into the underlying string
    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T> TryFrom<&str> for Id<T> {
    type Error = IdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
