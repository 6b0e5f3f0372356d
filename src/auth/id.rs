//! Strongly typed identifiers scoped to refresh coordination.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = ValidationError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = ValidationError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
const DEFAULT_LOCK_NAMESPACE: &str = "lock";

/// Error returned when caller-supplied identifiers or secrets fail validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ValidationError {
	/// The value was empty or whitespace.
	#[error("{kind} cannot be empty.")]
	Empty {
		/// Kind of value (tenant, namespace, refresh token, ...).
		kind: &'static str,
	},
	/// The value contains whitespace characters.
	#[error("{kind} contains whitespace.")]
	ContainsWhitespace {
		/// Kind of value (tenant, namespace, refresh token, ...).
		kind: &'static str,
	},
	/// The value exceeded the allowed character count.
	#[error("{kind} exceeds {max} characters.")]
	TooLong {
		/// Kind of value (tenant, namespace, refresh token, ...).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The value contains the lock key separator.
	#[error("{kind} must not contain `:`.")]
	ContainsSeparator {
		/// Kind of value.
		kind: &'static str,
	},
	/// The value contains a character outside `[A-Za-z0-9._-]`.
	#[error("{kind} contains `{character}`; only ASCII alphanumerics, `.`, `_`, and `-` are allowed.")]
	InvalidCharacter {
		/// Kind of value.
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The value is a relative path segment.
	#[error("{kind} must not be `.` or `..`.")]
	DotSegment {
		/// Kind of value.
		kind: &'static str,
	},
}

def_id! { TenantId, "Identifier of a tenant whose OAuth credentials are managed independently.", "Tenant" }
def_id! { ProviderId, "Identifier of the authorization server a descriptor points at.", "Provider" }
def_id! { LockNamespace, "Prefix shared by every lock key written by one deployment.", "LockNamespace" }

impl Default for LockNamespace {
	fn default() -> Self {
		Self(DEFAULT_LOCK_NAMESPACE.to_owned())
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), ValidationError> {
	if view.is_empty() {
		return Err(ValidationError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(ValidationError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(ValidationError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	// Namespaces are joined with tenants by `:`; a separator inside either side would let two
	// distinct pairs collide on the same lock key.
	if view.contains(':') {
		return Err(ValidationError::ContainsSeparator { kind });
	}
	// Tenants are substituted into token endpoint URLs; anything outside this set could move the
	// request to another host or path.
	if let Some(character) = view.chars().find(|c| !is_identifier_char(*c)) {
		return Err(ValidationError::InvalidCharacter { kind, character });
	}
	if view == "." || view == ".." {
		return Err(ValidationError::DotSegment { kind });
	}

	Ok(())
}

fn is_identifier_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}
