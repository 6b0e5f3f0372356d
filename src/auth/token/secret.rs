//! Secret wrapper that keeps token material out of logs.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::ValidationError};

/// Redacted secret wrapper for access tokens, refresh tokens, and client secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	const FINGERPRINT_BYTES: usize = 6;

	/// Wraps a new secret string without validation.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Wraps a secret that must carry at least one non-whitespace character.
	pub fn non_empty(kind: &'static str, value: impl Into<String>) -> Result<Self, ValidationError> {
		let secret = Self::new(value);

		if secret.is_blank() {
			return Err(ValidationError::Empty { kind });
		}

		Ok(secret)
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret is empty or whitespace-only.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}

	/// Short, non-reversible digest that lets logs correlate secrets without exposing them.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(&digest[..Self::FINGERPRINT_BYTES])
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn non_empty_rejects_blank_values() {
		assert_eq!(
			TokenSecret::non_empty("Refresh token", "  "),
			Err(ValidationError::Empty { kind: "Refresh token" })
		);
		assert!(TokenSecret::non_empty("Refresh token", "rt-1").is_ok());
	}

	#[test]
	fn fingerprint_is_stable_and_does_not_leak() {
		let a = TokenSecret::new("refresh-old");
		let b = TokenSecret::new("refresh-new");

		assert_eq!(a.fingerprint(), TokenSecret::new("refresh-old").fingerprint());
		assert_ne!(a.fingerprint(), b.fingerprint());
		assert_eq!(a.fingerprint().len(), 8);
		assert!(!a.fingerprint().contains("refresh"));
	}
}
