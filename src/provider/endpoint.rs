//! Token endpoint templates resolved per tenant.

// crates.io
use url::Host;
// self
use crate::{_prelude::*, auth::TenantId, error::ConfigError};

/// Token endpoint URL, optionally containing a `{tenant}` placeholder.
///
/// Per-tenant authorization servers (`https://{tenant}.example.com/oauth/token`) resolve to a
/// different host for every tenant. The template is validated on construction against a sample
/// tenant; HTTPS is required except for loopback hosts.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenEndpoint(String);
impl TokenEndpoint {
	/// Placeholder replaced by the tenant id.
	pub const TENANT_PLACEHOLDER: &'static str = "{tenant}";

	const SAMPLE_TENANT: &'static str = "tenant";

	/// Validates and wraps a template.
	pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
		let template = template.into();
		let sample = template.replace(Self::TENANT_PLACEHOLDER, Self::SAMPLE_TENANT);

		validate(&template, &sample)?;

		Ok(Self(template))
	}

	/// Returns `true` when the endpoint varies by tenant.
	pub fn is_templated(&self) -> bool {
		self.0.contains(Self::TENANT_PLACEHOLDER)
	}

	/// Resolves the endpoint for `tenant`.
	///
	/// [`TenantId`] only admits `[A-Za-z0-9._-]`, so substitution cannot introduce a new host,
	/// userinfo, query, or fragment.
	pub fn resolve(&self, tenant: &TenantId) -> Result<Url, ConfigError> {
		let resolved = self.0.replace(Self::TENANT_PLACEHOLDER, tenant);

		validate(&resolved, &resolved)
	}

	/// Returns the raw template.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for TokenEndpoint {
	type Error = ConfigError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<TokenEndpoint> for String {
	fn from(value: TokenEndpoint) -> Self {
		value.0
	}
}
impl Debug for TokenEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenEndpoint({})", self.0)
	}
}
impl Display for TokenEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn validate(endpoint: &str, candidate: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(candidate)
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source })?;

	match url.scheme() {
		"https" => Ok(url),
		"http" if is_loopback(&url) => Ok(url),
		_ => Err(ConfigError::InsecureEndpoint { endpoint: endpoint.to_owned() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
