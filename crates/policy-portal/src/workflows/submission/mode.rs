use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

const JSON_MEDIA_TYPE: &str = "application/json";
const BEARER_PREFIX: &str = "Bearer ";

/// Longest credential prefix ever retained outside the transport.
pub const CREDENTIAL_PREFIX_LEN: usize = 20;
const TRUNCATION_MARKER: &str = "...";

/// Tag identifying which backend access pattern a mode uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    DirectIntegrator,
    GatewayFronted,
}

impl ModeKind {
    pub fn label(self) -> &'static str {
        match self {
            ModeKind::DirectIntegrator => "Direct Integrator",
            ModeKind::GatewayFronted => "API Gateway",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModeKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" | "integrator" | "direct_integrator" | "direct-integrator" => {
                Ok(Self::DirectIntegrator)
            }
            "gateway" | "api_manager" | "api-manager" | "gateway_fronted" | "gateway-fronted" => {
                Ok(Self::GatewayFronted)
            }
            other => Err(format!(
                "unknown integration mode '{other}' (expected direct or gateway)"
            )),
        }
    }
}

/// Bearer credential for the gateway. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank values so an empty env var means "no credential".
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Truncated form safe for logs and the traffic panel.
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }

    fn bearer(&self) -> String {
        format!("{BEARER_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Keeps at most `CREDENTIAL_PREFIX_LEN` characters and never more than half the secret.
pub fn mask_secret(secret: &str) -> String {
    let total = secret.chars().count();
    let keep = CREDENTIAL_PREFIX_LEN.min(total / 2);
    let prefix: String = secret.chars().take(keep).collect();
    format!("{prefix}{TRUNCATION_MARKER}")
}

/// Masks the credential part of an `Authorization` header value.
pub fn mask_authorization(value: &str) -> String {
    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) => format!("{BEARER_PREFIX}{}", mask_secret(token)),
        None => mask_secret(value),
    }
}

/// Backend access mode together with its endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationMode {
    DirectIntegrator {
        base_url: String,
    },
    GatewayFronted {
        base_url: String,
        credential: Option<Credential>,
    },
}

impl IntegrationMode {
    pub fn direct(base_url: impl Into<String>) -> Self {
        Self::DirectIntegrator {
            base_url: base_url.into(),
        }
    }

    pub fn gateway(base_url: impl Into<String>, credential: Option<Credential>) -> Self {
        Self::GatewayFronted {
            base_url: base_url.into(),
            credential,
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            IntegrationMode::DirectIntegrator { .. } => ModeKind::DirectIntegrator,
            IntegrationMode::GatewayFronted { .. } => ModeKind::GatewayFronted,
        }
    }

    pub fn base_url(&self) -> &str {
        match self {
            IntegrationMode::DirectIntegrator { base_url }
            | IntegrationMode::GatewayFronted { base_url, .. } => base_url,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            IntegrationMode::DirectIntegrator { .. } => None,
            IntegrationMode::GatewayFronted { credential, .. } => credential.as_ref(),
        }
    }

    /// Header set sent with every submission in this mode.
    pub fn headers(&self) -> SubmissionHeaders {
        let mut headers = SubmissionHeaders::default();
        headers.insert(HEADER_CONTENT_TYPE, JSON_MEDIA_TYPE);
        headers.insert(HEADER_ACCEPT, JSON_MEDIA_TYPE);

        match self {
            IntegrationMode::DirectIntegrator { .. } => {}
            IntegrationMode::GatewayFronted { credential, .. } => {
                if let Some(credential) = credential {
                    headers.insert(HEADER_AUTHORIZATION, credential.bearer());
                }
            }
        }

        headers
    }
}

/// Outbound header map. `Debug` and `redacted` hide the authorization credential.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SubmissionHeaders(BTreeMap<String, String>);

impl SubmissionHeaders {
    fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(key, value)| {
                let value = if key.eq_ignore_ascii_case(HEADER_AUTHORIZATION) {
                    mask_authorization(value)
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect()
    }
}

impl fmt::Debug for SubmissionHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.redacted()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "eyJ4NXQiOiJNell4TW1Ga09HWXdNV0kwWldObU5EY3hOR1l3WW1NNFpUQTNNV0kyTkRBelpH";

    #[test]
    fn direct_mode_never_sends_authorization() {
        let headers = IntegrationMode::direct("http://localhost:9090/policy").headers();
        assert_eq!(headers.get(HEADER_CONTENT_TYPE), Some("application/json"));
        assert_eq!(headers.get("accept"), Some("application/json"));
        assert!(!headers.contains(HEADER_AUTHORIZATION));
    }

    #[test]
    fn gateway_mode_adds_bearer_only_with_credential() {
        let with_token =
            IntegrationMode::gateway("https://gw/policy", Credential::new(TOKEN)).headers();
        assert_eq!(
            with_token.get(HEADER_AUTHORIZATION),
            Some(format!("Bearer {TOKEN}").as_str())
        );

        let without_token = IntegrationMode::gateway("https://gw/policy", None).headers();
        assert!(!without_token.contains(HEADER_AUTHORIZATION));
    }

    #[test]
    fn blank_credentials_are_treated_as_absent() {
        assert!(Credential::new("   ").is_none());
        let mode = IntegrationMode::gateway("https://gw/policy", Credential::new(""));
        assert!(mode.credential().is_none());
    }

    #[test]
    fn masking_keeps_a_bounded_prefix() {
        let masked = mask_secret(TOKEN);
        assert_eq!(masked, format!("{}...", &TOKEN[..CREDENTIAL_PREFIX_LEN]));

        let short = mask_secret("abcd1234");
        assert_eq!(short, "abcd...");
        assert_ne!(short.trim_end_matches('.'), "abcd1234");
    }

    #[test]
    fn debug_output_hides_credentials() {
        let mode = IntegrationMode::gateway("https://gw/policy", Credential::new(TOKEN));
        let rendered = format!("{:?} {:?}", mode, mode.headers());
        assert!(!rendered.contains(TOKEN));
        assert!(rendered.contains("..."));
    }

    #[test]
    fn mode_kind_parses_legacy_names() {
        assert_eq!("INTEGRATOR".parse::<ModeKind>(), Ok(ModeKind::DirectIntegrator));
        assert_eq!("API_MANAGER".parse::<ModeKind>(), Ok(ModeKind::GatewayFronted));
        assert_eq!("gateway".parse::<ModeKind>(), Ok(ModeKind::GatewayFronted));
        assert!("carrier-pigeon".parse::<ModeKind>().is_err());
    }
}
