//! Backend selection modes

use secrecy::{ExposeSecret, SecretString};

/// Which generation/embedding backend a request runs against
///
/// The three modes are mutually exclusive by construction.
#[derive(Debug, Clone, Default)]
pub enum BackendChoice {
    /// Alternate provider (Gemini) with the service's own credential
    Gemini,
    /// Primary provider (OpenAI) with a credential the caller owns
    CallerKey(SecretString),
    /// Primary provider (OpenAI) with the service's default credential
    #[default]
    ServiceDefault,
}

impl BackendChoice {
    /// Map the legacy `(api key?, use gemini?)` request pair onto a mode
    ///
    /// Gemini wins over a supplied key; blank keys count as absent.
    pub fn from_flags(caller_key: Option<&str>, use_gemini: bool) -> Self {
        if use_gemini {
            return Self::Gemini;
        }
        match caller_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::CallerKey(SecretString::from(key.to_string())),
            None => Self::ServiceDefault,
        }
    }

    /// The caller pays for usage, so per-plan quotas do not apply
    pub fn has_caller_credential(&self) -> bool {
        match self {
            Self::CallerKey(key) => !key.expose_secret().trim().is_empty(),
            _ => false,
        }
    }

    /// Short label for logs (never includes the credential)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::CallerKey(_) => "caller-key",
            Self::ServiceDefault => "service-default",
        }
    }
}

/// Whose credential a resolved backend is using
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The alternate provider's fixed service credential
    GeminiService,
    /// Credential supplied with the request
    Caller,
    /// The primary provider's service default credential
    ServiceDefault,
}
