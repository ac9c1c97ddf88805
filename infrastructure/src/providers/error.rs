//! Provider adapter errors

use council_application::GatewayError;
use council_domain::ProviderId;
use council_domain::core::string::clip;
use thiserror::Error;

/// Longest HTTP error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(ProviderId),

    #[error("{0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Transport("request timed out".to_string())
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

impl From<ProviderError> for GatewayError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured(provider) => GatewayError::NotConfigured(provider),
            ProviderError::Transport(message) => GatewayError::RequestFailed(message),
            ProviderError::Http { status, body } => GatewayError::Http { status, body },
            ProviderError::InvalidResponse(message) => GatewayError::InvalidResponse(message),
        }
    }
}

/// Pass 2xx responses through; turn anything else into `ProviderError::Http`
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        body: clip(body.trim(), MAX_ERROR_BODY),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_conversion_keeps_message() {
        let gateway: GatewayError = ProviderError::Http {
            status: 429,
            body: "rate limited".to_string(),
        }
        .into();
        assert_eq!(gateway.to_string(), "HTTP 429: rate limited");

        let gateway: GatewayError = ProviderError::NotConfigured(ProviderId::Groq).into();
        assert_eq!(gateway, GatewayError::NotConfigured(ProviderId::Groq));
    }
}
