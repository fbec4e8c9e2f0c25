//! Types exchanged with the text-generation collaborator.
//!
//! The engine never performs the call itself. Submitting hands the host a
//! [`PendingGeneration`]; the host runs it however it likes and reports back
//! with [`crate::PromptEngine::resolve`], quoting the ticket so that answers
//! for sessions that have since ended can be recognised and dropped.

use serde::{Deserialize, Serialize};

use crate::capture::SessionId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt_text: String,
}

/// `{ ok: true, content }` or `{ ok: false, error }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResponse {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            ok: true,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            content: None,
            error: Some(error.into()),
        }
    }

    /// Generated text, or the message to show. A successful response without
    /// content counts as a failure.
    pub fn into_result(self) -> Result<String, String> {
        match (self.ok, self.content, self.error) {
            (true, Some(content), _) if !content.is_empty() => Ok(content),
            (true, _, _) => Err("No content returned.".to_string()),
            (false, _, Some(error)) if !error.is_empty() => Err(error),
            (false, _, _) => Err("Error".to_string()),
        }
    }
}

/// Identifies one submission of one session
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenerationTicket {
    pub session: SessionId,
    pub request: u64,
}

/// A submission waiting for the host to run it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingGeneration {
    pub ticket: GenerationTicket,
    pub request: GenerationRequest,
}

/// Produces replacement text for a prompt
pub trait Generator {
    /// Failures of any kind are reported as `ok: false` responses
    fn generate(&self, request: &GenerationRequest) -> GenerationResponse;
}

/// Read-only access to the stored API credential
pub trait CredentialSource {
    fn api_key(&self) -> Option<String>;
}
