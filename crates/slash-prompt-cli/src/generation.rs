//! OpenAI-compatible chat-completions client, run off the UI thread.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use slash_prompt_config::{Config, GenerationSettings};
use slash_prompt_engine::{
    CredentialSource, GenerationRequest, GenerationResponse, GenerationTicket, Generator,
    PendingGeneration,
};

/// Characters of an error body worth showing
const ERROR_BODY_LIMIT: usize = 300;

/// Reads the API key out of the loaded config file
pub struct ConfigCredentials {
    config: Config,
}

impl ConfigCredentials {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl CredentialSource for ConfigCredentials {
    fn api_key(&self) -> Option<String> {
        self.config.resolved_api_key()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct OpenAiGenerator<S> {
    client: Client,
    settings: GenerationSettings,
    credentials: S,
}

impl<S: CredentialSource> OpenAiGenerator<S> {
    pub fn new(settings: GenerationSettings, credentials: S) -> Self {
        Self {
            client: Client::new(),
            settings,
            credentials,
        }
    }

    fn complete(&self, prompt: &str) -> Result<String, String> {
        if prompt.trim().is_empty() {
            return Err("Empty prompt.".to_string());
        }
        let api_key = self.credentials.api_key().ok_or_else(|| {
            format!(
                "API key not set. Run `slash-prompt set-key <KEY>` or edit {}.",
                Config::config_path().display()
            )
        })?;

        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.settings.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        log::debug!("POST {} model={}", self.settings.endpoint, self.settings.model);
        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(api_error(status.as_u16(), &text));
        }

        let text = response.text().map_err(|e| e.to_string())?;
        extract_content(&text)
    }
}

impl<S: CredentialSource> Generator for OpenAiGenerator<S> {
    fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
        match self.complete(&request.prompt_text) {
            Ok(content) => GenerationResponse::success(content),
            Err(error) => GenerationResponse::failure(error),
        }
    }
}

fn api_error(status: u16, body: &str) -> String {
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    format!("API error {status}: {body}")
}

/// First choice's message, trimmed
fn extract_content(body: &str) -> Result<String, String> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| "No content returned.".to_string())
}

/// A finished generation on its way back to the UI thread
#[derive(Debug)]
pub struct Completed {
    pub ticket: GenerationTicket,
    pub response: GenerationResponse,
}

/// Run `pending` on a background thread and send the result to `tx`
pub fn spawn_generation<G>(generator: Arc<G>, pending: PendingGeneration, tx: Sender<Completed>)
where
    G: Generator + Send + Sync + 'static,
{
    thread::spawn(move || {
        let response = generator.generate(&pending.request);
        let completed = Completed {
            ticket: pending.ticket,
            response,
        };
        if tx.send(completed).is_err() {
            log::debug!("UI gone before generation finished");
        }
    });
}
