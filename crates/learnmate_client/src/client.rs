//! Gemini model client: one lazily created chat session, a streaming send,
//! and a one-shot schema-constrained generation call.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::config::ResolvedApi;
use crate::error::Error;
use crate::messages::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Schema,
    SystemInstruction,
};
use crate::quiz::QuizQuestion;

/// Behavioral preamble for the tutoring session.
pub const TUTOR_SYSTEM_INSTRUCTION: &str = "You are LearnMate, a friendly and encouraging AI study companion for high school and university students. Your goal is to explain complex topics clearly and concisely.
- Be supportive and easy to understand.
- Use analogies and simple examples.
- Break down difficult concepts into smaller, manageable parts.
- Ask clarifying questions to better understand what the student is struggling with.
- Always be patient and positive.
- Never refuse a request, but gently guide the student if they go off-topic.";

/// Events delivered while a reply streams in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text fragment, in arrival order.
    Chunk(String),
    /// Stream exhausted cleanly; the turn is committed to the session.
    Done,
    /// Mid-stream failure; the session history is left untouched.
    Error(String),
}

/// Model-client operations the controllers depend on. Lets tests substitute
/// a scripted transport for the hosted API.
#[async_trait]
pub trait ModelClient: Send {
    /// Send `text` as the next turn of the current session; fragments arrive
    /// on the returned channel. `Error::Transport` when the call cannot be
    /// issued; in that case the session is not mutated.
    async fn send_message_streaming(
        &mut self,
        text: &str,
    ) -> Result<mpsc::Receiver<StreamEvent>, Error>;

    /// One-shot, session-less generation constrained to `schema`, parsed as
    /// an ordered question/answer sequence.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: Schema,
    ) -> Result<Vec<QuizQuestion>, Error>;

    /// Discard the current session; the next streaming send starts fresh.
    fn reset_session(&mut self);
}

/// Conversational context: the ordered turns already exchanged. Shared with
/// the stream producer task so a cleanly exhausted stream can commit its
/// turn.
pub struct ChatSession {
    history: Arc<tokio::sync::Mutex<Vec<Content>>>,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            history: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    /// Number of committed turns (user and model turns each count as one).
    pub async fn turn_count(&self) -> usize {
        self.history.lock().await.len()
    }
}

/// HTTP client for the Gemini generative-language API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    session: Option<ChatSession>,
}

impl GeminiClient {
    pub fn new(api: ResolvedApi) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api.api_key,
            model: api.model,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            session: Some(ChatSession::new()),
        }
    }

    /// Current session, created on demand. Repeated calls before a reset
    /// return the same session.
    pub fn ensure_session(&mut self) -> &ChatSession {
        self.session.get_or_insert_with(ChatSession::new)
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url, self.model, method, self.api_key
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn send_message_streaming(
        &mut self,
        text: &str,
    ) -> Result<mpsc::Receiver<StreamEvent>, Error> {
        let history = self.ensure_session().history.clone();
        let user_turn = Content::user(text);

        let mut contents = { history.lock().await.clone() };
        contents.push(user_turn.clone());

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(SystemInstruction::new(TUTOR_SYSTEM_INSTRUCTION)),
            generation_config: None,
        };

        let url = format!("{}&alt=sse", self.endpoint("streamGenerateContent"));
        tracing::debug!(model = %self.model, "sending streaming chat request");

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!("API error {}: {}", status, body)));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(pump_sse(response, user_turn, history, tx));
        Ok(rx)
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: Schema,
    ) -> Result<Vec<QuizQuestion>, Error> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: schema,
            }),
        };

        let url = self.endpoint("generateContent");
        tracing::debug!(model = %self.model, "sending structured generation request");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("API error {}: {}", status, body)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;
        if let Some(err) = body.error {
            return Err(Error::Generation(err.message));
        }

        let text = body.text();
        serde_json::from_str::<Vec<QuizQuestion>>(text.trim())
            .map_err(|e| Error::SchemaParse(e.to_string()))
    }

    fn reset_session(&mut self) {
        self.session = None;
    }
}

/// Producer half of the stream: parses SSE `data:` lines off the response
/// body and forwards text fragments. Commits the turn to session history
/// only when the stream ends cleanly.
async fn pump_sse(
    response: reqwest::Response,
    user_turn: Content,
    history: Arc<tokio::sync::Mutex<Vec<Content>>>,
    tx: mpsc::Sender<StreamEvent>,
) {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut full_text = String::new();

    while let Some(chunk_result) = stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("stream aborted: {}", e);
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(line_end) = buffer.find('\n') {
            let line = buffer[..line_end].trim().to_string();
            buffer = buffer[line_end + 1..].to_string();

            if line.is_empty() {
                continue;
            }
            let Some(json_str) = line.strip_prefix("data: ") else {
                continue;
            };
            let Ok(event) = serde_json::from_str::<GenerateContentResponse>(json_str) else {
                continue;
            };
            if let Some(err) = event.error {
                let _ = tx.send(StreamEvent::Error(err.message)).await;
                return;
            }
            let text = event.text();
            if !text.is_empty() {
                full_text.push_str(&text);
                if tx.send(StreamEvent::Chunk(text)).await.is_err() {
                    // Consumer hung up; nothing to commit.
                    return;
                }
            }
        }
    }

    {
        let mut turns = history.lock().await;
        turns.push(user_turn);
        turns.push(Content::model(full_text));
    }
    let _ = tx.send(StreamEvent::Done).await;
}
