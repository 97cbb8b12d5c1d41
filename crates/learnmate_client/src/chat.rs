//! Chat session controller: owns the ordered message log, drives the model
//! client's stream into incremental updates, persists/restores the log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::client::{ModelClient, StreamEvent};
use crate::storage::Storage;

/// Fixed storage key for the serialized chat log.
pub const HISTORY_KEY: &str = "learnmate-chat-history";

/// Greeting shown before any user interaction.
pub const GREETING: &str = "Hello! I'm LearnMate. How can I help you study today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// One chat bubble. Append-only, except the newest assistant message grows
/// in place while its reply streams in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    fn seed() -> Self {
        Self {
            id: "initial".into(),
            sender: Sender::Ai,
            text: GREETING.into(),
        }
    }

    fn user(text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            text,
        }
    }

    fn assistant(text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Ai,
            text,
        }
    }
}

/// How a submission ended. Callers branching on failure should use this
/// rather than inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or a request was already in flight; nothing happened.
    Ignored,
    /// The reply streamed to completion.
    Completed,
    /// The call or the stream failed; a diagnostic bubble was appended.
    Failed,
}

/// Conversation state machine. At most one in-flight request; submissions
/// while one is outstanding are ignored rather than queued.
pub struct ChatController<C: ModelClient, S: Storage> {
    client: tokio::sync::Mutex<C>,
    storage: Mutex<S>,
    messages: Mutex<Vec<ChatMessage>>,
    busy: AtomicBool,
}

impl<C: ModelClient, S: Storage> ChatController<C, S> {
    /// Restores a previously persisted log, or starts from the seed message.
    /// A malformed or empty persisted entry is removed and ignored.
    pub fn new(client: C, mut storage: S) -> Self {
        let messages = match storage.get(HISTORY_KEY) {
            None => vec![ChatMessage::seed()],
            Some(raw) => match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
                Ok(saved) if !saved.is_empty() => saved,
                _ => {
                    tracing::warn!("discarding unreadable chat history");
                    storage.remove(HISTORY_KEY);
                    vec![ChatMessage::seed()]
                }
            },
        };
        Self {
            client: tokio::sync::Mutex::new(client),
            storage: Mutex::new(storage),
            messages: Mutex::new(messages),
            busy: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current message log.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Send one user message and stream the reply into the log.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        self.submit_with(text, |_| {}).await
    }

    /// Like [`submit`](Self::submit), reporting each fragment to `on_chunk`
    /// as it arrives. Blank input, or input while a request is in flight,
    /// is a no-op.
    pub async fn submit_with<F: FnMut(&str)>(&self, text: &str, mut on_chunk: F) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return SubmitOutcome::Ignored;
        }

        self.with_messages(|msgs| msgs.push(ChatMessage::user(text.to_string())));
        self.persist();

        let result = {
            let mut client = self.client.lock().await;
            client.send_message_streaming(text).await
        };

        let mut outcome = SubmitOutcome::Completed;
        match result {
            Ok(mut events) => {
                let mut streaming = false;
                while let Some(event) = events.recv().await {
                    match event {
                        StreamEvent::Chunk(chunk) => {
                            on_chunk(&chunk);
                            self.with_messages(|msgs| {
                                if streaming {
                                    if let Some(last) = msgs.last_mut() {
                                        last.text.push_str(&chunk);
                                    }
                                } else {
                                    msgs.push(ChatMessage::assistant(chunk.clone()));
                                }
                            });
                            streaming = true;
                            self.persist();
                        }
                        // Partial reply stays in the log; the failure gets
                        // its own bubble.
                        StreamEvent::Error(detail) => {
                            self.push_failure(&detail);
                            outcome = SubmitOutcome::Failed;
                            break;
                        }
                        StreamEvent::Done => break,
                    }
                }
            }
            Err(e) => {
                self.push_failure(&e.to_string());
                outcome = SubmitOutcome::Failed;
            }
        }
        self.busy.store(false, Ordering::SeqCst);
        outcome
    }

    /// Reset to the seed message, clear persisted history, and drop the
    /// model session. Ignored while a request is in flight.
    pub fn new_chat(&self) {
        if self.busy.load(Ordering::SeqCst) {
            return;
        }
        self.with_messages(|msgs| *msgs = vec![ChatMessage::seed()]);
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(HISTORY_KEY);
        // Never contended here: the busy flag keeps submissions out, and a
        // submit only holds the client lock while issuing its call.
        match self.client.try_lock() {
            Ok(mut client) => client.reset_session(),
            Err(_) => tracing::warn!("model session reset skipped: client is in use"),
        }
    }

    fn with_messages<R>(&self, f: impl FnOnce(&mut Vec<ChatMessage>) -> R) -> R {
        f(&mut self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push_failure(&self, detail: &str) {
        self.with_messages(|msgs| {
            msgs.push(ChatMessage::assistant(format!(
                "Sorry, something went wrong: {}",
                detail
            )))
        });
        self.persist();
    }

    /// Persist the log, but only once there is more than the seed message.
    fn persist(&self) {
        let serialized = {
            let msgs = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
            if msgs.len() <= 1 {
                return;
            }
            serde_json::to_string(&*msgs)
        };
        match serialized {
            Ok(json) => self
                .storage
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .set(HISTORY_KEY, &json),
            Err(e) => tracing::warn!("failed to serialize chat history: {}", e),
        }
    }
}
