//! Quiz controller: single-shot structured generation from free-text notes.

use serde::{Deserialize, Serialize};

use crate::client::ModelClient;
use crate::messages::Schema;

/// One generated question/answer pair. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub answer: String,
}

/// Declared response shape: an array of `{question, answer}` objects.
pub fn quiz_schema() -> Schema {
    Schema::array_of(Schema::object(
        vec![
            ("question", Schema::string("The quiz question.")),
            ("answer", Schema::string("The answer to the question.")),
        ],
        vec!["question", "answer"],
    ))
}

/// Prompt instructing generation of exactly `count` question/answer pairs.
pub fn quiz_prompt(topic: &str, count: u32) -> String {
    format!(
        "Based on the following text, generate a quiz with exactly {} questions. \
         Each question should have a clear question and a concise answer.\n\n\
         Text:\n---\n{}\n---\n",
        count, topic
    )
}

/// Request/response cycle over {idle, loading, done|failed}. No state leaks
/// across calls: loading is always cleared, and a new call clears the prior
/// result and error.
pub struct QuizController<C: ModelClient> {
    client: C,
    loading: bool,
    result: Option<Vec<QuizQuestion>>,
    error: Option<String>,
}

impl<C: ModelClient> QuizController<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            loading: false,
            result: None,
            error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn result(&self) -> Option<&[QuizQuestion]> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Generate `count` questions from `topic`. An empty topic or a zero
    /// count yields a validation error without contacting the model.
    pub async fn generate(&mut self, topic: &str, count: u32) {
        if topic.trim().is_empty() {
            self.error = Some("Please enter a topic or paste your notes.".into());
            return;
        }
        if count == 0 {
            self.error = Some("Please request at least one question.".into());
            return;
        }

        self.loading = true;
        self.result = None;
        self.error = None;

        match self
            .client
            .generate_structured(&quiz_prompt(topic, count), quiz_schema())
            .await
        {
            Ok(questions) => self.result = Some(questions),
            Err(e) => {
                tracing::warn!("quiz generation failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
    }
}
