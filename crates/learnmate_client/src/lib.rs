//! Shared LearnMate client library (Gemini model client, chat and quiz
//! controllers, config, local persistence). Used by the Tauri GUI and the
//! CLI.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod quiz;
pub mod storage;

pub use chat::{ChatController, ChatMessage, Sender, SubmitOutcome, GREETING, HISTORY_KEY};
pub use client::{ChatSession, GeminiClient, ModelClient, StreamEvent, TUTOR_SYSTEM_INSTRUCTION};
pub use config::{default_config_path, ApiSection, Config, ResolvedApi, StorageSection};
pub use error::Error;
pub use quiz::{QuizController, QuizQuestion};
pub use storage::{FileStorage, MemoryStorage, Storage};
