//! Tauri commands for the chat panel, quiz panel, and config form.
//! The Tauri `#[command]` wrappers delegate to testable plain functions.

use learnmate_client::{
    config::{self, ApiSection, Config, StorageSection},
    ChatController, ChatMessage, FileStorage, GeminiClient, QuizController, QuizQuestion,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tauri::Emitter;

// ── Global runtime and controller state (one chat, one quiz) ────────────
use std::sync::OnceLock;

fn global_runtime() -> &'static tokio::runtime::Runtime {
    static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to create tokio runtime")
    })
}

static CHAT: Mutex<Option<ChatController<GeminiClient, FileStorage>>> = Mutex::new(None);
static QUIZ: Mutex<Option<QuizController<GeminiClient>>> = Mutex::new(None);

/// JSON-friendly config form values sent to/from the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigForm {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub storage_dir: String,
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: config::DEFAULT_MODEL.into(),
            base_url: config::DEFAULT_BASE_URL.into(),
            storage_dir: String::new(),
        }
    }
}

impl From<Config> for ConfigForm {
    fn from(c: Config) -> Self {
        Self {
            api_key: c.api.api_key.unwrap_or_default(),
            model: c.api.model.unwrap_or_else(|| config::DEFAULT_MODEL.into()),
            base_url: c
                .api
                .base_url
                .unwrap_or_else(|| config::DEFAULT_BASE_URL.into()),
            storage_dir: c.storage.dir.unwrap_or_default(),
        }
    }
}

impl From<ConfigForm> for Config {
    fn from(f: ConfigForm) -> Self {
        Config {
            api: ApiSection {
                api_key: Some(f.api_key),
                model: Some(f.model),
                base_url: Some(f.base_url),
            },
            storage: StorageSection {
                dir: if f.storage_dir.is_empty() {
                    None
                } else {
                    Some(f.storage_dir)
                },
            },
        }
    }
}

/// Resolve config path from optional override, env, or default.
pub fn resolve_config_path(override_path: Option<&str>) -> Result<PathBuf, String> {
    if let Some(p) = override_path {
        return Ok(PathBuf::from(p));
    }
    if let Ok(val) = std::env::var("LEARNMATE_CONFIG") {
        return Ok(PathBuf::from(val));
    }
    config::default_config_path().ok_or_else(|| "Cannot determine config path".into())
}

// ── Testable backend functions ──────────────────────────────────────────

/// Load config from `path` and return form values.
pub fn do_load_config(path: &str) -> Result<ConfigForm, String> {
    let cfg = config::load(std::path::Path::new(path)).map_err(|e| e.to_string())?;
    Ok(ConfigForm::from(cfg))
}

/// Save form values to `path` as YAML. Creates parent dirs if needed.
pub fn do_save_config(path: &str, form: &ConfigForm) -> Result<(), String> {
    let cfg: Config = form.clone().into();
    config::save(std::path::Path::new(path), &cfg).map_err(|e| e.to_string())
}

/// Build the chat and quiz controllers from the config at `override_path`
/// (or env/default). Fails when no API key can be resolved.
pub fn do_init(override_path: Option<&str>) -> Result<(), String> {
    let path = resolve_config_path(override_path)?;
    let cfg = if path.exists() {
        config::load(&path).map_err(|e| e.to_string())?
    } else {
        Config::default()
    };

    let api = cfg.resolve_api().map_err(|e| e.to_string())?;
    let storage_dir = cfg
        .storage_dir()
        .ok_or_else(|| "Cannot determine storage directory".to_string())?;

    // The quiz path uses its own client so quiz prompts never touch the
    // tutoring session.
    let chat = ChatController::new(GeminiClient::new(api.clone()), FileStorage::new(storage_dir));
    let quiz = QuizController::new(GeminiClient::new(api));

    *CHAT.lock().map_err(|e| e.to_string())? = Some(chat);
    *QUIZ.lock().map_err(|e| e.to_string())? = Some(quiz);
    Ok(())
}

/// Drop both controllers. Safe to call when not initialized.
pub fn do_shutdown() {
    if let Ok(mut guard) = CHAT.lock() {
        *guard = None;
    }
    if let Ok(mut guard) = QUIZ.lock() {
        *guard = None;
    }
}

pub fn is_initialized() -> bool {
    CHAT.lock().map(|g| g.is_some()).unwrap_or(false)
}

/// Current message log.
pub fn do_get_messages() -> Result<Vec<ChatMessage>, String> {
    let guard = CHAT.lock().map_err(|e| e.to_string())?;
    let chat = guard.as_ref().ok_or("Not initialized")?;
    Ok(chat.messages())
}

/// Submit one user message; `on_chunk` is called for each streamed fragment.
/// Returns the updated message log.
pub fn do_send_message(
    text: &str,
    on_chunk: impl FnMut(&str),
) -> Result<Vec<ChatMessage>, String> {
    let guard = CHAT.lock().map_err(|e| e.to_string())?;
    let chat = guard.as_ref().ok_or("Not initialized")?;

    let rt = global_runtime();
    rt.block_on(chat.submit_with(text, on_chunk));
    Ok(chat.messages())
}

/// Reset the conversation to the seed message. Returns the new log.
pub fn do_new_chat() -> Result<Vec<ChatMessage>, String> {
    let guard = CHAT.lock().map_err(|e| e.to_string())?;
    let chat = guard.as_ref().ok_or("Not initialized")?;
    chat.new_chat();
    Ok(chat.messages())
}

pub fn do_is_streaming() -> bool {
    CHAT.lock()
        .ok()
        .and_then(|g| g.as_ref().map(|c| c.is_busy()))
        .unwrap_or(false)
}

/// Quiz panel state returned to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizState {
    pub loading: bool,
    pub questions: Option<Vec<QuizQuestion>>,
    pub error: Option<String>,
}

fn quiz_state_of(quiz: &QuizController<GeminiClient>) -> QuizState {
    QuizState {
        loading: quiz.is_loading(),
        questions: quiz.result().map(|qs| qs.to_vec()),
        error: quiz.error().map(|e| e.to_string()),
    }
}

/// Generate a quiz from `topic`. Returns the resulting panel state
/// (questions on success, a user-facing error otherwise).
pub fn do_generate_quiz(topic: &str, count: u32) -> Result<QuizState, String> {
    let mut guard = QUIZ.lock().map_err(|e| e.to_string())?;
    let quiz = guard.as_mut().ok_or("Not initialized")?;

    let rt = global_runtime();
    rt.block_on(quiz.generate(topic, count));
    Ok(quiz_state_of(quiz))
}

pub fn do_quiz_state() -> Result<QuizState, String> {
    let guard = QUIZ.lock().map_err(|e| e.to_string())?;
    let quiz = guard.as_ref().ok_or("Not initialized")?;
    Ok(quiz_state_of(quiz))
}

// ── Tauri command wrappers ──────────────────────────────────────────────

#[tauri::command]
pub fn get_config_path() -> Result<String, String> {
    let p = resolve_config_path(None)?;
    p.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| "Config path is not valid UTF-8".into())
}

#[tauri::command]
pub fn load_config(path: String) -> Result<ConfigForm, String> {
    do_load_config(&path)
}

#[tauri::command]
pub fn save_config(path: String, form: ConfigForm) -> Result<(), String> {
    do_save_config(&path, &form)
}

#[tauri::command]
pub fn init(config_path: Option<String>) -> Result<(), String> {
    do_init(config_path.as_deref())
}

#[tauri::command]
pub fn get_messages() -> Result<Vec<ChatMessage>, String> {
    do_get_messages()
}

#[tauri::command]
pub fn send_message(app: tauri::AppHandle, text: String) -> Result<Vec<ChatMessage>, String> {
    do_send_message(&text, |chunk| {
        let _ = app.emit("chat-stream-chunk", serde_json::json!({ "chunk": chunk }));
    })
}

#[tauri::command]
pub fn new_chat() -> Result<Vec<ChatMessage>, String> {
    do_new_chat()
}

#[tauri::command]
pub fn is_streaming() -> bool {
    do_is_streaming()
}

#[tauri::command]
pub fn generate_quiz(topic: String, count: u32) -> Result<QuizState, String> {
    do_generate_quiz(&topic, count)
}

#[tauri::command]
pub fn quiz_state() -> Result<QuizState, String> {
    do_quiz_state()
}
