//! learnmate: CLI for the LearnMate study assistant.
//! Chat mode streams tutor replies for each stdin line (or a single
//! positional question); `--quiz N` reads notes from stdin to EOF and prints
//! generated question/answer pairs.

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process;

use learnmate_client::{
    config, ChatController, FileStorage, GeminiClient, QuizController, SubmitOutcome,
};

struct CliArgs {
    config_path: Option<PathBuf>,
    quiz_count: Option<u32>,
    question: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut parsed = CliArgs {
        config_path: None,
        quiz_count: None,
        question: None,
    };
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => parsed.config_path = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("Error: --config requires a path");
                        process::exit(2);
                    }
                }
            }
            "--quiz" => {
                i += 1;
                let count = args.get(i).and_then(|v| v.parse::<u32>().ok());
                match count {
                    Some(n) if n > 0 => parsed.quiz_count = Some(n),
                    _ => {
                        eprintln!("Error: --quiz requires a positive question count");
                        process::exit(2);
                    }
                }
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if !positional.is_empty() {
        parsed.question = Some(positional.join(" "));
    }
    parsed
}

fn resolve_config_path(args: &CliArgs) -> Option<PathBuf> {
    // 1. --config <path> flag
    if let Some(path) = &args.config_path {
        return Some(path.clone());
    }
    // 2. LEARNMATE_CONFIG env var
    if let Ok(val) = std::env::var("LEARNMATE_CONFIG") {
        return Some(PathBuf::from(val));
    }
    // 3. Default path (~/.learnmate/config.yaml)
    config::default_config_path()
}

fn load_config(args: &CliArgs) -> config::Config {
    let Some(path) = resolve_config_path(args) else {
        // No home directory; the GEMINI_API_KEY env var can still carry us.
        return config::Config::default();
    };
    if !path.exists() {
        return config::Config::default();
    }
    match config::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: failed to load config from {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = parse_args();
    let cfg = load_config(&args);

    let api = match cfg.resolve_api() {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let storage_dir = cfg
        .storage_dir()
        .unwrap_or_else(|| PathBuf::from(".learnmate"));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    if let Some(count) = args.quiz_count {
        rt.block_on(run_quiz(GeminiClient::new(api), count));
    } else {
        let client = GeminiClient::new(api);
        let storage = FileStorage::new(storage_dir);
        rt.block_on(run_chat(client, storage, args.question));
    }
}

/// Quiz mode: notes come from stdin until EOF.
async fn run_quiz(client: GeminiClient, count: u32) {
    let mut notes = String::new();
    if io::stdin().lock().read_to_string(&mut notes).is_err() || notes.trim().is_empty() {
        eprintln!("Error: no notes provided on stdin");
        process::exit(1);
    }

    let mut quiz = QuizController::new(client);
    quiz.generate(&notes, count).await;

    if let Some(error) = quiz.error() {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
    let questions = quiz.result().unwrap_or(&[]);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, q) in questions.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, q.question);
        let _ = writeln!(out, "   {}", q.answer);
    }
}

/// Chat mode: one positional question, or a REPL over stdin lines.
async fn run_chat(client: GeminiClient, storage: FileStorage, question: Option<String>) {
    let chat = ChatController::new(client, storage);

    if let Some(question) = question {
        stream_turn(&chat, &question).await;
        return;
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let text = line.trim().to_string();
        if text.is_empty() {
            continue;
        }
        if text == "/new" {
            chat.new_chat();
            continue;
        }
        stream_turn(&chat, &text).await;
    }
}

async fn stream_turn<S: learnmate_client::Storage>(
    chat: &ChatController<GeminiClient, S>,
    text: &str,
) {
    let outcome = {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let outcome = chat
            .submit_with(text, |chunk| {
                let _ = write!(out, "{}", chunk);
                let _ = out.flush();
            })
            .await;
        let _ = writeln!(out);
        outcome
    };

    // A failed turn appends a diagnostic bubble; surface it and exit
    // non-zero so scripts can tell.
    if outcome == SubmitOutcome::Failed {
        let messages = chat.messages();
        if let Some(last) = messages.last() {
            eprintln!("Error: {}", last.text);
        }
        process::exit(1);
    }
}
