//! Tauri application library. The frontend drives the chat and quiz panels
//! through the commands below.

pub mod commands;

pub fn run() {
    tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            commands::get_config_path,
            commands::load_config,
            commands::save_config,
            commands::init,
            commands::get_messages,
            commands::send_message,
            commands::new_chat,
            commands::is_streaming,
            commands::generate_quiz,
            commands::quiz_state,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
