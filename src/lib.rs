mod api;
mod browser;
mod commands;
mod models;
mod state;
mod store;

use api::ApiClient;
use commands::browser::Browser;
use commands::settings::SettingsState;
use commands::Backend;
use state::chat::ChatManager;
use state::files::FileProcessingManager;
use state::knowledge::KnowledgeBaseManager;
use state::DEFAULT_BATCH_LIMIT;
use std::sync::Arc;
use store::LocalStore;
use tauri::Manager;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_URL: &str = "http://localhost:5000";

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let app_dir = app.path().app_data_dir()?;
            let store =
                Arc::new(LocalStore::new(&app_dir).expect("Failed to initialize local store"));
            let base_url = std::env::var("RAGDESK_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
            let api = Arc::new(ApiClient::new(base_url));

            app.manage(KnowledgeBaseManager::new(api.clone()));
            app.manage(FileProcessingManager::new(
                api.clone(),
                store.clone(),
                DEFAULT_BATCH_LIMIT,
            ));
            app.manage(ChatManager::new(api.clone(), store));
            app.manage(Backend(api));
            app.manage(SettingsState::default());
            app.manage(Browser::default());

            // Initial sync with the backend, mirroring the web front-end's
            // mount-time fetches.
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                handle.state::<KnowledgeBaseManager>().refresh().await;
                handle
                    .state::<FileProcessingManager>()
                    .sync_with_backend()
                    .await;
            });
            Ok(())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::Destroyed = event {
                // Drop responses from requests still in flight once nothing
                // is left to render them.
                let app = window.app_handle();
                app.state::<KnowledgeBaseManager>().shutdown();
                app.state::<FileProcessingManager>().shutdown();
                app.state::<ChatManager>().shutdown();
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::chat::create_chat_session,
            commands::chat::list_chat_sessions,
            commands::chat::current_chat_session,
            commands::chat::chat_messages,
            commands::chat::load_chat_session,
            commands::chat::delete_chat_session,
            commands::chat::send_chat_message,
            commands::knowledge::knowledge_bases,
            commands::knowledge::current_knowledge_base,
            commands::knowledge::set_current_knowledge_base,
            commands::knowledge::refresh_knowledge_bases,
            commands::knowledge::create_knowledge_base,
            commands::knowledge::delete_knowledge_base,
            commands::knowledge::reset_knowledge_base,
            commands::knowledge::knowledge_base_files,
            commands::files::translated_files,
            commands::files::sync_translations,
            commands::files::delete_translated_file,
            commands::files::upload_documents,
            commands::files::batch_embed_files,
            commands::files::list_directory,
            commands::files::list_directory_recursive,
            commands::files::file_content,
            commands::files::translated_file_content,
            commands::files::create_remote_folder,
            commands::files::upload_to_folder,
            commands::files::delete_remote_file,
            commands::files::delete_remote_folder,
            commands::files::download_file,
            commands::files::batch_delete_files,
            commands::files::batch_download_files,
            commands::settings::get_model_settings,
            commands::settings::update_model_settings,
            commands::browser::select_file,
            commands::browser::selected_files,
            commands::browser::clear_selection,
            commands::browser::update_rubber_band,
            commands::browser::open_context_menu,
            commands::browser::close_context_menu,
            commands::browser::context_menu,
            commands::browser::show_notification,
            commands::browser::current_notification,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
