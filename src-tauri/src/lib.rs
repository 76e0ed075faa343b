mod commands;
pub mod config;
pub mod messages;
pub mod mode;
pub mod navigation;
pub mod origin;
pub mod probe;
pub mod session;
mod shell;
pub mod window_state;

use config::ConfigStore;
use parking_lot::Mutex;
use session::ShellSession;
use std::sync::Arc;
use tauri::{Manager, RunEvent};
use tauri_plugin_log::{Target, TargetKind};

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            app.handle().plugin(
                tauri_plugin_log::Builder::default()
                    .targets([
                        Target::new(TargetKind::Stdout),
                        Target::new(TargetKind::LogDir { file_name: None }),
                        Target::new(TargetKind::Webview),
                    ])
                    .level(log::LevelFilter::Info)
                    .level_for(
                        "pikvm_desktop_lib",
                        if cfg!(debug_assertions) {
                            log::LevelFilter::Debug
                        } else {
                            log::LevelFilter::Info
                        },
                    )
                    .build(),
            )?;

            // A corrupt config stops startup; only a missing one is recreated.
            let store = ConfigStore::new(&app.path().app_config_dir()?);
            let config = store.load().inspect_err(|e| {
                log::error!("[Config] {}", e);
            })?;
            log::info!("[Config] Loaded {}", store.path().display());

            let settings_url = shell::app_page_url(shell::SETTINGS_PAGE)?;
            let session: shell::SharedSession =
                Arc::new(Mutex::new(ShellSession::new(store, config, settings_url)));
            app.manage(session);

            shell::create_main_window(app.handle())?;
            Ok(())
        })
        .on_window_event(shell::on_window_event)
        .invoke_handler(tauri::generate_handler![
            commands::set_origin,
            commands::connected_to_origin,
            commands::get_origin,
            commands::connect,
            commands::autofill_credentials,
            commands::window_minimise,
            commands::window_maximise,
            commands::window_close,
            commands::window_restore,
            commands::navigate_back,
            commands::request_window_state,
            commands::report_stream_status,
            commands::report_title,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|_app_handle, event| {
            if let RunEvent::Exit = event {
                log::info!("App shutting down");
            }
        });
}
