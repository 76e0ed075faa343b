//! IPC handlers called by the overlay, the settings page and the patch
//! scripts running inside the remote PiKVM pages.

use tauri::{AppHandle, Manager, State};

use crate::messages::{Push, StreamInfo};
use crate::origin::Credentials;
use crate::shell::{self, SharedSession, MAIN_WINDOW};

fn main_window(app: &AppHandle) -> Result<tauri::Window, String> {
    app.get_window(MAIN_WINDOW)
        .ok_or_else(|| "Main window not found".to_string())
}

/// Store a new origin and load it. Returns `false` when the input is rejected.
#[tauri::command]
pub fn set_origin(app: AppHandle, state: State<'_, SharedSession>, origin: String) -> bool {
    let result = state.lock().set_origin(&origin).and_then(|origin| {
        let url = origin.base_url()?;
        Ok((url, origin.clone()))
    });

    match result {
        Ok((url, origin)) => {
            shell::grant_remote_ipc(&app, &origin);
            shell::load_remote(&app, url);
            true
        }
        Err(e) => {
            log::warn!("[Settings] Rejected origin {:?}: {}", origin, e);
            false
        }
    }
}

#[tauri::command]
pub fn connected_to_origin(state: State<'_, SharedSession>) -> bool {
    state.lock().connected_to_origin()
}

#[tauri::command]
pub fn get_origin(state: State<'_, SharedSession>) -> String {
    state.lock().origin().to_string()
}

/// Open the KVM session page of the configured origin
#[tauri::command]
pub fn connect(app: AppHandle, state: State<'_, SharedSession>) -> Result<(), String> {
    let url = state.lock().session_url().map_err(|e| e.to_string())?;
    log::info!("[Settings] Connecting to PiKVM at: {}", url);
    shell::load_remote(&app, url);
    Ok(())
}

#[tauri::command]
pub fn autofill_credentials(state: State<'_, SharedSession>) -> Result<Option<Credentials>, String> {
    let credentials = state.lock().credentials().map_err(|e| e.to_string())?;
    if credentials.is_some() {
        log::info!("[Autofill] Credentials found in origin URL");
    }
    Ok(credentials)
}

#[tauri::command]
pub fn window_minimise(app: AppHandle) -> Result<(), String> {
    main_window(&app)?.minimize().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn window_maximise(app: AppHandle) -> Result<(), String> {
    let window = main_window(&app)?;
    let maximized = window.is_maximized().map_err(|e| e.to_string())?;
    log::debug!("[Window] Toggle maximise (maximized: {})", maximized);
    if maximized {
        window.unmaximize()
    } else {
        window.maximize()
    }
    .map_err(|e| e.to_string())
}

/// Close from the title bar button. The only close allowed during a session.
#[tauri::command]
pub fn window_close(app: AppHandle, state: State<'_, SharedSession>) -> Result<(), String> {
    log::info!("[Window] Close (UI)");
    state.lock().allow_close_by_button();
    main_window(&app)?.close().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn window_restore(app: AppHandle) -> Result<(), String> {
    main_window(&app)?.unmaximize().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn navigate_back(app: AppHandle, state: State<'_, SharedSession>) {
    let previous = state.lock().go_back();
    match previous {
        Some(url) => shell::load(&app, url),
        None => log::info!("[Navigation] No navigation history to go back to"),
    }
}

#[tauri::command]
pub fn request_window_state(app: AppHandle) {
    shell::broadcast_state(&app);
}

/// Raw text of the PiKVM stream status element
#[tauri::command]
pub fn report_stream_status(app: AppHandle, status: String) {
    match StreamInfo::parse(&status) {
        Some(info) => shell::push(&app, Push::Stream(info)),
        None => log::debug!("[Stream] Ignoring status {:?}", status),
    }
}

#[tauri::command]
pub fn report_title(app: AppHandle, state: State<'_, SharedSession>, title: String) {
    state.lock().set_title(&title);
    shell::broadcast_state(&app);
}
