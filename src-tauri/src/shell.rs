use parking_lot::Mutex;
use std::sync::Arc;
use tauri::{
    ipc::CapabilityBuilder,
    webview::{NewWindowResponse, PageLoadEvent},
    window::WindowBuilder,
    AppHandle, Emitter, EventTarget, LogicalPosition, LogicalSize, Manager, Runtime, Webview,
    WebviewBuilder, WebviewUrl, Window, WindowEvent,
};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_plugin_opener::OpenerExt;
use url::Url;

use crate::messages::{Push, Surface};
use crate::mode::{self, WindowProfile, REMOTE_SIZE};
use crate::navigation::{self, Disposition};
use crate::origin::Origin;
use crate::probe::{self, LoadFailure};
use crate::session::{CloseDecision, ShellSession};
use crate::window_state::{Bounds, HostReport, Theme};

pub type SharedSession = Arc<Mutex<ShellSession>>;

pub const MAIN_WINDOW: &str = "main";
pub const OVERLAY_PAGE: &str = "index.html";
pub const SETTINGS_PAGE: &str = "settings.html";

const TITLEBAR_HEIGHT: f64 = 38.0;
const MIN_SIZE: (f64, f64) = (300.0, 80.0);

const PATCH_SCRIPT: &str = include_str!("../scripts/kvm-patches.js");

/// WebView2 arguments. Webviews sharing a data directory must all use the same set.
/// PiKVM ships a self-signed certificate.
#[cfg_attr(not(windows), allow(dead_code))]
const BROWSER_ARGS: &str =
    "--disable-features=msWebOOUI,msPdfOOUI,msSmartScreenProtection --ignore-certificate-errors";

/// URL the host serves a bundled page under
pub fn app_page_url(page: &str) -> Result<Url, url::ParseError> {
    let base = if cfg!(any(windows, target_os = "android")) {
        "http://tauri.localhost/"
    } else {
        "tauri://localhost/"
    };
    Url::parse(base)?.join(page)
}

/// Create the frameless main window with the overlay and embedded webviews
pub fn create_main_window<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<()> {
    let window = WindowBuilder::new(app, MAIN_WINDOW)
        .title("PiKVM")
        .inner_size(REMOTE_SIZE.width as f64, REMOTE_SIZE.height as f64)
        .min_inner_size(MIN_SIZE.0, MIN_SIZE.1)
        .decorations(false)
        .resizable(false)
        .maximizable(false)
        .background_color(tauri::window::Color(0x0f, 0x0f, 0x14, 0xff))
        .theme(Some(tauri::Theme::Dark))
        .build()?;

    let size = window.inner_size()?.to_logical::<f64>(window.scale_factor()?);

    let overlay_app = app.clone();
    let overlay = surface_builder(Surface::Overlay, OVERLAY_PAGE)
        .on_navigation(move |url| {
            if navigation::is_shell_page(url) {
                return true;
            }
            open_external(&overlay_app, url);
            false
        });
    window.add_child(
        overlay,
        LogicalPosition::new(0.0, 0.0),
        LogicalSize::new(size.width, size.height),
    )?;

    let embedded = window.add_child(
        embedded_builder(app),
        LogicalPosition::new(0.0, TITLEBAR_HEIGHT),
        LogicalSize::new(size.width, (size.height - TITLEBAR_HEIGHT).max(0.0)),
    )?;

    if cfg!(debug_assertions) || std::env::var("PIKVM_DEVTOOLS").as_deref() == Ok("1") {
        for surface in Surface::ALL {
            if let Some(webview) = app.get_webview(surface.label()) {
                webview.open_devtools();
            }
        }
    }

    let origin = app.state::<SharedSession>().lock().origin().clone();
    grant_remote_ipc(app, &origin);

    embedded.set_focus()?;
    broadcast_state(app);
    log::info!("[Shell] Main window created");
    Ok(())
}

fn embedded_builder<R: Runtime>(app: &AppHandle<R>) -> WebviewBuilder<R> {
    let navigation_app = app.clone();
    let popup_app = app.clone();
    let load_app = app.clone();

    surface_builder(Surface::Embedded, SETTINGS_PAGE)
        .initialization_script(PATCH_SCRIPT)
        .on_navigation(move |url| {
            log::debug!("[Shell] Will navigate: {}", url);
            match disposition(&navigation_app, url) {
                Disposition::Internal => true,
                Disposition::External => {
                    log::info!("[Shell] External navigation blocked: {}", url);
                    open_external(&navigation_app, url);
                    false
                }
            }
        })
        .on_new_window(move |url, _features| {
            log::info!("[Shell] Window open request: {}", url);
            match disposition(&popup_app, &url) {
                Disposition::Internal => NewWindowResponse::Allow,
                Disposition::External => {
                    open_external(&popup_app, &url);
                    NewWindowResponse::Deny
                }
            }
        })
        .on_page_load(move |webview, payload| match payload.event() {
            PageLoadEvent::Started => broadcast_state(&load_app),
            PageLoadEvent::Finished => page_loaded(&webview, payload.url()),
        })
}

/// Settings shared by both child webviews of the main window
fn surface_builder<R: Runtime>(surface: Surface, page: &str) -> WebviewBuilder<R> {
    let builder = WebviewBuilder::new(surface.label(), WebviewUrl::App(page.into()))
        .zoom_hotkeys_enabled(false);

    #[cfg(windows)]
    let builder = builder.additional_browser_args(BROWSER_ARGS);

    builder
}

fn disposition<R: Runtime>(app: &AppHandle<R>, url: &Url) -> Disposition {
    let session = app.state::<SharedSession>();
    let origin = session.lock().origin().clone();
    navigation::classify_or_external(&origin, url)
}

fn open_external<R: Runtime>(app: &AppHandle<R>, url: &Url) {
    log::info!("[Shell] Opening externally: {}", url);
    if let Err(e) = app.opener().open_url(url.as_str(), None::<&str>) {
        log::error!("[Shell] Failed to open {}: {}", url, e);
    }
}

/// Navigation-completed: reconfigure the window, push styles and state
fn page_loaded<R: Runtime>(webview: &Webview<R>, url: &Url) {
    log::info!("[Shell] Navigated: {}", url);
    let app = webview.app_handle();
    let profile = app.state::<SharedSession>().lock().on_navigated(url);

    if let Err(e) = apply_profile(&webview.window(), &profile) {
        log::error!("[Shell] Failed to apply window profile: {}", e);
    }

    log::debug!("[Shell] Injecting CSS");
    push(app, Push::Stylesheet(mode::stylesheet(profile.mode)));
    broadcast_state(app);
}

fn apply_profile<R: Runtime>(window: &Window<R>, profile: &WindowProfile) -> tauri::Result<()> {
    log::info!("[Mode] Applying {:?}", profile);
    if profile.unmaximize {
        window.unmaximize()?;
    }
    window.set_maximizable(profile.maximizable)?;
    window.set_closable(profile.closable)?;
    window.set_size(LogicalSize::new(
        profile.size.width as f64,
        profile.size.height as f64,
    ))?;
    window.set_resizable(profile.resizable)?;
    Ok(())
}

/// Keep the overlay full-size and the embedded surface below the title bar
pub fn layout<R: Runtime>(window: &Window<R>) -> tauri::Result<()> {
    let size = window.inner_size()?.to_logical::<f64>(window.scale_factor()?);
    let app = window.app_handle();

    if let Some(overlay) = app.get_webview(Surface::Overlay.label()) {
        overlay.set_position(LogicalPosition::new(0.0, 0.0))?;
        overlay.set_size(LogicalSize::new(size.width, size.height))?;
    }
    if let Some(embedded) = app.get_webview(Surface::Embedded.label()) {
        embedded.set_position(LogicalPosition::new(0.0, TITLEBAR_HEIGHT))?;
        embedded.set_size(LogicalSize::new(
            size.width,
            (size.height - TITLEBAR_HEIGHT).max(0.0),
        ))?;
    }
    Ok(())
}

fn host_report<R: Runtime>(window: &Window<R>) -> tauri::Result<HostReport> {
    let position = window.outer_position()?;
    let size = window.outer_size()?;
    let cursor = window.cursor_position().ok().map(|p| (p.x, p.y));
    let theme = match window.theme()? {
        tauri::Theme::Dark => Theme::Dark,
        _ => Theme::Light,
    };

    Ok(HostReport {
        is_maximized: window.is_maximized()?,
        is_minimizable: window.is_minimizable()?,
        is_visible: window.is_visible()?,
        bounds: Bounds {
            x: position.x as f64,
            y: position.y as f64,
            width: size.width as f64,
            height: size.height as f64,
        },
        cursor,
        theme,
    })
}

/// Send a fresh `WindowState` to both surfaces
pub fn broadcast_state<R: Runtime>(app: &AppHandle<R>) {
    let Some(window) = app.get_window(MAIN_WINDOW) else {
        return;
    };
    let report = match host_report(&window) {
        Ok(report) => report,
        Err(e) => {
            log::warn!("[Shell] Cannot read window state: {}", e);
            return;
        }
    };
    let state = app.state::<SharedSession>().lock().window_state(&report);
    push(app, Push::WindowState(state));
}

pub fn push<R: Runtime>(app: &AppHandle<R>, message: Push) {
    for surface in message.targets() {
        if let Err(e) = app.emit_to(EventTarget::webview(surface.label()), message.event(), &message) {
            log::warn!("[Shell] Failed to emit {} to {}: {}", message.event(), surface.label(), e);
        }
    }
}

/// Let pages of the configured origin reach the shell's commands and events
pub fn grant_remote_ipc<R: Runtime>(app: &AppHandle<R>, origin: &Origin) {
    let pattern = match origin.remote_pattern() {
        Ok(pattern) => pattern,
        Err(e) => {
            log::warn!("[Shell] No IPC access for origin: {}", e);
            return;
        }
    };
    let identifier: String = pattern
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let capability = CapabilityBuilder::new(format!("remote-{}", identifier))
        .remote(pattern.clone())
        .webview(Surface::Embedded.label())
        .permission("core:event:default");

    match app.add_capability(capability) {
        Ok(()) => log::info!("[Shell] IPC granted to {}", pattern),
        Err(e) => log::debug!("[Shell] Capability for {} not added: {}", pattern, e),
    }
}

/// Load `url` in the embedded surface once the host is reachable.
/// A later load supersedes this one while its probe is still running.
pub fn load_remote<R: Runtime>(app: &AppHandle<R>, url: Url) {
    let generation = app.state::<SharedSession>().lock().begin_load();
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        let result = probe::probe(&url).await;
        if !app.state::<SharedSession>().lock().is_current_load(generation) {
            log::debug!("[Shell] Dropping stale load of {}", url);
            return;
        }
        match result {
            Ok(()) => navigate(&app, url),
            Err(failure) => report_load_failure(&app, &failure),
        }
    });
}

/// Load a page in the embedded surface. Bundled pages skip the probe.
pub fn load<R: Runtime>(app: &AppHandle<R>, url: Url) {
    if navigation::is_shell_page(&url) {
        app.state::<SharedSession>().lock().begin_load();
        navigate(app, url);
    } else {
        load_remote(app, url);
    }
}

pub fn navigate<R: Runtime>(app: &AppHandle<R>, url: Url) {
    let Some(webview) = app.get_webview(Surface::Embedded.label()) else {
        log::warn!("[Shell] Embedded webview not found");
        return;
    };
    log::info!("[Shell] Navigating to: {}", url);
    if let Err(e) = webview.navigate(url) {
        log::error!("[Shell] Failed to navigate: {}", e);
    }
}

/// Fall back to the settings page and tell the user why
pub fn report_load_failure<R: Runtime>(app: &AppHandle<R>, failure: &LoadFailure) {
    let fallback = app.state::<SharedSession>().lock().on_load_failure(failure);
    navigate(app, fallback);

    app.dialog()
        .message(failure.message())
        .title("Error")
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

/// Window events of the main window
pub fn on_window_event<R: Runtime>(window: &Window<R>, event: &WindowEvent) {
    if window.label() != MAIN_WINDOW {
        return;
    }
    let app = window.app_handle();

    match event {
        WindowEvent::Focused(focused) => {
            app.state::<SharedSession>().lock().set_focused(*focused);
            broadcast_state(app);
        }
        WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
            if let Err(e) = layout(window) {
                log::warn!("[Shell] Layout failed: {}", e);
            }
            broadcast_state(app);
        }
        WindowEvent::Moved(_) | WindowEvent::ThemeChanged(_) => broadcast_state(app),
        WindowEvent::CloseRequested { api, .. } => {
            let decision = app.state::<SharedSession>().lock().close_decision();
            if decision == CloseDecision::Defer {
                log::info!("[Shell] Close deferred while in a KVM session");
                api.prevent_close();
            }
        }
        _ => {}
    }
}
