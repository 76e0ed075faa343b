//! Window geometry and capabilities per loaded page.
//!
//! The embedded surface is either on the shell's own settings page, on some
//! other non-session page of the PiKVM (login, index), or on the live KVM
//! session. Each navigation-completed event maps the new URL to a
//! [`WindowProfile`] which the shell applies to the host window.

use url::Url;

use crate::origin::SESSION_PATH;

const BASE_CSS: &str = include_str!("../styles/base.css");
const KVM_CSS: &str = include_str!("../styles/kvm.css");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Settings,
    KvmSession,
}

impl Mode {
    /// `/kvm` path prefix means a session, anything else is settings
    pub fn from_url(url: &Url) -> Self {
        if url.path().starts_with(SESSION_PATH) {
            Mode::KvmSession
        } else {
            Mode::Settings
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    LocalSettings,
    Remote,
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub const SESSION_SIZE: Size = Size::new(1280, 720);
pub const REMOTE_SIZE: Size = Size::new(400, 350);
pub const SETTINGS_SIZE: Size = Size::new(400, 110);

/// What the host window should look like for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowProfile {
    pub mode: Mode,
    pub size: Size,
    pub resizable: bool,
    pub maximizable: bool,
    pub closable: bool,
    /// Leave a maximized state before resizing
    pub unmaximize: bool,
}

impl WindowProfile {
    pub fn for_page(page: Page) -> Self {
        match page {
            Page::Session => Self {
                mode: Mode::KvmSession,
                size: SESSION_SIZE,
                resizable: true,
                maximizable: true,
                closable: false,
                unmaximize: false,
            },
            Page::LocalSettings | Page::Remote => Self {
                mode: Mode::Settings,
                size: if page == Page::LocalSettings {
                    SETTINGS_SIZE
                } else {
                    REMOTE_SIZE
                },
                resizable: false,
                maximizable: false,
                closable: true,
                unmaximize: true,
            },
        }
    }
}

/// Base chrome styles, plus the session styles in KVM mode
pub fn stylesheet(mode: Mode) -> String {
    match mode {
        Mode::KvmSession => format!("{}\n{}", BASE_CSS, KVM_CSS),
        Mode::Settings => BASE_CSS.to_string(),
    }
}

pub struct ModeController {
    settings_url: Url,
    mode: Mode,
    can_maximize: bool,
}

impl ModeController {
    /// `settings_url` is the shell page that selects the compact size
    pub fn new(settings_url: Url) -> Self {
        Self {
            settings_url,
            mode: Mode::Settings,
            can_maximize: false,
        }
    }

    pub fn settings_url(&self) -> &Url {
        &self.settings_url
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn can_maximize(&self) -> bool {
        self.can_maximize
    }

    pub fn page_of(&self, url: &Url) -> Page {
        match Mode::from_url(url) {
            Mode::KvmSession => Page::Session,
            Mode::Settings if self.is_settings_page(url) => Page::LocalSettings,
            Mode::Settings => Page::Remote,
        }
    }

    fn is_settings_page(&self, url: &Url) -> bool {
        url.scheme() == self.settings_url.scheme()
            && url.host_str() == self.settings_url.host_str()
            && url.port_or_known_default() == self.settings_url.port_or_known_default()
            && url.path() == self.settings_url.path()
    }

    /// Record a completed navigation and return the profile to apply.
    /// The same URL always yields the same profile.
    pub fn on_navigated(&mut self, url: &Url) -> WindowProfile {
        let profile = WindowProfile::for_page(self.page_of(url));
        if profile.mode != self.mode {
            log::info!("[Mode] {:?} -> {:?}", self.mode, profile.mode);
        }
        self.mode = profile.mode;
        self.can_maximize = profile.maximizable;
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ModeController {
        ModeController::new(Url::parse("tauri://localhost/settings.html").unwrap())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn kvm_prefix_selects_session_mode() {
        assert_eq!(Mode::from_url(&url("https://pikvm/kvm")), Mode::KvmSession);
        assert_eq!(Mode::from_url(&url("https://pikvm/kvm/session1")), Mode::KvmSession);
        assert_eq!(Mode::from_url(&url("https://pikvm/login")), Mode::Settings);
        assert_eq!(Mode::from_url(&url("https://pikvm/")), Mode::Settings);
    }

    #[test]
    fn session_profile() {
        let mut c = controller();
        let p = c.on_navigated(&url("https://pikvm/kvm/"));
        assert_eq!(p.mode, Mode::KvmSession);
        assert_eq!(p.size, SESSION_SIZE);
        assert!(p.resizable && p.maximizable);
        assert!(!p.closable);
        assert!(c.can_maximize());
    }

    #[test]
    fn settings_pages_pick_their_size() {
        let mut c = controller();
        let local = c.on_navigated(&url("tauri://localhost/settings.html"));
        assert_eq!(local.size, SETTINGS_SIZE);

        let remote = c.on_navigated(&url("https://pikvm/login/"));
        assert_eq!(remote.size, REMOTE_SIZE);

        for p in [local, remote] {
            assert_eq!(p.mode, Mode::Settings);
            assert!(!p.resizable && !p.maximizable);
            assert!(p.closable && p.unmaximize);
        }
        assert!(!c.can_maximize());
    }

    #[test]
    fn repeated_navigation_is_idempotent() {
        let mut c = controller();
        for target in ["https://pikvm/kvm", "https://pikvm/", "tauri://localhost/settings.html"] {
            let first = c.on_navigated(&url(target));
            let second = c.on_navigated(&url(target));
            assert_eq!(first, second, "{target}");
            assert_eq!(c.mode(), first.mode);
        }
    }

    #[test]
    fn leaving_the_session_restores_settings_flags() {
        let mut c = controller();
        c.on_navigated(&url("https://pikvm/kvm"));
        let p = c.on_navigated(&url("https://pikvm/"));
        assert_eq!(c.mode(), Mode::Settings);
        assert!(p.closable && !p.maximizable);
    }

    #[test]
    fn session_stylesheet_appends_kvm_styles() {
        let settings = stylesheet(Mode::Settings);
        let session = stylesheet(Mode::KvmSession);
        assert_eq!(settings, BASE_CSS);
        assert!(session.starts_with(BASE_CSS));
        assert!(session.ends_with(KVM_CSS));
    }
}
