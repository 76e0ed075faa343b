use url::Url;

use crate::config::{Config, ConfigError, ConfigStore};
use crate::mode::{Mode, ModeController, WindowProfile};
use crate::navigation::same_origin;
use crate::origin::{Credentials, Origin, OriginError};
use crate::probe::LoadFailure;
use crate::window_state::{HostReport, WindowState};

const MAX_HISTORY: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Origin(#[from] OriginError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Proceed,
    Defer,
}

/// All mutable shell state. Lives in Tauri managed state behind one lock.
pub struct ShellSession {
    store: ConfigStore,
    origin: Origin,
    mode: ModeController,
    focused: bool,
    close_by_button: bool,
    title: String,
    current_url: Option<Url>,
    history: Vec<Url>,
    load_generation: u64,
}

impl ShellSession {
    pub fn new(store: ConfigStore, config: Config, settings_url: Url) -> Self {
        Self {
            store,
            origin: Origin::new(config.origin),
            mode: ModeController::new(settings_url),
            focused: false,
            close_by_button: false,
            title: String::new(),
            current_url: None,
            history: Vec::new(),
            load_generation: 0,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn settings_url(&self) -> &Url {
        self.mode.settings_url()
    }

    /// Validate, persist and adopt a new origin
    pub fn set_origin(&mut self, input: &str) -> Result<&Origin, SessionError> {
        let origin = Origin::normalize(input)?;
        let config = Config {
            origin: origin.as_str().to_string(),
        };
        self.store.save(&config)?;
        self.origin = origin;
        log::info!("[Session] New PiKVM origin: {}", self.origin);
        Ok(&self.origin)
    }

    /// Whether the embedded surface currently shows a page of the origin
    pub fn connected_to_origin(&self) -> bool {
        match (&self.current_url, self.origin.url()) {
            (Some(current), Ok(origin)) => same_origin(current, &origin),
            _ => false,
        }
    }

    pub fn session_url(&self) -> Result<Url, OriginError> {
        self.origin.session_url()
    }

    pub fn credentials(&self) -> Result<Option<Credentials>, OriginError> {
        self.origin.credentials()
    }

    /// Navigation-completed hook
    pub fn on_navigated(&mut self, url: &Url) -> WindowProfile {
        let len = self.history.len();
        if len >= 2 && self.history[len - 2] == *url {
            // Returning to the previous page, not a new step
            self.history.pop();
        } else if self.history.last() != Some(url) {
            if len == MAX_HISTORY {
                self.history.remove(0);
            }
            self.history.push(url.clone());
        }
        self.current_url = Some(url.clone());
        self.mode.on_navigated(url)
    }

    /// Previous page to load for a back request, if any
    pub fn go_back(&mut self) -> Option<Url> {
        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        self.history.last().cloned()
    }

    /// Start a remote load. Results of earlier loads still in flight are stale.
    pub fn begin_load(&mut self) -> u64 {
        self.load_generation += 1;
        self.load_generation
    }

    pub fn is_current_load(&self, generation: u64) -> bool {
        self.load_generation == generation
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn window_state(&self, report: &HostReport) -> WindowState {
        WindowState::from_report(report, self.mode.can_maximize(), self.focused, &self.title)
    }

    /// The chrome close button was pressed
    pub fn allow_close_by_button(&mut self) {
        self.close_by_button = true;
    }

    pub fn close_decision(&self) -> CloseDecision {
        if self.mode.mode() == Mode::KvmSession && !self.close_by_button {
            CloseDecision::Defer
        } else {
            CloseDecision::Proceed
        }
    }

    /// Where to go after the remote page failed to load
    pub fn on_load_failure(&mut self, failure: &LoadFailure) -> Url {
        log::error!("[Session] Failed to load URL: {}", failure);
        self.settings_url().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window_state::{Bounds, Theme};
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> ShellSession {
        let store = ConfigStore::new(dir.path());
        let config = store.load().unwrap();
        ShellSession::new(
            store,
            config,
            Url::parse("tauri://localhost/settings.html").unwrap(),
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn set_origin_persists_normalized_value() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.set_origin("https://kvm.lan/").unwrap();
        assert_eq!(s.origin().as_str(), "https://kvm.lan");

        let reloaded = ConfigStore::new(dir.path()).load().unwrap();
        assert_eq!(reloaded.origin, "https://kvm.lan");
    }

    #[test]
    fn rejected_origin_keeps_previous_one() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert!(s.set_origin("pikvm.lan").is_err());
        assert_eq!(s.origin().as_str(), "https://pikvm/");
    }

    #[test]
    fn connected_only_on_origin_pages() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert!(!s.connected_to_origin());
        s.on_navigated(&url("tauri://localhost/settings.html"));
        assert!(!s.connected_to_origin());
        s.on_navigated(&url("https://pikvm/kvm/"));
        assert!(s.connected_to_origin());
    }

    #[test]
    fn back_walks_recorded_history() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert_eq!(s.go_back(), None);

        s.on_navigated(&url("tauri://localhost/settings.html"));
        s.on_navigated(&url("https://pikvm/"));
        s.on_navigated(&url("https://pikvm/kvm/"));

        let back = s.go_back().unwrap();
        assert_eq!(back.as_str(), "https://pikvm/");
        // Loading the previous page does not grow the history again
        s.on_navigated(&back);
        assert_eq!(s.go_back().unwrap().as_str(), "tauri://localhost/settings.html");
        assert_eq!(s.go_back(), None);
    }

    #[test]
    fn toggling_between_pages_does_not_grow_history() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.on_navigated(&url("tauri://localhost/settings.html"));
        for _ in 0..1000 {
            s.on_navigated(&url("https://pikvm/"));
            s.on_navigated(&url("https://pikvm/kvm/"));
        }

        assert_eq!(s.go_back().unwrap().as_str(), "https://pikvm/");
        assert_eq!(s.go_back().unwrap().as_str(), "tauri://localhost/settings.html");
        assert_eq!(s.go_back(), None);
    }

    #[test]
    fn history_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        for i in 0..(MAX_HISTORY + 50) {
            s.on_navigated(&url(&format!("https://pikvm/page/{i}")));
        }

        let mut steps = 0;
        while s.go_back().is_some() {
            steps += 1;
        }
        assert_eq!(steps, MAX_HISTORY - 1);
    }

    #[test]
    fn newer_load_supersedes_pending_one() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        let first = s.begin_load();
        assert!(s.is_current_load(first));

        let second = s.begin_load();
        assert!(!s.is_current_load(first));
        assert!(s.is_current_load(second));
    }

    #[test]
    fn close_is_deferred_in_session_until_button() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert_eq!(s.close_decision(), CloseDecision::Proceed);

        s.on_navigated(&url("https://pikvm/kvm/"));
        assert_eq!(s.close_decision(), CloseDecision::Defer);

        s.allow_close_by_button();
        assert_eq!(s.close_decision(), CloseDecision::Proceed);
    }

    #[test]
    fn latest_focus_transition_wins() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        let report = HostReport {
            is_maximized: false,
            is_minimizable: true,
            is_visible: true,
            bounds: Bounds { x: 0.0, y: 0.0, width: 400.0, height: 350.0 },
            cursor: Some((10.0, 10.0)),
            theme: Theme::Light,
        };

        let mut broadcasts = Vec::new();
        for focused in [true, false, true] {
            s.set_focused(focused);
            broadcasts.push(s.window_state(&report).is_focused);
        }
        assert_eq!(broadcasts, vec![true, false, true]);

        let outside = HostReport { cursor: Some((900.0, 10.0)), ..report };
        assert!(!s.window_state(&outside).is_focused);
    }

    #[test]
    fn title_and_maximize_flow_into_state() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        let report = HostReport {
            is_maximized: true,
            is_minimizable: true,
            is_visible: true,
            bounds: Bounds { x: 0.0, y: 0.0, width: 1280.0, height: 720.0 },
            cursor: None,
            theme: Theme::Dark,
        };
        s.on_navigated(&url("https://pikvm/kvm/"));
        s.set_title("PiKVM Session");

        let state = s.window_state(&report);
        assert!(state.can_maximize && state.is_maximized);
        assert_eq!(state.title, "PiKVM Session");
    }
}
