//! Payloads exchanged between the shell and the two webviews.
//!
//! Surfaces talk to the shell through the typed commands in
//! [`crate::commands`]; the shell talks back with the events below.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::window_state::WindowState;

pub const WINDOW_STATE_EVENT: &str = "window:state";
pub const STYLESHEET_EVENT: &str = "kvm:css";
pub const STREAM_EVENT: &str = "kvm:stream";

/// Webview labels inside the main window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Title bar and window controls
    Overlay,
    /// Settings page or remote PiKVM pages
    Embedded,
}

impl Surface {
    pub const ALL: [Surface; 2] = [Surface::Overlay, Surface::Embedded];

    pub fn label(self) -> &'static str {
        match self {
            Surface::Overlay => "overlay",
            Surface::Embedded => "kvm",
        }
    }
}

/// Stream dimensions and media flags scraped from the PiKVM status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub is_transmitting_audio: bool,
    pub is_transmitting_microphone: bool,
}

fn dimensions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,5})\s*[x×]\s*(\d{1,5})").expect("valid regex"))
}

fn audio_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\baudio\b").expect("valid regex"))
}

fn mic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bmic(rophone)?\b").expect("valid regex"))
}

impl StreamInfo {
    /// Parse e.g. `"1920x1080 / 30 fps, Audio, Mic"`. Text without a
    /// non-zero `WIDTHxHEIGHT` is not a stream status.
    pub fn parse(status: &str) -> Option<Self> {
        let caps = dimensions_re().captures(status)?;
        let width: u32 = caps[1].parse().ok()?;
        let height: u32 = caps[2].parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            is_transmitting_audio: audio_re().is_match(status),
            is_transmitting_microphone: mic_re().is_match(status),
        })
    }
}

/// Everything the shell pushes into the webviews
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Push {
    WindowState(WindowState),
    Stylesheet(String),
    Stream(StreamInfo),
}

impl Push {
    pub fn event(&self) -> &'static str {
        match self {
            Push::WindowState(_) => WINDOW_STATE_EVENT,
            Push::Stylesheet(_) => STYLESHEET_EVENT,
            Push::Stream(_) => STREAM_EVENT,
        }
    }

    pub fn targets(&self) -> &'static [Surface] {
        match self {
            Push::WindowState(_) | Push::Stream(_) => &Surface::ALL,
            Push::Stylesheet(_) => &[Surface::Embedded],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolution_and_media_flags() {
        assert_eq!(
            StreamInfo::parse("1920x1080 / 30 fps, Audio, Mic"),
            Some(StreamInfo {
                width: 1920,
                height: 1080,
                is_transmitting_audio: true,
                is_transmitting_microphone: true,
            })
        );
        assert_eq!(
            StreamInfo::parse("Streaming 1280 x 720 (H.264)"),
            Some(StreamInfo {
                width: 1280,
                height: 720,
                is_transmitting_audio: false,
                is_transmitting_microphone: false,
            })
        );
    }

    #[test]
    fn media_keywords_are_whole_words() {
        let info = StreamInfo::parse("800x600 audiophile microscope").unwrap();
        assert!(!info.is_transmitting_audio);
        assert!(!info.is_transmitting_microphone);

        let info = StreamInfo::parse("800x600 AUDIO microphone").unwrap();
        assert!(info.is_transmitting_audio);
        assert!(info.is_transmitting_microphone);
    }

    #[test]
    fn status_without_dimensions_is_ignored() {
        assert_eq!(StreamInfo::parse("No signal"), None);
        assert_eq!(StreamInfo::parse("0x0"), None);
    }

    #[test]
    fn push_routing() {
        let css = Push::Stylesheet("body{}".into());
        assert_eq!(css.event(), "kvm:css");
        assert_eq!(css.targets(), &[Surface::Embedded]);
        assert_eq!(serde_json::to_value(&css).unwrap(), serde_json::json!("body{}"));

        let stream = Push::Stream(StreamInfo::parse("640x480").unwrap());
        assert_eq!(stream.targets(), &Surface::ALL);
        assert_eq!(
            serde_json::to_value(&stream).unwrap()["width"],
            serde_json::json!(640)
        );
    }
}
