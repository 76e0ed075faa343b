use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

/// Outer window rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Edges count as inside
    pub fn contains(&self, (x, y): (f64, f64)) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Raw values read from the host window at broadcast time
#[derive(Debug, Clone, PartialEq)]
pub struct HostReport {
    pub is_maximized: bool,
    pub is_minimizable: bool,
    pub is_visible: bool,
    pub bounds: Bounds,
    /// `None` when the host cannot report the pointer
    pub cursor: Option<(f64, f64)>,
    pub theme: Theme,
}

/// Snapshot pushed to both surfaces on `window:state`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub is_maximized: bool,
    pub can_maximize: bool,
    pub can_minimize: bool,
    pub title: String,
    pub is_focused: bool,
    pub theme: Theme,
}

impl WindowState {
    /// "Focused" here means visible, holding focus and hovered. A window that
    /// has keyboard focus while the pointer is elsewhere reports `false`.
    pub fn from_report(report: &HostReport, can_maximize: bool, focused: bool, title: &str) -> Self {
        let hovered = report
            .cursor
            .map(|cursor| report.bounds.contains(cursor))
            .unwrap_or(false);

        Self {
            is_maximized: report.is_maximized,
            can_maximize,
            can_minimize: report.is_minimizable,
            title: title.to_string(),
            is_focused: report.is_visible && focused && hovered,
            theme: report.theme,
        }
    }
}
