//! Application run modes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Scan once and exit.
    Once,
    /// Scan on a schedule until interrupted.
    Daemon,
}

impl RunMode {
    pub fn from_arg(value: &str) -> Option<Self> {
        match value {
            "once" => Some(RunMode::Once),
            "daemon" => Some(RunMode::Daemon),
            _ => None,
        }
    }
}
