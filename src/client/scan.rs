use std::time::{Duration, Instant};

use super::{Client, MarkOutcome};

pub const SCAN_WINDOW: Duration = Duration::from_secs(1);

/// Admits at most one scan per rolling window. A QR code left in front of
/// the camera decodes on every frame; only the first decode in each window
/// gets through. Rejected scans do not move the window.
#[derive(Debug, Clone)]
pub struct ScanGate {
    window: Duration,
    last: Option<Instant>,
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::with_window(SCAN_WINDOW)
    }
}

impl ScanGate {
    pub fn with_window(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// One scanning screen: a fixed activity plus its gate.
pub struct ScanSession<'a> {
    client: &'a Client,
    activity_id: String,
    gate: ScanGate,
}

impl<'a> ScanSession<'a> {
    pub fn new(client: &'a Client, activity_id: impl Into<String>) -> Self {
        Self {
            client,
            activity_id: activity_id.into(),
            gate: ScanGate::default(),
        }
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// `None` when the scan was swallowed by the gate.
    pub async fn handle_scan(&mut self, code: &str) -> Option<MarkOutcome> {
        if !self.gate.admit() {
            return None;
        }
        Some(self.client.mark_attendance(&self.activity_id, code).await)
    }
}
