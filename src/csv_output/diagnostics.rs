use std::collections::HashSet;

/// Target of every diagnostics event, so subscribers can filter on it.
pub const WARNING_TARGET: &str = "tablog::csv_output";

/// De-duplicated warning emitter.
///
/// Each distinct message is emitted at most once per instance. Messages seen
/// while disabled are still remembered, so re-enabling does not replay them.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    warned: HashSet<String>,
    enabled: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            warned: HashSet::new(),
            enabled: true,
        }
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `message` unless it was seen before or emission is disabled.
    ///
    /// Returns true if the message was emitted.
    pub fn warn_once(&mut self, message: &str) -> bool {
        let first_time = self.warned.insert(message.to_string());
        if first_time && self.enabled {
            tracing::warn!(target: WARNING_TARGET, "{}", message);
            return true;
        }
        false
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_warned(&self, message: &str) -> bool {
        self.warned.contains(message)
    }

    /// Number of distinct messages seen, emitted or not.
    pub fn seen_count(&self) -> usize {
        self.warned.len()
    }
}

/// Canonical drift message naming the fields a record introduced.
pub fn drift_message(added: &[&str]) -> String {
    format!("CSV schema grew: added field(s) {}", added.join(", "))
}
