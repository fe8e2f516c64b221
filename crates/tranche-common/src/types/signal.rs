use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the admin wants the worker to do with one sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    /// Drop the active bundle; its number has been recycled.
    Reset,
    /// A bundle was assigned directly; reload state from the server.
    ManualAssign { bundle_number: u32 },
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Reset => "reset",
            SignalKind::ManualAssign { .. } => "manual_assign",
        }
    }
}

/// Admin instruction addressed to `(worker, sub_region)`. Lives until the
/// worker acknowledges it by deleting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSignal {
    #[serde(flatten)]
    pub kind: SignalKind,
    pub issued_at: DateTime<Utc>,
}

impl OverrideSignal {
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            issued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_json_shape() {
        let signal = OverrideSignal::new(SignalKind::ManualAssign { bundle_number: 4 });
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["type"], "manual_assign");
        assert_eq!(value["bundle_number"], 4);

        let reset: OverrideSignal = serde_json::from_str(
            r#"{"type":"reset","issued_at":"2026-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(reset.kind, SignalKind::Reset);
        assert_eq!(reset.kind.as_str(), "reset");
    }
}
