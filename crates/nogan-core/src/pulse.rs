//! Pulses: the instantaneous typed signals that travel along wires.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::{CellKind, Position};

/// Describes a cell to spawn or stamp onto a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTemplate {
    #[serde(rename = "type")]
    pub kind: CellKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl CellTemplate {
    /// A template of `kind` with no position.
    pub fn of(kind: CellKind) -> Self {
        CellTemplate {
            kind,
            position: None,
        }
    }
}

/// An immutable typed signal.
///
/// Tagged by `"type"` in JSON, e.g. `{"type": "creation", "template": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Pulse {
    /// Inert default pulse. Yields to any pulse already present.
    Raw,
    /// Stamps its template onto the first slot it reaches.
    Creation { template: CellTemplate },
    Destruction,
    /// Diagnostic probe. Emits a pong operation wherever it spreads.
    Ping,
    /// Diagnostic reply.
    Pong,
}

impl Pulse {
    /// Returns the tag used to pick a behaviour for this pulse.
    pub fn kind(&self) -> PulseKind {
        match self {
            Pulse::Raw => PulseKind::Raw,
            Pulse::Creation { .. } => PulseKind::Creation,
            Pulse::Destruction => PulseKind::Destruction,
            Pulse::Ping => PulseKind::Ping,
            Pulse::Pong => PulseKind::Pong,
        }
    }

    /// The creation pulse a creation cell makes out of a raw pulse.
    pub fn default_creation() -> Self {
        Pulse::Creation {
            template: CellTemplate::of(CellKind::Recording),
        }
    }
}

/// Payload-free discriminant of [`Pulse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseKind {
    Raw,
    Creation,
    Destruction,
    Ping,
    Pong,
}

impl fmt::Display for PulseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PulseKind::Raw => "raw",
            PulseKind::Creation => "creation",
            PulseKind::Destruction => "destruction",
            PulseKind::Ping => "ping",
            PulseKind::Pong => "pong",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_pulse_from_json() {
        let json = r#"{"type": "creation", "template": {"type": "recording", "position": [0, 0]}}"#;
        let pulse: Pulse = serde_json::from_str(json).unwrap();
        assert_eq!(pulse.kind(), PulseKind::Creation);
        match pulse {
            Pulse::Creation { template } => {
                assert_eq!(template.kind, CellKind::Recording);
                assert_eq!(template.position, Some([0.0, 0.0]));
            }
            other => panic!("expected creation pulse, got {:?}", other),
        }
    }

    #[test]
    fn unit_pulses_are_bare_tags() {
        assert_eq!(serde_json::to_string(&Pulse::Raw).unwrap(), r#"{"type":"raw"}"#);
        let ping: Pulse = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, Pulse::Ping);
    }

    #[test]
    fn default_creation_template_has_no_position() {
        let json = serde_json::to_value(Pulse::default_creation()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "creation", "template": {"type": "recording"}})
        );
    }

    #[test]
    fn unknown_pulse_type_is_rejected() {
        assert!(serde_json::from_str::<Pulse>(r#"{"type":"glitter"}"#).is_err());
    }
}
