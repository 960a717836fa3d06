// ── Core error types ──
//
// Registration conflicts, lookup misses, addressing errors and transport
// failures. Callers at the UI boundary log these and drop the action;
// construction-time callers propagate them and abort startup.

use thiserror::Error;

use crate::model::DeviceKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registration conflicts ───────────────────────────────────────
    #[error("{kind} names must be unique; '{name}' provided twice")]
    DuplicateName { kind: DeviceKind, name: String },

    #[error("subscriber '{name}' already exists")]
    DuplicateSubscriber { name: String },

    // ── Lookup / addressing errors ───────────────────────────────────
    #[error("unknown {kind} '{name}'")]
    UnknownDevice { kind: DeviceKind, name: String },

    #[error("port '{port}' not present on switch '{device}'")]
    PortNotFound { device: String, port: String },

    #[error("terminal '{terminal}' not present on port '{port}' of switch '{device}'")]
    TerminalNotFound {
        device: String,
        port: String,
        terminal: String,
    },

    #[error("heading {heading}° out of range (0-{max}°)")]
    OutOfRangeHeading { heading: u16, max: u16 },

    // ── Transport errors ─────────────────────────────────────────────
    #[error("command to '{device}' failed: {reason}")]
    TransportFailure { device: String, reason: String },

    #[error("unable to create proxy for '{service}': {reason}")]
    ProxyConstruction { service: String, reason: String },

    #[error("registry error: {message}")]
    Registry { message: String },
}

impl CoreError {
    /// Whether the error stems from the remote side rather than from local
    /// addressing or registration.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure { .. } | Self::ProxyConstruction { .. } | Self::Registry { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_mentions_kind_and_name() {
        let err = CoreError::DuplicateName {
            kind: DeviceKind::Rotator,
            name: "Tower 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "rotator names must be unique; 'Tower 1' provided twice"
        );
    }

    #[test]
    fn transport_classification() {
        let transport = CoreError::TransportFailure {
            device: "Stack".into(),
            reason: "timeout".into(),
        };
        let addressing = CoreError::PortNotFound {
            device: "Stack".into(),
            port: "SM".into(),
        };
        assert!(transport.is_transport());
        assert!(!addressing.is_transport());
    }
}
