// ── Service name classification and normalization ──
//
// Fully-qualified service names look like `shackbus.rotator.Tower_1`: a
// reserved prefix per device kind, then the display name with spaces
// escaped as underscores. The display name is the hub key.

use serde::{Deserialize, Serialize};

use crate::model::DeviceKind;

const SPACE_MARKER: char = '_';

/// Reserved service-name prefixes that identify each device kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrefixes {
    pub rotator: String,
    pub switch: String,
}

impl Default for ServicePrefixes {
    fn default() -> Self {
        Self {
            rotator: "shackbus.rotator.".into(),
            switch: "shackbus.switch.".into(),
        }
    }
}

impl ServicePrefixes {
    /// Device kind for a fully-qualified service name, or `None` for
    /// services this system does not manage.
    pub fn classify(&self, service: &str) -> Option<DeviceKind> {
        let matches = |prefix: &str| {
            service
                .strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty())
        };
        if matches(&self.rotator) {
            Some(DeviceKind::Rotator)
        } else if matches(&self.switch) {
            Some(DeviceKind::Switch)
        } else {
            None
        }
    }

    /// Fully-qualified service name for a display name of the given kind.
    pub fn service_name(&self, kind: DeviceKind, display: &str) -> String {
        let prefix = match kind {
            DeviceKind::Rotator => &self.rotator,
            DeviceKind::Switch => &self.switch,
        };
        format!("{prefix}{}", service_segment(display))
    }
}

/// Display name (hub key) of a fully-qualified service name: the final
/// dot-delimited segment with the space marker unescaped.
pub fn display_name(service: &str) -> String {
    let segment = service.rsplit('.').next().unwrap_or(service);
    segment.replace(SPACE_MARKER, " ")
}

/// Inverse of [`display_name`] for the trailing segment.
pub fn service_segment(display: &str) -> String {
    display.replace(' ', &SPACE_MARKER.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn display_name_unescapes_last_segment() {
        assert_eq!(display_name("shackbus.rotator.Tower_1"), "Tower 1");
        assert_eq!(display_name("shackbus.switch.Stack_Match_A"), "Stack Match A");
        assert_eq!(display_name("plain"), "plain");
    }

    #[test]
    fn display_and_service_names_round_trip() {
        let prefixes = ServicePrefixes::default();
        let service = prefixes.service_name(DeviceKind::Rotator, "Tower 1");
        assert_eq!(service, "shackbus.rotator.Tower_1");
        assert_eq!(display_name(&service), "Tower 1");
    }

    #[test]
    fn classify_by_prefix() {
        let prefixes = ServicePrefixes::default();
        assert_eq!(
            prefixes.classify("shackbus.rotator.Tower_1"),
            Some(DeviceKind::Rotator)
        );
        assert_eq!(
            prefixes.classify("shackbus.switch.Stackmatch"),
            Some(DeviceKind::Switch)
        );
        assert_eq!(prefixes.classify("shackbus.radio.IC7300"), None);
        assert_eq!(prefixes.classify("shackbus.rotator."), None);
        assert_eq!(prefixes.classify("other.shackbus.rotator.X"), None);
    }
}
