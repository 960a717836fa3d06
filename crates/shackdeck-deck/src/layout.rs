//! Declarative page layouts, as loaded from configuration.
//!
//! ```toml
//! [[pages]]
//! id = "main"
//! buttons = [
//!   { kind = "label", position = 0, text = "BANDS", next = "bands" },
//!   { kind = "rotator", position = 1, device = "Tower 1" },
//!   { kind = "terminal", position = 2, device = "Stack Match", port = "SM", terminal = "OB11", text = "OB11" },
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// One page of the navigation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    pub id: String,
    /// Page reached by a device page's BACK, and by presets two levels up.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub buttons: Vec<ButtonLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ButtonLayout {
    /// Static text, optionally navigating on release.
    Label {
        position: usize,
        #[serde(default)]
        text: String,
        #[serde(default)]
        next: Option<String>,
    },
    /// Live heading of a rotator. Short press opens its control page, long
    /// press follows `next` when set.
    Rotator {
        position: usize,
        device: String,
        #[serde(default)]
        next: Option<String>,
    },
    /// One terminal of a switch port. Short press toggles, long press turns
    /// on and follows `next`.
    Terminal {
        position: usize,
        device: String,
        port: String,
        terminal: String,
        /// Defaults to the terminal name.
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        next: Option<String>,
    },
}

impl ButtonLayout {
    pub fn position(&self) -> usize {
        match self {
            Self::Label { position, .. }
            | Self::Rotator { position, .. }
            | Self::Terminal { position, .. } => *position,
        }
    }

    /// Navigation edge, if any.
    pub fn next(&self) -> Option<&str> {
        match self {
            Self::Label { next, .. }
            | Self::Rotator { next, .. }
            | Self::Terminal { next, .. } => next.as_deref(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Deserialize)]
    struct Doc {
        pages: Vec<PageLayout>,
    }

    #[test]
    fn parses_tagged_buttons() {
        let doc: Doc = toml::from_str(
            r#"
            [[pages]]
            id = "main"
            buttons = [
              { kind = "label", position = 0, text = "BANDS", next = "bands" },
              { kind = "rotator", position = 1, device = "Tower 1" },
              { kind = "terminal", position = 2, device = "SM", port = "SM", terminal = "OB11" },
            ]

            [[pages]]
            id = "bands"
            parent = "main"
            "#,
        )
        .unwrap();

        let main = &doc.pages[0];
        assert_eq!(main.parent, None);
        assert_eq!(main.buttons.len(), 3);
        assert_eq!(main.buttons[0].next(), Some("bands"));
        assert_eq!(
            main.buttons[1],
            ButtonLayout::Rotator {
                position: 1,
                device: "Tower 1".into(),
                next: None,
            }
        );
        assert_eq!(main.buttons[2].position(), 2);
        assert_eq!(doc.pages[1].parent.as_deref(), Some("main"));
        assert!(doc.pages[1].buttons.is_empty());
    }
}
