//! Editable fields: identity, eligibility, and what the host reports about them.

use std::fmt;

/// Host-assigned identity of a document node. Stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node that is an attached editable field.
pub type FieldId = NodeId;

/// The closed set of field kinds the engine augments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `<input type="text">` (also the default when `type` is absent).
    Text,
    /// `<input type="search">`.
    Search,
    /// `<textarea>`.
    TextArea,
}

impl FieldKind {
    /// Classify an element by tag name and `type` attribute.
    /// Returns `None` for everything outside the closed set.
    pub fn classify(tag: &str, input_type: Option<&str>) -> Option<Self> {
        if tag.eq_ignore_ascii_case("textarea") {
            return Some(Self::TextArea);
        }
        if !tag.eq_ignore_ascii_case("input") {
            return None;
        }
        let ty = input_type.map(str::trim).unwrap_or("");
        if ty.is_empty() || ty.eq_ignore_ascii_case("text") {
            Some(Self::Text)
        } else if ty.eq_ignore_ascii_case("search") {
            Some(Self::Search)
        } else {
            None
        }
    }

    pub fn is_multiline(self) -> bool {
        self == Self::TextArea
    }
}

/// Capability check used by the attachment scan.
pub fn is_eligible(tag: &str, input_type: Option<&str>) -> bool {
    FieldKind::classify(tag, input_type).is_some()
}

/// One node of a document subtree, as flattened by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        input_type: Option<String>,
    },
    Text,
    Other,
}

impl NodeInfo {
    pub fn element(id: u64, tag: &str, input_type: Option<&str>) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Element {
                tag: tag.to_string(),
                input_type: input_type.map(str::to_string),
            },
        }
    }

    pub fn text(id: u64) -> Self {
        Self {
            id: NodeId(id),
            kind: NodeKind::Text,
        }
    }

    /// The field kind of this node, if it is an eligible element.
    pub fn field_kind(&self) -> Option<FieldKind> {
        match &self.kind {
            NodeKind::Element { tag, input_type } => {
                FieldKind::classify(tag, input_type.as_deref())
            }
            NodeKind::Text | NodeKind::Other => None,
        }
    }
}

/// Viewport-relative bounding box, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Where a field sits and how it renders text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldGeometry {
    pub rect: Rect,
    /// Computed CSS `font` shorthand of the field.
    pub font: String,
}

/// Live state of a field at the moment an event fired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSnapshot {
    pub value: String,
    /// Caret offset in chars.
    pub cursor: usize,
    pub geometry: FieldGeometry,
}

impl FieldSnapshot {
    /// Snapshot with the caret at the end of `value` and no geometry.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            geometry: FieldGeometry::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_closed_set() {
        assert_eq!(FieldKind::classify("input", Some("text")), Some(FieldKind::Text));
        assert_eq!(FieldKind::classify("INPUT", Some("Search")), Some(FieldKind::Search));
        assert_eq!(FieldKind::classify("textarea", None), Some(FieldKind::TextArea));
        assert_eq!(FieldKind::classify("input", None), Some(FieldKind::Text));
        assert_eq!(FieldKind::classify("input", Some("")), Some(FieldKind::Text));
    }

    #[test]
    fn test_classify_excludes_other_kinds() {
        for ty in ["password", "email", "number", "checkbox", "hidden", "url"] {
            assert_eq!(FieldKind::classify("input", Some(ty)), None, "{ty}");
        }
        assert_eq!(FieldKind::classify("div", None), None);
        assert_eq!(FieldKind::classify("select", None), None);
        assert!(!is_eligible("button", Some("text")));
    }

    #[test]
    fn test_node_field_kind() {
        assert_eq!(
            NodeInfo::element(1, "textarea", None).field_kind(),
            Some(FieldKind::TextArea)
        );
        assert_eq!(NodeInfo::text(2).field_kind(), None);
        assert!(FieldKind::TextArea.is_multiline());
        assert!(!FieldKind::Search.is_multiline());
    }

    #[test]
    fn test_snapshot_cursor_at_end() {
        let s = FieldSnapshot::with_value("héllo");
        assert_eq!(s.cursor, 5);
    }
}
