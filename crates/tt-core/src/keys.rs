//! Key classification and the correction skip policy.
//!
//! Key names follow the DOM `KeyboardEvent.key` values; the host passes them
//! through unchanged.

/// A logical key, decoded from its DOM name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Backspace,
    Delete,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    /// Any other named key (`"Shift"`, `"F5"`, ...).
    Named(String),
    /// Empty or undecodable key name.
    Unidentified,
}

impl Key {
    pub fn from_dom(name: &str) -> Self {
        match name {
            "Tab" => Self::Tab,
            "Enter" => Self::Enter,
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Escape" | "Esc" => Self::Escape,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "Spacebar" => Self::Char(' '),
            "" | "Unidentified" | "Dead" => Self::Unidentified,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Named(name.to_string()),
                }
            }
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::Backspace | Self::Delete)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.meta || self.alt || self.shift)
    }

    /// The platform command modifier: Ctrl on most systems, Cmd on macOS.
    /// The host reports whichever was held, so either counts.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::none())
    }

    pub fn from_dom(name: &str, modifiers: Modifiers) -> Self {
        Self::new(Key::from_dom(name), modifiers)
    }

    /// Command+Z (undo) or Command+Shift+Z (redo on some platforms).
    pub fn is_undo(&self) -> bool {
        self.modifiers.command() && matches!(self.key, Key::Char('z' | 'Z'))
    }

    /// A bare key press: no modifier held.
    pub fn is_plain(&self, key: &Key) -> bool {
        self.modifiers.is_empty() && &self.key == key
    }
}

/// What caused a text change: the last key pressed in the field and the DOM
/// `InputEvent.inputType`, either of which the host may not know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputTrigger {
    pub key: Option<KeyEvent>,
    pub input_type: Option<String>,
}

impl InputTrigger {
    pub fn key(key: KeyEvent) -> Self {
        Self {
            key: Some(key),
            input_type: None,
        }
    }

    pub fn input_type(input_type: &str) -> Self {
        Self {
            key: None,
            input_type: Some(input_type.to_string()),
        }
    }

    pub fn is_undo(&self) -> bool {
        self.key.as_ref().is_some_and(KeyEvent::is_undo)
            || matches!(
                self.input_type.as_deref(),
                Some("historyUndo" | "historyRedo")
            )
    }

    pub fn is_deletion(&self) -> bool {
        self.key.as_ref().is_some_and(|k| k.key.is_deletion())
            || self
                .input_type
                .as_deref()
                .is_some_and(|t| t.starts_with("delete"))
    }
}

/// Text ends at a word boundary (or is empty): the word in progress is finished.
pub fn ends_at_boundary(text: &str) -> bool {
    match text.chars().next_back() {
        None => true,
        Some(c) => c.is_whitespace(),
    }
}

/// Text where a next-word suggestion is wanted: ends with a space, or empty.
pub fn wants_prediction(text: &str) -> bool {
    text.is_empty() || text.ends_with(' ')
}

/// Reason a text change does not schedule a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Undo,
    Deletion,
    Boundary,
}

/// Skip policy for corrections. Returns `None` when a correction should be scheduled.
pub fn correction_skip(trigger: &InputTrigger, text: &str) -> Option<SkipReason> {
    if trigger.is_undo() {
        Some(SkipReason::Undo)
    } else if trigger.is_deletion() {
        Some(SkipReason::Deletion)
    } else if ends_at_boundary(text) {
        Some(SkipReason::Boundary)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Modifiers::none()
        }
    }

    #[test]
    fn test_key_from_dom() {
        assert_eq!(Key::from_dom("Tab"), Key::Tab);
        assert_eq!(Key::from_dom("a"), Key::Char('a'));
        assert_eq!(Key::from_dom(" "), Key::Char(' '));
        assert_eq!(Key::from_dom("é"), Key::Char('é'));
        assert_eq!(Key::from_dom("Shift"), Key::Named("Shift".to_string()));
        assert_eq!(Key::from_dom(""), Key::Unidentified);
        assert_eq!(Key::from_dom("Dead"), Key::Unidentified);
    }

    #[test]
    fn test_undo_detection() {
        assert!(KeyEvent::from_dom("z", ctrl()).is_undo());
        let meta = Modifiers {
            meta: true,
            shift: true,
            ..Modifiers::none()
        };
        assert!(KeyEvent::from_dom("Z", meta).is_undo());
        assert!(!KeyEvent::from_dom("z", Modifiers::none()).is_undo());
        assert!(!KeyEvent::from_dom("y", ctrl()).is_undo());
        assert!(InputTrigger::input_type("historyUndo").is_undo());
    }

    #[test]
    fn test_deletion_detection() {
        assert!(InputTrigger::key(KeyEvent::plain(Key::Backspace)).is_deletion());
        assert!(InputTrigger::key(KeyEvent::plain(Key::Delete)).is_deletion());
        assert!(InputTrigger::input_type("deleteContentBackward").is_deletion());
        assert!(InputTrigger::input_type("deleteWordForward").is_deletion());
        assert!(!InputTrigger::input_type("insertText").is_deletion());
        assert!(!InputTrigger::default().is_deletion());
    }

    #[test]
    fn test_boundaries() {
        assert!(ends_at_boundary(""));
        assert!(ends_at_boundary("word "));
        assert!(ends_at_boundary("line\n"));
        assert!(ends_at_boundary("cell\t"));
        assert!(!ends_at_boundary("word"));

        assert!(wants_prediction(""));
        assert!(wants_prediction("I like "));
        assert!(!wants_prediction("I like\n"));
        assert!(!wants_prediction("I like"));
    }

    #[test]
    fn test_correction_skip() {
        let typing = InputTrigger::key(KeyEvent::plain(Key::Char('g')));
        assert_eq!(correction_skip(&typing, "I am gong"), None);
        assert_eq!(
            correction_skip(&typing, "I am gong "),
            Some(SkipReason::Boundary)
        );
        assert_eq!(correction_skip(&typing, ""), Some(SkipReason::Boundary));

        let backspace = InputTrigger::key(KeyEvent::plain(Key::Backspace));
        assert_eq!(
            correction_skip(&backspace, "I am gon"),
            Some(SkipReason::Deletion)
        );

        let undo = InputTrigger::key(KeyEvent::from_dom("z", ctrl()));
        assert_eq!(correction_skip(&undo, "I am gon"), Some(SkipReason::Undo));
    }
}
