/// A key as reported by the host's `keydown` event
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    /// A printable character
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    /// Anything else (function keys, arrows left/right, Home, ...)
    Other,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        alt: false,
        shift: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    /// Ctrl or Meta held, i.e. a shortcut chord
    pub fn is_chord(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    /// A character that should be typed into the prompt buffer
    pub fn printable(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.modifiers.ctrl && !self.modifiers.meta && !self.modifiers.alt => {
                Some(c)
            }
            _ => None,
        }
    }
}

/// Decides which modifier is the "primary" one for the submit shortcut
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    /// Cmd
    Apple,
    /// Ctrl
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Platform::Apple
        } else {
            Platform::Other
        }
    }

    pub fn primary_held(&self, modifiers: &Modifiers) -> bool {
        match self {
            Platform::Apple => modifiers.meta,
            Platform::Other => modifiers.ctrl,
        }
    }

    pub fn submit_shortcut(&self) -> &'static str {
        match self {
            Platform::Apple => "⌘↵",
            Platform::Other => "Ctrl+Enter",
        }
    }

    pub fn is_submit(&self, press: &KeyPress) -> bool {
        press.key == Key::Enter && self.primary_held(&press.modifiers)
    }
}
