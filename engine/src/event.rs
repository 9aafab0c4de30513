use crate::dom::NodeId;
use crate::dom::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    ArrowUp,
    ArrowDown,
    Char(char),
    Other,
}

/// Events a host delivers to the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The value or text of `target` changed through native editing.
    Input { target: NodeId },
    KeyDown { target: NodeId, key: Key },
    MouseDown { target: NodeId },
    Click { target: NodeId },
    MouseEnter { target: NodeId },
    MouseLeave { target: NodeId },
    /// Focus moved onto `target`.
    FocusIn { target: NodeId },
    Copy,
    Timer(TimerId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// The host should suppress the event's default action.
    pub prevent_default: bool,
}

impl EventOutcome {
    pub fn handled() -> Self {
        Self {
            prevent_default: true,
        }
    }

    pub fn ignored() -> Self {
        Self::default()
    }
}
