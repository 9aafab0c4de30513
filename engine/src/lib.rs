//! In-page text expansion engine.
//!
//! Watches every editable surface of a [`Document`], detects `//token` triggers at the caret,
//! shows the matching overlay, and splices the chosen text back over the trigger.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod caret_geometry;
pub mod dom;
mod event;
mod expander;
pub mod menu;
pub mod resolver;
pub mod splice;
mod store;
pub mod surface;
pub mod text_formatting;
pub mod trigger;
pub mod watcher;

pub use dom::Document;
pub use dom::DomError;
pub use dom::NodeId;
pub use event::EventOutcome;
pub use event::HostEvent;
pub use event::Key;
pub use expander::Expander;
pub use expander::ExpanderConfig;
pub use menu::ActiveMenu;
pub use resolver::MatchMode;
pub use resolver::Resolution;
pub use resolver::resolve;
pub use store::Store;
pub use trigger::Trigger;
pub use trigger::detect_trigger;
