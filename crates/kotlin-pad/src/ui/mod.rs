//! UI components for the scratchpad
//!
//! Editor on top, console below, status bar at the bottom.

pub mod console_pane;
pub mod editor_pane;
pub mod highlight;
pub mod layout;
