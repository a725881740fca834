/// Persisted panel width and its viewport bounds.
pub mod preference;
pub mod resize;
/// Wheel ownership and follow-to-bottom for the open panel.
pub mod scroll;

pub use preference::{
    PANEL_MAX_VIEWPORT_RATIO, PANEL_MIN_WIDTH, PANEL_WIDTH_KEY, PanelLayoutPreference,
    PanelWidthPreference, is_width_allowed, width_bounds,
};
pub use resize::{DragSession, PanelWidth, RESIZE_BREAKPOINT, ResizeController};
pub use scroll::{Overflow, PanelViewport, ScrollArbiter, WheelRouting};
