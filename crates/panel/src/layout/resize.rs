use crate::settings::{KeyValueStore, PreferenceResult};

use super::preference::{PanelLayoutPreference, PanelWidthPreference, width_bounds};

/// Viewports narrower than this render the panel full-width with resizing disabled.
pub const RESIZE_BREAKPOINT: u32 = 768;

/// Width the host should apply to the panel container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelWidth {
    FullViewport,
    /// The stylesheet default.
    Default,
    Pixels(u32),
}

/// Converts pointer drags on the panel's leading edge into a persisted width.
pub struct ResizeController<S: KeyValueStore> {
    preference: PanelWidthPreference<S>,
    viewport_width: u32,
    width: Option<u32>,
    resizing: bool,
}

impl<S: KeyValueStore> ResizeController<S> {
    /// Reads the stored preference once; an out-of-range value silently becomes the default.
    pub fn mount(preference: PanelWidthPreference<S>, viewport_width: u32) -> Self {
        let width = preference.read(viewport_width).width_pixels;
        Self {
            preference,
            viewport_width,
            width,
            resizing: false,
        }
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    /// Applies a new viewport. A width that no longer fits falls back to the default.
    ///
    /// The stored value is left alone so a later mount at a wider viewport can restore it.
    pub fn set_viewport_width(&mut self, viewport_width: u32) {
        self.viewport_width = viewport_width;
        let fitted = self.layout_preference().validated(viewport_width);
        if fitted.width_pixels != self.width {
            tracing::debug!(
                width = ?self.width,
                viewport_width,
                "panel width no longer fits the viewport"
            );
            self.width = fitted.width_pixels;
        }
    }

    pub fn is_resizable(&self) -> bool {
        self.viewport_width >= RESIZE_BREAKPOINT
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing
    }

    /// Width easing is disabled while dragging so the edge tracks the pointer directly.
    pub fn animates_width(&self) -> bool {
        !self.resizing
    }

    pub fn layout_preference(&self) -> PanelLayoutPreference {
        PanelLayoutPreference {
            width_pixels: self.width,
        }
    }

    pub fn effective_width(&self) -> PanelWidth {
        if !self.is_resizable() {
            return PanelWidth::FullViewport;
        }
        match self.width {
            Some(width) => PanelWidth::Pixels(width),
            None => PanelWidth::Default,
        }
    }

    /// Starts a drag gesture. Returns `None` below the breakpoint.
    ///
    /// The returned session ends the drag and persists the width when finished or dropped.
    pub fn begin_drag(&mut self) -> Option<DragSession<'_, S>> {
        if !self.is_resizable() {
            return None;
        }
        self.resizing = true;
        Some(DragSession {
            controller: self,
            finished: false,
        })
    }

    /// Reverts to the default width and forgets the stored value.
    pub fn reset_width(&mut self) -> PreferenceResult<()> {
        self.width = None;
        self.preference.clear()
    }

    fn accept_pointer(&mut self, pointer_x: f32) -> bool {
        let candidate = self.viewport_width as f32 - pointer_x;
        // Out-of-range moves keep the previous width instead of pinning to the edge.
        if !width_bounds(self.viewport_width).contains(&candidate) {
            return false;
        }
        self.width = Some(candidate.floor() as u32);
        true
    }

    fn end_drag(&mut self) -> PreferenceResult<PanelLayoutPreference> {
        self.resizing = false;
        let preference = self.layout_preference().validated(self.viewport_width);
        self.width = preference.width_pixels;
        if preference.width_pixels.is_some() {
            self.preference.write(preference)?;
        }
        Ok(preference)
    }
}

/// One in-progress drag gesture.
pub struct DragSession<'a, S: KeyValueStore> {
    controller: &'a mut ResizeController<S>,
    finished: bool,
}

impl<S: KeyValueStore> DragSession<'_, S> {
    /// Applies the latest pointer position. Returns whether the width changed.
    pub fn pointer_moved(&mut self, pointer_x: f32) -> bool {
        self.controller.accept_pointer(pointer_x)
    }

    pub fn width(&self) -> Option<u32> {
        self.controller.width
    }

    pub fn finish(mut self) -> PreferenceResult<PanelLayoutPreference> {
        self.finished = true;
        self.controller.end_drag()
    }
}

impl<S: KeyValueStore> Drop for DragSession<'_, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(error) = self.controller.end_drag() {
            tracing::warn!(error = %error, "failed to persist panel width after interrupted drag");
        }
    }
}
