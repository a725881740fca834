use std::ops::RangeInclusive;

use crate::settings::{KeyValueStore, PreferenceResult};

/// Storage key holding the user's panel width in whole pixels.
pub const PANEL_WIDTH_KEY: &str = "chatPanelWidth";
/// Narrowest width a user may drag the panel to.
pub const PANEL_MIN_WIDTH: u32 = 420;
/// Widest width as a share of the viewport.
pub const PANEL_MAX_VIEWPORT_RATIO: f32 = 0.5;

/// Accepted width range for a viewport. Empty when the viewport is too narrow for any custom width.
pub fn width_bounds(viewport_width: u32) -> RangeInclusive<f32> {
    PANEL_MIN_WIDTH as f32..=viewport_width as f32 * PANEL_MAX_VIEWPORT_RATIO
}

pub fn is_width_allowed(width: u32, viewport_width: u32) -> bool {
    width_bounds(viewport_width).contains(&(width as f32))
}

/// User's panel width choice. `None` means the layout default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelLayoutPreference {
    pub width_pixels: Option<u32>,
}

impl PanelLayoutPreference {
    pub const DEFAULT: Self = Self { width_pixels: None };

    pub fn with_width(width: u32) -> Self {
        Self {
            width_pixels: Some(width),
        }
    }

    /// Drops a width that no longer fits the viewport.
    pub fn validated(self, viewport_width: u32) -> Self {
        match self.width_pixels {
            Some(width) if is_width_allowed(width, viewport_width) => self,
            Some(_) | None => Self::DEFAULT,
        }
    }
}

/// Narrow get/set/clear surface over the key-value store for the panel width.
pub struct PanelWidthPreference<S> {
    store: S,
}

impl<S: KeyValueStore> PanelWidthPreference<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the stored width against the current viewport.
    ///
    /// Malformed or out-of-range values are removed and read as the default. Never fails.
    pub fn read(&self, viewport_width: u32) -> PanelLayoutPreference {
        let Some(raw) = self.store.get(PANEL_WIDTH_KEY) else {
            return PanelLayoutPreference::DEFAULT;
        };

        let parsed = raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|width| *width > 0)
            .map(PanelLayoutPreference::with_width)
            .map(|preference| preference.validated(viewport_width))
            .filter(|preference| preference.width_pixels.is_some());

        match parsed {
            Some(preference) => preference,
            None => {
                tracing::debug!(
                    stored = %raw,
                    viewport_width,
                    "discarding stored panel width outside current bounds"
                );
                if let Err(error) = self.store.remove(PANEL_WIDTH_KEY) {
                    tracing::warn!(error = %error, "failed to remove stale panel width");
                }
                PanelLayoutPreference::DEFAULT
            }
        }
    }

    pub fn write(&self, preference: PanelLayoutPreference) -> PreferenceResult<()> {
        match preference.width_pixels {
            Some(width) => self.store.set(PANEL_WIDTH_KEY, width.to_string()),
            None => self.clear(),
        }
    }

    pub fn clear(&self) -> PreferenceResult<()> {
        self.store.remove(PANEL_WIDTH_KEY)
    }
}
