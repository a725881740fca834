/// Overflow mode applied to the panel's inner scroll regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Auto,
    Hidden,
}

/// Which surface a wheel gesture should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelRouting {
    /// Scroll panel content and stop the event from reaching the host page.
    Panel,
    Host,
}

/// Host-side handle on the open panel's DOM-like viewport.
pub trait PanelViewport {
    fn attach_listeners(&mut self);
    fn detach_listeners(&mut self);
    fn set_inner_overflow(&mut self, overflow: Overflow);
    fn max_scroll_offset(&self) -> f32;
    fn set_scroll_offset(&mut self, offset: f32);
}

/// Arbitrates wheel ownership between the open panel and the page behind it.
///
/// Attaching acquires the viewport's listeners; dropping (or [`ScrollArbiter::detach`])
/// releases them and restores default overflow so a later reopen starts clean.
pub struct ScrollArbiter<V: PanelViewport> {
    viewport: Option<V>,
    pointer_over_panel: bool,
    message_generation: u64,
    message_count: usize,
    pending_scroll_to_bottom: bool,
}

impl<V: PanelViewport> ScrollArbiter<V> {
    pub fn attach(mut viewport: V) -> Self {
        viewport.attach_listeners();
        // The pointer is assumed outside until the first enter event.
        viewport.set_inner_overflow(Overflow::Hidden);
        Self {
            viewport: Some(viewport),
            pointer_over_panel: false,
            message_generation: 0,
            message_count: 0,
            pending_scroll_to_bottom: false,
        }
    }

    pub fn viewport(&self) -> Option<&V> {
        self.viewport.as_ref()
    }

    pub fn is_pointer_over_panel(&self) -> bool {
        self.pointer_over_panel
    }

    pub fn pointer_entered(&mut self) {
        self.pointer_over_panel = true;
        self.set_overflow(Overflow::Auto);
    }

    pub fn pointer_left(&mut self) {
        self.pointer_over_panel = false;
        self.set_overflow(Overflow::Hidden);
    }

    pub fn route_wheel(&self) -> WheelRouting {
        if self.pointer_over_panel {
            WheelRouting::Panel
        } else {
            WheelRouting::Host
        }
    }

    /// Records the latest message list shape.
    ///
    /// Growth within a generation, or a non-empty list from a new generation, schedules a
    /// snap to the bottom. A replaced list is detected even when its length is unchanged.
    pub fn on_messages_changed(&mut self, generation: u64, message_count: usize) {
        let replaced = generation != self.message_generation;
        if message_count > 0 && (replaced || message_count > self.message_count) {
            self.pending_scroll_to_bottom = true;
        }
        self.message_generation = generation;
        self.message_count = message_count;
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll_to_bottom
    }

    /// Call after layout so the maximum offset already includes the new message.
    pub fn apply_pending_scroll(&mut self) -> bool {
        if !self.pending_scroll_to_bottom {
            return false;
        }
        self.pending_scroll_to_bottom = false;

        let Some(viewport) = self.viewport.as_mut() else {
            return false;
        };
        let max_offset = viewport.max_scroll_offset().max(0.0);
        viewport.set_scroll_offset(max_offset);
        true
    }

    /// Closes the panel side of the arbitration and hands the viewport back.
    pub fn detach(mut self) -> Option<V> {
        self.release()
    }

    fn set_overflow(&mut self, overflow: Overflow) {
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.set_inner_overflow(overflow);
        }
    }

    fn release(&mut self) -> Option<V> {
        let mut viewport = self.viewport.take()?;
        viewport.set_inner_overflow(Overflow::default());
        viewport.detach_listeners();
        Some(viewport)
    }
}

impl<V: PanelViewport> Drop for ScrollArbiter<V> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct ViewportLog {
        listeners_attached: bool,
        overflow: Overflow,
        scroll_offset: f32,
        max_offset: f32,
        scroll_writes: usize,
    }

    #[derive(Clone, Default)]
    struct FakeViewport(Rc<RefCell<ViewportLog>>);

    impl FakeViewport {
        fn set_content_height(&self, max_offset: f32) {
            self.0.borrow_mut().max_offset = max_offset;
        }
    }

    impl PanelViewport for FakeViewport {
        fn attach_listeners(&mut self) {
            self.0.borrow_mut().listeners_attached = true;
        }

        fn detach_listeners(&mut self) {
            self.0.borrow_mut().listeners_attached = false;
        }

        fn set_inner_overflow(&mut self, overflow: Overflow) {
            self.0.borrow_mut().overflow = overflow;
        }

        fn max_scroll_offset(&self) -> f32 {
            self.0.borrow().max_offset
        }

        fn set_scroll_offset(&mut self, offset: f32) {
            let mut log = self.0.borrow_mut();
            log.scroll_offset = offset;
            log.scroll_writes += 1;
        }
    }

    #[test]
    fn attach_suspends_inner_scroll_until_pointer_enters() {
        let viewport = FakeViewport::default();
        let mut arbiter = ScrollArbiter::attach(viewport.clone());

        assert!(viewport.0.borrow().listeners_attached);
        assert_eq!(viewport.0.borrow().overflow, Overflow::Hidden);
        assert_eq!(arbiter.route_wheel(), WheelRouting::Host);

        arbiter.pointer_entered();
        assert_eq!(viewport.0.borrow().overflow, Overflow::Auto);
        assert_eq!(arbiter.route_wheel(), WheelRouting::Panel);

        arbiter.pointer_left();
        assert_eq!(viewport.0.borrow().overflow, Overflow::Hidden);
        assert_eq!(arbiter.route_wheel(), WheelRouting::Host);
    }

    #[test]
    fn growth_snaps_to_bottom_after_layout() {
        let viewport = FakeViewport::default();
        let mut arbiter = ScrollArbiter::attach(viewport.clone());

        arbiter.on_messages_changed(0, 1);
        assert!(arbiter.has_pending_scroll());
        // Layout of the new bubble lands before the scroll is applied.
        viewport.set_content_height(320.0);
        assert!(arbiter.apply_pending_scroll());

        assert_eq!(viewport.0.borrow().scroll_offset, 320.0);
        assert!(!arbiter.apply_pending_scroll());
        assert_eq!(viewport.0.borrow().scroll_writes, 1);
    }

    #[test]
    fn unchanged_or_shrinking_list_does_not_scroll() {
        let viewport = FakeViewport::default();
        let mut arbiter = ScrollArbiter::attach(viewport.clone());
        arbiter.on_messages_changed(0, 3);
        arbiter.apply_pending_scroll();

        arbiter.on_messages_changed(0, 3);
        assert!(!arbiter.has_pending_scroll());
        arbiter.on_messages_changed(0, 0);
        assert!(!arbiter.has_pending_scroll());
        arbiter.on_messages_changed(0, 1);
        assert!(arbiter.has_pending_scroll());
    }

    #[test]
    fn replaced_list_of_equal_length_still_snaps() {
        let viewport = FakeViewport::default();
        let mut arbiter = ScrollArbiter::attach(viewport.clone());
        arbiter.on_messages_changed(1, 2);
        assert!(arbiter.apply_pending_scroll());

        // A reopen swapped in a different two-message history.
        arbiter.on_messages_changed(3, 2);
        assert!(arbiter.has_pending_scroll());
        assert!(arbiter.apply_pending_scroll());

        // Cleared then refilled between observations: only the final state is seen.
        arbiter.on_messages_changed(5, 2);
        assert!(arbiter.has_pending_scroll());
    }

    #[test]
    fn replacement_with_an_empty_list_does_not_scroll() {
        let viewport = FakeViewport::default();
        let mut arbiter = ScrollArbiter::attach(viewport.clone());
        arbiter.on_messages_changed(1, 0);

        assert!(!arbiter.has_pending_scroll());
        assert_eq!(viewport.0.borrow().scroll_writes, 0);
    }

    #[test]
    fn drop_restores_overflow_and_removes_listeners() {
        let viewport = FakeViewport::default();
        {
            let mut arbiter = ScrollArbiter::attach(viewport.clone());
            arbiter.pointer_left();
        }

        let log = viewport.0.borrow();
        assert!(!log.listeners_attached);
        assert_eq!(log.overflow, Overflow::Auto);
    }

    #[test]
    fn detach_returns_clean_viewport_for_reopen() {
        let viewport = FakeViewport::default();
        let arbiter = ScrollArbiter::attach(viewport.clone());

        let returned = arbiter.detach().expect("viewport handed back");
        assert!(!returned.0.borrow().listeners_attached);
        assert_eq!(returned.0.borrow().overflow, Overflow::Auto);

        let reopened = ScrollArbiter::attach(returned);
        assert!(viewport.0.borrow().listeners_attached);
        drop(reopened);
        assert!(!viewport.0.borrow().listeners_attached);
    }
}
