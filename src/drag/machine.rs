use super::actions::{WindowActions, WindowLocator};
use super::events::{MouseDown, MouseMove, MouseUp};
use super::handlers::MouseHandler;
use super::state::{DragSessionState, SharedState};
use crate::settings::DragBindings;
use std::sync::Arc;

/// Turns the normalized event stream into move/resize sessions.
///
/// Runs on the dispatcher thread, after the interceptor has already given the
/// OS its verdict, so it is free to call window APIs that pump messages.
pub struct DragStateMachine {
    shared: Arc<SharedState>,
    bindings: DragBindings,
    actions: Box<dyn WindowActions>,
    locator: Arc<dyn WindowLocator>,
}

impl DragStateMachine {
    pub fn new(
        shared: Arc<SharedState>,
        bindings: DragBindings,
        actions: Box<dyn WindowActions>,
        locator: Arc<dyn WindowLocator>,
    ) -> Self {
        Self {
            shared,
            bindings,
            actions,
            locator,
        }
    }

    pub fn state(&self) -> DragSessionState {
        self.shared.drag_state()
    }

    fn begin(&mut self, event: &MouseDown) {
        let button = event.button;
        let window = self.locator.root_window(event.window);
        tracing::debug!(
            target_window = event.window.0,
            root = window.0,
            "resolved drag target"
        );

        let next = if button == self.bindings.move_button && self.actions.is_movable(window) {
            self.actions.start_move(window, event.point);
            DragSessionState::Moving
        } else if button == self.bindings.resize_button && self.actions.is_resizable(window) {
            self.actions.start_resize(window, event.point);
            DragSessionState::Resizing
        } else {
            // The user asked for a drag, so the window gets nothing until the
            // button comes back up.
            tracing::debug!(
                window = window.0,
                "ignoring drag because the window cannot be moved or resized"
            );
            DragSessionState::Ignoring
        };

        self.shared.set_dragging_button(Some(button));
        self.shared
            .set_last_foreground_window(self.locator.foreground_window());
        self.shared.set_drag_state(next);
        tracing::debug!(button = %button, state = ?next, "drag started");
    }

    fn finish(&mut self, state: DragSessionState) {
        match state {
            DragSessionState::Moving => self.actions.end_move(),
            DragSessionState::Resizing => self.actions.end_resize(),
            DragSessionState::Ignoring | DragSessionState::None => {}
        }
        self.shared.set_drag_state(DragSessionState::None);
        self.shared.set_dragging_button(None);
    }
}

impl MouseHandler for DragStateMachine {
    fn on_mouse_down(&mut self, event: &MouseDown) {
        let state = self.state();
        if state != DragSessionState::None {
            tracing::debug!(?state, "ignoring button down because a drag is in progress");
            return;
        }
        // The interceptor only swallows a press when the modifier is held and
        // the button is bound.
        if !event.intercepted || !self.bindings.is_bound(event.button) {
            return;
        }
        self.begin(event);
    }

    fn on_mouse_up(&mut self, event: &MouseUp) {
        let state = self.state();
        if !state.is_active() || self.shared.dragging_button() != Some(event.button) {
            return;
        }
        self.finish(state);
        tracing::debug!(button = %event.button, ?state, "drag ended");
    }

    fn on_mouse_move(&mut self, event: &MouseMove) {
        match self.state() {
            DragSessionState::Moving => self.actions.do_move(event.point),
            DragSessionState::Resizing => self.actions.do_resize(event.point),
            DragSessionState::Ignoring | DragSessionState::None => {}
        }
    }

    fn on_shutdown(&mut self) {
        let state = self.state();
        if state.is_active() {
            tracing::debug!(?state, "ending drag because the dispatcher stopped");
            self.finish(state);
        }
    }
}

impl std::fmt::Debug for DragStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragStateMachine")
            .field("state", &self.state())
            .field("bindings", &self.bindings)
            .finish()
    }
}
