//! Synchronous half of the hook: decides, inside the OS callback, whether an
//! input event is swallowed.
//!
//! Everything here runs on a thread we do not own while the system input
//! queue waits for us. Only atomics in [`SharedState`] are touched; window
//! queries and window placement are left to the dispatcher thread because
//! those calls can pump messages and re-enter the hook.

use super::dispatcher::DispatchPoster;
use super::events::{MouseButton, RawMouseKind, RawMouseMessage};
use super::state::SharedState;
use crate::settings::DragBindings;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    PassThrough,
    Suppress,
}

impl Verdict {
    pub fn is_suppress(self) -> bool {
        self == Verdict::Suppress
    }

    fn from_suppress(suppress: bool) -> Self {
        if suppress {
            Verdict::Suppress
        } else {
            Verdict::PassThrough
        }
    }
}

#[derive(Debug)]
pub struct InputInterceptor {
    shared: Arc<SharedState>,
    bindings: DragBindings,
    poster: Mutex<Option<DispatchPoster>>,
}

impl InputInterceptor {
    pub fn new(shared: Arc<SharedState>, bindings: DragBindings) -> Self {
        Self {
            shared,
            bindings,
            poster: Mutex::new(None),
        }
    }

    pub fn bindings(&self) -> DragBindings {
        self.bindings
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Connect (or disconnect, with `None`) the queue recognized mouse events
    /// are posted to. Without one the interceptor still returns verdicts but
    /// no window action runs.
    pub fn set_poster(&self, poster: Option<DispatchPoster>) {
        match self.poster.lock() {
            Ok(mut guard) => *guard = poster,
            Err(err) => tracing::error!(?err, "failed to lock dispatcher poster"),
        }
    }

    pub fn has_poster(&self) -> bool {
        self.poster
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Mouse hook entry point.
    pub fn on_mouse(&self, raw: RawMouseMessage) -> Verdict {
        let Some(kind) = raw.kind() else {
            return Verdict::PassThrough;
        };
        let verdict = match kind {
            RawMouseKind::ButtonDown(button) => self.button_down(button),
            RawMouseKind::ButtonUp(button) => self.button_up(button),
            RawMouseKind::Move => Verdict::from_suppress(self.shared.claimed_button().is_some()),
            RawMouseKind::Wheel(_) => Verdict::PassThrough,
        };
        self.post(raw, verdict);
        verdict
    }

    /// Keyboard hook entry point. `modifier_down` is the modifier state right
    /// after the event; callers only invoke this for events of the modifier
    /// key itself.
    pub fn on_modifier(&self, modifier_down: bool) -> Verdict {
        let was_down = self.shared.swap_modifier_down(modifier_down);
        if was_down && !modifier_down {
            // Swallow the release after a drag so the foreground app does not
            // react to a lone modifier tap (Alt opening the menu bar).
            let dragged = self.shared.have_dragged();
            tracing::debug!(dragged, "modifier released");
            return Verdict::from_suppress(dragged);
        }
        if !was_down && modifier_down {
            tracing::debug!("modifier pressed");
            self.shared.set_have_dragged(false);
        }
        Verdict::PassThrough
    }

    fn button_down(&self, button: MouseButton) -> Verdict {
        if !self.shared.modifier_down() || !self.bindings.is_bound(button) {
            return Verdict::PassThrough;
        }
        if !self.shared.try_claim(button) {
            // A session is already running; never nest.
            return Verdict::PassThrough;
        }
        self.shared.set_have_dragged(true);
        Verdict::Suppress
    }

    fn button_up(&self, button: MouseButton) -> Verdict {
        Verdict::from_suppress(self.shared.release_claim(button))
    }

    fn post(&self, raw: RawMouseMessage, verdict: Verdict) {
        if let Ok(guard) = self.poster.lock() {
            if let Some(poster) = guard.as_ref() {
                poster.post(raw, verdict.is_suppress());
            }
        }
    }
}
