use super::events::{MouseButton, WindowId};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragSessionState {
    #[default]
    None,
    Moving,
    Resizing,
    Ignoring,
}

impl DragSessionState {
    fn as_u8(self) -> u8 {
        match self {
            DragSessionState::None => 0,
            DragSessionState::Moving => 1,
            DragSessionState::Resizing => 2,
            DragSessionState::Ignoring => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => DragSessionState::Moving,
            2 => DragSessionState::Resizing,
            3 => DragSessionState::Ignoring,
            _ => DragSessionState::None,
        }
    }

    pub fn is_active(self) -> bool {
        self != DragSessionState::None
    }
}

const NO_BUTTON: u8 = 0;

/// Process-wide drag state, shared by reference between the hook callbacks
/// and the dispatcher thread.
///
/// Every field is an atomic holding a plain value so the hook callbacks never
/// take a lock. Ownership of the writes:
///
/// * the interceptor writes `modifier_down`, `have_dragged` and the claimed
///   button gate;
/// * the drag state machine writes `drag_state`, `dragging_button` and
///   `last_foreground_window`.
#[derive(Debug, Default)]
pub struct SharedState {
    modifier_down: AtomicBool,
    have_dragged: AtomicBool,
    claimed_button: AtomicU8,
    drag_state: AtomicU8,
    dragging_button: AtomicU8,
    last_foreground_window: AtomicIsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedSnapshot {
    pub modifier_down: bool,
    pub have_dragged: bool,
    pub claimed_button: Option<MouseButton>,
    pub drag_state: DragSessionState,
    pub dragging_button: Option<MouseButton>,
    pub last_foreground_window: WindowId,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the defaults. Called whenever interception is (re-)enabled.
    pub fn reset(&self) {
        self.modifier_down.store(false, Ordering::Release);
        self.have_dragged.store(false, Ordering::Release);
        self.claimed_button.store(NO_BUTTON, Ordering::Release);
        self.drag_state
            .store(DragSessionState::None.as_u8(), Ordering::Release);
        self.dragging_button.store(NO_BUTTON, Ordering::Release);
        self.last_foreground_window.store(0, Ordering::Release);
    }

    pub fn modifier_down(&self) -> bool {
        self.modifier_down.load(Ordering::Acquire)
    }

    /// Store the new modifier state and return the previous one.
    pub fn swap_modifier_down(&self, down: bool) -> bool {
        self.modifier_down.swap(down, Ordering::AcqRel)
    }

    pub fn have_dragged(&self) -> bool {
        self.have_dragged.load(Ordering::Acquire)
    }

    pub fn set_have_dragged(&self, dragged: bool) {
        self.have_dragged.store(dragged, Ordering::Release);
    }

    pub fn claimed_button(&self) -> Option<MouseButton> {
        MouseButton::from_u8(self.claimed_button.load(Ordering::Acquire))
    }

    /// Claim the session gate for `button`. Fails if another press already
    /// holds it, which is what keeps concurrent presses from opening two
    /// sessions.
    pub fn try_claim(&self, button: MouseButton) -> bool {
        self.claimed_button
            .compare_exchange(NO_BUTTON, button.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the gate if, and only if, `button` holds it.
    pub fn release_claim(&self, button: MouseButton) -> bool {
        self.claimed_button
            .compare_exchange(button.as_u8(), NO_BUTTON, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn drag_state(&self) -> DragSessionState {
        DragSessionState::from_u8(self.drag_state.load(Ordering::Acquire))
    }

    pub fn set_drag_state(&self, state: DragSessionState) {
        self.drag_state.store(state.as_u8(), Ordering::Release);
    }

    /// Only meaningful while [`drag_state`](Self::drag_state) is active.
    pub fn dragging_button(&self) -> Option<MouseButton> {
        MouseButton::from_u8(self.dragging_button.load(Ordering::Acquire))
    }

    pub fn set_dragging_button(&self, button: Option<MouseButton>) {
        let raw = button.map(MouseButton::as_u8).unwrap_or(NO_BUTTON);
        self.dragging_button.store(raw, Ordering::Release);
    }

    pub fn last_foreground_window(&self) -> WindowId {
        WindowId(self.last_foreground_window.load(Ordering::Acquire))
    }

    pub fn set_last_foreground_window(&self, window: WindowId) {
        self.last_foreground_window.store(window.0, Ordering::Release);
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        SharedSnapshot {
            modifier_down: self.modifier_down(),
            have_dragged: self.have_dragged(),
            claimed_button: self.claimed_button(),
            drag_state: self.drag_state(),
            dragging_button: self.dragging_button(),
            last_foreground_window: self.last_foreground_window(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let state = SharedState::new();
        let snapshot = state.snapshot();
        assert!(!snapshot.modifier_down);
        assert!(!snapshot.have_dragged);
        assert_eq!(snapshot.claimed_button, None);
        assert_eq!(snapshot.drag_state, DragSessionState::None);
        assert_eq!(snapshot.dragging_button, None);
    }

    #[test]
    fn claim_is_exclusive_until_released_by_the_same_button() {
        let state = SharedState::new();
        assert!(state.try_claim(MouseButton::Left));
        assert!(!state.try_claim(MouseButton::Right));
        assert!(!state.release_claim(MouseButton::Right));
        assert_eq!(state.claimed_button(), Some(MouseButton::Left));
        assert!(state.release_claim(MouseButton::Left));
        assert_eq!(state.claimed_button(), None);
        assert!(state.try_claim(MouseButton::Right));
    }

    #[test]
    fn swap_reports_previous_modifier_state() {
        let state = SharedState::new();
        assert!(!state.swap_modifier_down(true));
        assert!(state.swap_modifier_down(true));
        assert!(state.swap_modifier_down(false));
        assert!(!state.modifier_down());
    }

    #[test]
    fn reset_clears_everything() {
        let state = SharedState::new();
        state.swap_modifier_down(true);
        state.set_have_dragged(true);
        state.try_claim(MouseButton::Middle);
        state.set_drag_state(DragSessionState::Resizing);
        state.set_dragging_button(Some(MouseButton::Middle));
        state.set_last_foreground_window(WindowId(42));

        state.reset();

        assert_eq!(state.snapshot(), SharedState::new().snapshot());
    }

    #[test]
    fn concurrent_claims_admit_a_single_winner() {
        use std::sync::Arc;

        let state = Arc::new(SharedState::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    let button = if i % 2 == 0 {
                        MouseButton::Left
                    } else {
                        MouseButton::Right
                    };
                    state.try_claim(button)
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
