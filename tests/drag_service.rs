
use drag_anywhere::drag::{
    DragService, DragSessionState, MockHookBackend, MockHookHandle, MouseDown, MouseHandler,
    MouseMove, MouseUp, MouseWheel, Point, RawMouseMessage, SharedState, Verdict, WindowId,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_RBUTTONDOWN,
    WM_RBUTTONUP,
};
use drag_anywhere::settings::DragBindings;
use mock_windows::{wait_for, Call, MockLocator, RecordingActions, RecordingFactory};
use std::sync::{Arc, Mutex};

const CHILD: WindowId = WindowId(10);
const ROOT: WindowId = WindowId(20);

/// Registered after the state machine; records the drag state each event
/// left behind.
struct StateProbe {
    shared: Arc<SharedState>,
    seen: Arc<Mutex<Vec<DragSessionState>>>,
}

impl StateProbe {
    fn record(&self) {
        self.seen.lock().unwrap().push(self.shared.drag_state());
    }
}

impl MouseHandler for StateProbe {
    fn on_mouse_down(&mut self, _event: &MouseDown) {
        self.record();
    }
    fn on_mouse_up(&mut self, _event: &MouseUp) {
        self.record();
    }
    fn on_mouse_move(&mut self, _event: &MouseMove) {
        self.record();
    }
    fn on_mouse_wheel(&mut self, _event: &MouseWheel) {
        self.record();
    }
}

struct Harness {
    service: DragService,
    hooks: MockHookHandle,
    actions: RecordingActions,
    seen: Arc<Mutex<Vec<DragSessionState>>>,
}

impl Harness {
    fn new(actions: RecordingActions) -> Self {
        let (backend, hooks) = MockHookBackend::new();
        let locator = MockLocator::new(CHILD).with_root(CHILD, ROOT);
        let mut service = DragService::new_with_parts(
            DragBindings::default(),
            Box::new(backend),
            Arc::new(RecordingFactory(actions.clone())),
            Arc::new(locator),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(service.shared());
        let probe_seen = Arc::clone(&seen);
        service.add_handler(Box::new(move || {
            Box::new(StateProbe {
                shared: Arc::clone(&shared),
                seen: Arc::clone(&probe_seen),
            })
        }));
        service.enable().expect("mock hooks install");
        Self {
            service,
            hooks,
            actions,
            seen,
        }
    }

    fn mouse(&self, code: u32, x: i32, y: i32) -> Verdict {
        self.hooks
            .mouse(RawMouseMessage::new(code, Point::new(x, y)))
            .expect("hook installed")
    }

    fn modifier(&self, down: bool) -> Verdict {
        self.hooks.modifier(down).expect("hook installed")
    }

    fn wait_for_events(&self, count: usize) -> Vec<DragSessionState> {
        assert!(
            wait_for(|| self.seen.lock().unwrap().len() >= count),
            "dispatcher did not deliver {count} events"
        );
        self.seen.lock().unwrap().clone()
    }

    fn state(&self) -> DragSessionState {
        self.service.shared().drag_state()
    }
}

#[test]
fn scenario_a_modifier_drag_moves_the_window() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));

    assert_eq!(h.modifier(true), Verdict::PassThrough);
    assert_eq!(h.mouse(WM_LBUTTONDOWN, 100, 100), Verdict::Suppress);
    assert_eq!(h.mouse(WM_MOUSEMOVE, 150, 120), Verdict::Suppress);
    assert_eq!(h.mouse(WM_LBUTTONUP, 150, 120), Verdict::Suppress);

    let seen = h.wait_for_events(3);
    assert_eq!(
        seen,
        vec![
            DragSessionState::Moving,
            DragSessionState::Moving,
            DragSessionState::None,
        ]
    );
    assert_eq!(
        h.actions.calls(),
        vec![
            Call::StartMove(ROOT, Point::new(100, 100)),
            Call::DoMove(Point::new(150, 120)),
            Call::EndMove,
        ]
    );
    assert_eq!(h.state(), DragSessionState::None);
}

#[test]
fn scenario_b_press_without_modifier_passes_through() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));

    assert_eq!(h.mouse(WM_LBUTTONDOWN, 100, 100), Verdict::PassThrough);
    assert_eq!(h.mouse(WM_MOUSEMOVE, 110, 100), Verdict::PassThrough);
    assert_eq!(h.mouse(WM_LBUTTONUP, 110, 100), Verdict::PassThrough);

    let seen = h.wait_for_events(3);
    assert!(seen.iter().all(|state| *state == DragSessionState::None));
    assert!(h.actions.calls().is_empty());
}

#[test]
fn scenario_c_unplaceable_window_is_ignored_but_swallowed() {
    let h = Harness::new(RecordingActions::new());

    h.modifier(true);
    assert_eq!(h.mouse(WM_RBUTTONDOWN, 5, 5), Verdict::Suppress);
    assert_eq!(h.mouse(WM_MOUSEMOVE, 6, 6), Verdict::Suppress);
    assert_eq!(h.mouse(WM_RBUTTONUP, 6, 6), Verdict::Suppress);

    let seen = h.wait_for_events(3);
    assert_eq!(
        seen,
        vec![
            DragSessionState::Ignoring,
            DragSessionState::Ignoring,
            DragSessionState::None,
        ]
    );
    assert!(h.actions.calls().is_empty());
}

#[test]
fn scenario_d_modifier_release_after_drag_is_swallowed() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));

    h.modifier(true);
    h.mouse(WM_LBUTTONDOWN, 100, 100);
    h.mouse(WM_MOUSEMOVE, 150, 120);
    h.mouse(WM_LBUTTONUP, 150, 120);

    assert_eq!(h.modifier(false), Verdict::Suppress);
}

#[test]
fn scenario_e_modifier_tap_without_drag_passes_through() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));

    h.modifier(true);
    assert_eq!(h.modifier(false), Verdict::PassThrough);
}

#[test]
fn release_of_another_button_during_a_drag_passes_through() {
    let h = Harness::new(RecordingActions::new().movable(ROOT).resizable(ROOT));

    h.modifier(true);
    assert_eq!(h.mouse(WM_LBUTTONDOWN, 0, 0), Verdict::Suppress);
    assert_eq!(h.mouse(WM_RBUTTONDOWN, 0, 0), Verdict::PassThrough);
    assert_eq!(h.mouse(WM_RBUTTONUP, 0, 0), Verdict::PassThrough);
    assert_eq!(h.mouse(WM_LBUTTONUP, 0, 0), Verdict::Suppress);

    h.wait_for_events(4);
    assert_eq!(
        h.actions.calls(),
        vec![Call::StartMove(ROOT, Point::new(0, 0)), Call::EndMove]
    );
}

#[test]
fn unbound_button_and_wheel_pass_through_while_modifier_is_held() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));

    h.modifier(true);
    assert_eq!(h.mouse(WM_MBUTTONDOWN, 0, 0), Verdict::PassThrough);
    let wheel = RawMouseMessage::new(WM_MOUSEWHEEL, Point::new(0, 0)).with_mouse_data(120 << 16);
    assert_eq!(h.hooks.mouse(wheel), Some(Verdict::PassThrough));

    h.wait_for_events(2);
    assert!(h.actions.calls().is_empty());
    // An unbound press is not a drag, so the release still reaches the app.
    assert_eq!(h.modifier(false), Verdict::PassThrough);
}

#[test]
fn enable_and_disable_are_idempotent() {
    let (backend, hooks) = MockHookBackend::new();
    let mut service = DragService::new_with_parts(
        DragBindings::default(),
        Box::new(backend),
        Arc::new(RecordingFactory(RecordingActions::new())),
        Arc::new(MockLocator::new(CHILD)),
    );

    service.enable().unwrap();
    service.enable().unwrap();
    assert_eq!(hooks.install_count(), 1);
    assert!(service.is_enabled());
    assert!(service.is_dispatching());

    service.disable();
    service.disable();
    assert_eq!(hooks.uninstall_count(), 1);
    assert!(!service.is_enabled());
    assert!(!service.is_dispatching());
    assert_eq!(
        hooks.mouse(RawMouseMessage::new(WM_LBUTTONDOWN, Point::default())),
        None
    );
}

#[test]
fn enable_resets_shared_state() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));
    let mut service = h.service;

    h.hooks.modifier(true);
    h.hooks
        .mouse(RawMouseMessage::new(WM_LBUTTONDOWN, Point::default()));
    assert!(service.shared().have_dragged());

    service.disable();
    service.enable().unwrap();

    let snapshot = service.shared().snapshot();
    assert!(!snapshot.modifier_down);
    assert!(!snapshot.have_dragged);
    assert_eq!(snapshot.claimed_button, None);
    assert_eq!(snapshot.drag_state, DragSessionState::None);
}

#[cfg(not(windows))]
#[test]
fn default_backend_refuses_to_install_off_windows() {
    let mut service = DragService::new(DragBindings::default());

    assert!(service.enable().is_err());
    assert!(!service.is_enabled());
    assert!(!service.is_dispatching());
}

#[test]
fn disable_mid_drag_ends_the_session() {
    let mut h = Harness::new(RecordingActions::new().movable(ROOT));

    h.modifier(true);
    h.mouse(WM_LBUTTONDOWN, 100, 100);
    h.mouse(WM_MOUSEMOVE, 120, 100);
    h.wait_for_events(2);

    h.service.disable();

    assert_eq!(
        h.actions.calls(),
        vec![
            Call::StartMove(ROOT, Point::new(100, 100)),
            Call::DoMove(Point::new(120, 100)),
            Call::EndMove,
        ]
    );
    assert_eq!(h.state(), DragSessionState::None);
}

#[test]
fn verdicts_hold_without_a_dispatcher() {
    let h = Harness::new(RecordingActions::new().movable(ROOT));
    // Same as a dispatcher that failed to start: hooks in, nothing posted.
    h.service.interceptor().set_poster(None);
    assert!(!h.service.interceptor().has_poster());

    h.modifier(true);
    assert_eq!(h.mouse(WM_LBUTTONDOWN, 100, 100), Verdict::Suppress);
    assert_eq!(h.mouse(WM_MOUSEMOVE, 150, 120), Verdict::Suppress);
    assert_eq!(h.mouse(WM_LBUTTONUP, 150, 120), Verdict::Suppress);
    assert_eq!(h.modifier(false), Verdict::Suppress);

    assert!(h.service.is_enabled());
    assert!(h.actions.calls().is_empty());
    assert!(h.seen.lock().unwrap().is_empty());
}
