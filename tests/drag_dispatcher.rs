
use drag_anywhere::drag::{
    DispatchError, Dispatcher, HandlerRegistry, MouseButton, MouseDown, MouseEvent, MouseHandler,
    MouseMove, MouseUp, MouseWheel, Point, RawMouseMessage, WindowId, WindowLocator,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE,
};
use mock_windows::{wait_for, MockLocator};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<MouseEvent>>>);

impl Recorder {
    fn events(&self) -> Vec<MouseEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl MouseHandler for Recorder {
    fn on_mouse_down(&mut self, event: &MouseDown) {
        self.0.lock().unwrap().push(MouseEvent::Down(*event));
    }
    fn on_mouse_up(&mut self, event: &MouseUp) {
        self.0.lock().unwrap().push(MouseEvent::Up(*event));
    }
    fn on_mouse_move(&mut self, event: &MouseMove) {
        self.0.lock().unwrap().push(MouseEvent::Move(*event));
    }
    fn on_mouse_wheel(&mut self, event: &MouseWheel) {
        self.0.lock().unwrap().push(MouseEvent::Wheel(*event));
    }
}

fn dispatcher(window: WindowId) -> (Dispatcher, Recorder, Arc<MockLocator>) {
    let recorder = Recorder::default();
    let locator = Arc::new(MockLocator::new(window));
    let registry = HandlerRegistry::new().with(Box::new(recorder.clone()));
    let shared: Arc<dyn WindowLocator> = locator.clone();
    (Dispatcher::new(registry, shared), recorder, locator)
}

#[test]
fn delivers_posted_messages_in_order() {
    let (mut dispatcher, recorder, _locator) = dispatcher(WindowId(7));
    dispatcher.start().unwrap();

    let poster = dispatcher.poster();
    poster.post(RawMouseMessage::new(WM_LBUTTONDOWN, Point::new(1, 1)), true);
    for x in 2..=20 {
        poster.post(RawMouseMessage::new(WM_MOUSEMOVE, Point::new(x, 1)), true);
    }
    poster.post(RawMouseMessage::new(WM_LBUTTONUP, Point::new(20, 1)), true);

    assert!(wait_for(|| recorder.events().len() == 21));
    let events = recorder.events();
    assert!(matches!(events[0], MouseEvent::Down(_)));
    assert!(matches!(events[20], MouseEvent::Up(_)));
    let xs: Vec<i32> = events.iter().map(|ev| ev.point().x).collect();
    let mut sorted = xs.clone();
    sorted.sort();
    assert_eq!(xs, sorted);

    dispatcher.stop().unwrap();
}

#[test]
fn window_is_resolved_when_the_message_is_delivered() {
    let (mut dispatcher, recorder, locator) = dispatcher(WindowId(1));

    // Queued before the worker exists, so the locator changes in between.
    dispatcher.post(RawMouseMessage::new(WM_LBUTTONDOWN, Point::new(3, 4)), true);
    locator.set_window(WindowId(2));
    dispatcher.start().unwrap();

    assert!(wait_for(|| recorder.events().len() == 1));
    assert_eq!(
        recorder.events()[0],
        MouseEvent::Down(MouseDown {
            button: MouseButton::Left,
            point: Point::new(3, 4),
            window: WindowId(2),
            intercepted: true,
        })
    );
    dispatcher.stop().unwrap();
}

#[test]
fn start_is_idempotent_and_stop_joins() {
    let (mut dispatcher, _recorder, _locator) = dispatcher(WindowId(1));

    dispatcher.start().unwrap();
    dispatcher.start().unwrap();
    assert!(dispatcher.is_running());

    dispatcher.stop().unwrap();
    assert!(!dispatcher.is_running());
    assert!(matches!(
        dispatcher.start(),
        Err(DispatchError::AlreadyStopped)
    ));
}

#[test]
fn posting_after_stop_is_harmless() {
    let (mut dispatcher, recorder, _locator) = dispatcher(WindowId(1));
    dispatcher.start().unwrap();
    let poster = dispatcher.poster();
    dispatcher.stop().unwrap();

    poster.post(RawMouseMessage::new(WM_LBUTTONDOWN, Point::default()), false);
    assert!(recorder.events().is_empty());
}
