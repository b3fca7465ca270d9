use super::events::{MouseDown, MouseEvent, MouseMove, MouseUp, MouseWheel};

/// Subscriber to the normalized mouse events the dispatcher produces. All
/// methods default to doing nothing so a subscriber only overrides what it
/// needs.
pub trait MouseHandler: Send {
    fn on_mouse_down(&mut self, _event: &MouseDown) {}
    fn on_mouse_up(&mut self, _event: &MouseUp) {}
    fn on_mouse_move(&mut self, _event: &MouseMove) {}
    fn on_mouse_wheel(&mut self, _event: &MouseWheel) {}
    /// The dispatcher is exiting; no further events will arrive.
    fn on_shutdown(&mut self) {}
}

/// Ordered multicast of mouse events. Subscribers are notified in
/// registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn MouseHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn MouseHandler>) {
        self.handlers.push(handler);
    }

    pub fn with(mut self, handler: Box<dyn MouseHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn on_mouse_down(&mut self, event: &MouseDown) {
        for handler in &mut self.handlers {
            handler.on_mouse_down(event);
        }
    }

    pub fn on_mouse_up(&mut self, event: &MouseUp) {
        for handler in &mut self.handlers {
            handler.on_mouse_up(event);
        }
    }

    pub fn on_mouse_move(&mut self, event: &MouseMove) {
        for handler in &mut self.handlers {
            handler.on_mouse_move(event);
        }
    }

    pub fn on_mouse_wheel(&mut self, event: &MouseWheel) {
        for handler in &mut self.handlers {
            handler.on_mouse_wheel(event);
        }
    }

    pub fn shutdown(&mut self) {
        for handler in &mut self.handlers {
            handler.on_shutdown();
        }
    }

    pub fn notify(&mut self, event: &MouseEvent) {
        match event {
            MouseEvent::Down(ev) => self.on_mouse_down(ev),
            MouseEvent::Up(ev) => self.on_mouse_up(ev),
            MouseEvent::Move(ev) => self.on_mouse_move(ev),
            MouseEvent::Wheel(ev) => self.on_mouse_wheel(ev),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

/// Logs every event that reaches the dispatcher.
#[derive(Debug, Default)]
pub struct DiagnosticsHandler;

impl MouseHandler for DiagnosticsHandler {
    fn on_mouse_down(&mut self, event: &MouseDown) {
        tracing::debug!(
            button = %event.button,
            x = event.point.x,
            y = event.point.y,
            window = event.window.0,
            intercepted = event.intercepted,
            "mouse down"
        );
    }

    fn on_mouse_up(&mut self, event: &MouseUp) {
        tracing::debug!(
            button = %event.button,
            x = event.point.x,
            y = event.point.y,
            "mouse up"
        );
    }

    fn on_mouse_move(&mut self, event: &MouseMove) {
        tracing::trace!(x = event.point.x, y = event.point.y, "mouse move");
    }

    fn on_mouse_wheel(&mut self, event: &MouseWheel) {
        tracing::debug!(
            delta = event.delta,
            axis = ?event.axis,
            x = event.point.x,
            y = event.point.y,
            window = event.window.0,
            "mouse wheel"
        );
    }
}
