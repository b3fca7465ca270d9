//! Worker thread that runs everything the hook callbacks are not allowed to.
//!
//! Calls like `GetAncestor` or `SetWindowPos` flush the message queue, which
//! can call straight back into the hook while it is half way through updating
//! its state. The hooks therefore only post here and return.

use super::actions::WindowLocator;
use super::events::{
    MouseDown, MouseEvent, MouseMove, MouseUp, MouseWheel, RawMouseKind, RawMouseMessage,
};
use super::handlers::HandlerRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("dispatcher queue disconnected")]
    QueueDisconnected,
    #[error("dispatcher thread panicked")]
    WorkerPanicked,
    #[error("dispatcher was already stopped")]
    AlreadyStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMessage {
    Mouse {
        raw: RawMouseMessage,
        /// Verdict the interceptor returned for this event.
        suppressed: bool,
    },
    Quit,
}

/// Cloneable, non-blocking handle for posting to the dispatcher from any
/// thread.
#[derive(Debug, Clone)]
pub struct DispatchPoster {
    sender: Sender<DispatchMessage>,
}

impl DispatchPoster {
    pub fn post(&self, raw: RawMouseMessage, suppressed: bool) {
        // A closed queue means the worker has already gone away; the hooks
        // keep producing verdicts without it.
        let _ = self.sender.send(DispatchMessage::Mouse { raw, suppressed });
    }
}

/// Turn a posted message back into a [`MouseEvent`]. The target window is
/// looked up now rather than when the event was posted, because delivery may
/// lag and the window under the cursor has to reflect the current topology.
pub fn normalize(
    raw: &RawMouseMessage,
    suppressed: bool,
    locator: &dyn WindowLocator,
) -> Option<MouseEvent> {
    let event = match raw.kind()? {
        RawMouseKind::ButtonDown(button) => MouseEvent::Down(MouseDown {
            button,
            point: raw.point,
            window: locator.window_at(raw.point),
            intercepted: suppressed,
        }),
        RawMouseKind::ButtonUp(button) => MouseEvent::Up(MouseUp {
            button,
            point: raw.point,
        }),
        RawMouseKind::Move => MouseEvent::Move(MouseMove { point: raw.point }),
        RawMouseKind::Wheel(axis) => MouseEvent::Wheel(MouseWheel {
            delta: raw.wheel_delta(),
            axis,
            point: raw.point,
            window: locator.window_at(raw.point),
        }),
    };
    Some(event)
}

struct Pending {
    receiver: Receiver<DispatchMessage>,
    registry: HandlerRegistry,
    locator: Arc<dyn WindowLocator>,
}

pub struct Dispatcher {
    sender: Sender<DispatchMessage>,
    exiting: Arc<AtomicBool>,
    pending: Option<Pending>,
    worker: Option<JoinHandle<Result<(), DispatchError>>>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry, locator: Arc<dyn WindowLocator>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            exiting: Arc::new(AtomicBool::new(false)),
            pending: Some(Pending {
                receiver,
                registry,
                locator,
            }),
            worker: None,
        }
    }

    /// Spawn the worker thread. Calling it again while running is a no-op.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let Some(pending) = self.pending.take() else {
            return Err(DispatchError::AlreadyStopped);
        };
        let exiting = Arc::clone(&self.exiting);
        let join = thread::Builder::new()
            .name("drag-dispatcher".to_string())
            .spawn(move || {
                let Pending {
                    receiver,
                    mut registry,
                    locator,
                } = pending;
                let result = run(&receiver, &exiting, &mut registry, &*locator);
                if let Err(err) = &result {
                    tracing::error!(%err, "dispatcher stopped");
                }
                result
            })?;
        self.worker = Some(join);
        tracing::debug!("dispatcher started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|join| !join.is_finished())
            .unwrap_or(false)
    }

    pub fn poster(&self) -> DispatchPoster {
        DispatchPoster {
            sender: self.sender.clone(),
        }
    }

    pub fn post(&self, raw: RawMouseMessage, suppressed: bool) {
        let _ = self.sender.send(DispatchMessage::Mouse { raw, suppressed });
    }

    /// Ask the worker to finish and wait for it. The message being handled
    /// when the request arrives is completed first.
    pub fn stop(&mut self) -> Result<(), DispatchError> {
        self.exiting.store(true, Ordering::Release);
        let _ = self.sender.send(DispatchMessage::Quit);
        self.pending = None;
        match self.worker.take() {
            Some(join) => join.join().map_err(|_| DispatchError::WorkerPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.stop() {
                tracing::warn!(%err, "dispatcher did not stop cleanly");
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.is_running())
            .field("exiting", &self.exiting.load(Ordering::Acquire))
            .finish()
    }
}

/// The worker loop. Blocks on the queue, handles one message at a time and
/// exits on `Quit` or once the exit flag is raised. Subscribers get
/// `on_shutdown` on every exit path.
pub fn run(
    receiver: &Receiver<DispatchMessage>,
    exiting: &AtomicBool,
    registry: &mut HandlerRegistry,
    locator: &dyn WindowLocator,
) -> Result<(), DispatchError> {
    let result = pump(receiver, exiting, registry, locator);
    registry.shutdown();
    tracing::debug!("dispatcher exiting");
    result
}

fn pump(
    receiver: &Receiver<DispatchMessage>,
    exiting: &AtomicBool,
    registry: &mut HandlerRegistry,
    locator: &dyn WindowLocator,
) -> Result<(), DispatchError> {
    while !exiting.load(Ordering::Acquire) {
        let message = receiver
            .recv()
            .map_err(|_| DispatchError::QueueDisconnected)?;
        match message {
            DispatchMessage::Quit => break,
            DispatchMessage::Mouse { raw, suppressed } => {
                if let Some(event) = normalize(&raw, suppressed, locator) {
                    registry.notify(&event);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::events::*;
    use crate::drag::handlers::MouseHandler;
    use std::sync::Mutex;

    struct FixedLocator(WindowId);

    impl WindowLocator for FixedLocator {
        fn window_at(&self, _point: Point) -> WindowId {
            self.0
        }
        fn root_window(&self, window: WindowId) -> WindowId {
            window
        }
        fn foreground_window(&self) -> WindowId {
            WindowId::NONE
        }
    }

    struct Recorder(Arc<Mutex<Vec<MouseEvent>>>);

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

    #[test]
    fn normalize_recomputes_window_and_keeps_verdict() {
        let locator = FixedLocator(WindowId(99));
        let raw = RawMouseMessage::new(WM_RBUTTONDOWN, Point::new(5, 6));
        assert_eq!(
            normalize(&raw, true, &locator),
            Some(MouseEvent::Down(MouseDown {
                button: MouseButton::Right,
                point: Point::new(5, 6),
                window: WindowId(99),
                intercepted: true,
            }))
        );
        assert_eq!(
            normalize(&RawMouseMessage::new(0x1234, Point::default()), false, &locator),
            None
        );
    }

    #[test]
    fn run_processes_in_order_until_quit() {
        let (tx, rx) = mpsc::channel();
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new().with(Box::new(Recorder(Arc::clone(&events))));

        tx.send(DispatchMessage::Mouse {
            raw: RawMouseMessage::new(WM_LBUTTONDOWN, Point::new(1, 1)),
            suppressed: false,
        })
        .unwrap();
        tx.send(DispatchMessage::Mouse {
            raw: RawMouseMessage::new(WM_MOUSEMOVE, Point::new(2, 2)),
            suppressed: false,
        })
        .unwrap();
        tx.send(DispatchMessage::Quit).unwrap();
        tx.send(DispatchMessage::Mouse {
            raw: RawMouseMessage::new(WM_LBUTTONUP, Point::new(3, 3)),
            suppressed: false,
        })
        .unwrap();

        let exiting = AtomicBool::new(false);
        run(&rx, &exiting, &mut registry, &FixedLocator(WindowId(1))).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MouseEvent::Down(_)));
        assert_eq!(
            events[1],
            MouseEvent::Move(MouseMove {
                point: Point::new(2, 2)
            })
        );
    }

    #[test]
    fn run_fails_when_queue_disconnects() {
        let (tx, rx) = mpsc::channel::<DispatchMessage>();
        drop(tx);
        let exiting = AtomicBool::new(false);
        let result = run(
            &rx,
            &exiting,
            &mut HandlerRegistry::new(),
            &FixedLocator(WindowId(1)),
        );
        assert!(matches!(result, Err(DispatchError::QueueDisconnected)));
    }

    #[test]
    fn run_returns_immediately_when_already_exiting() {
        let (_tx, rx) = mpsc::channel::<DispatchMessage>();
        let exiting = AtomicBool::new(true);
        assert!(run(
            &rx,
            &exiting,
            &mut HandlerRegistry::new(),
            &FixedLocator(WindowId(1))
        )
        .is_ok());
    }
}
