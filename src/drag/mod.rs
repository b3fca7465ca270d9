mod actions;
mod dispatcher;
mod events;
mod handlers;
mod interceptor;
mod machine;
mod service;
mod state;

pub use actions::{
    default_actions_factory, default_locator, Rect, ResizeAnchor, WindowActions,
    WindowActionsFactory, WindowLocator, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH,
};
#[cfg(windows)]
pub use actions::{Win32WindowActions, Win32WindowLocator};
pub use dispatcher::{normalize, DispatchError, DispatchMessage, DispatchPoster, Dispatcher};
pub use events::*;
pub use handlers::{DiagnosticsHandler, HandlerRegistry, MouseHandler};
pub use interceptor::{InputInterceptor, Verdict};
pub use machine::DragStateMachine;
pub use service::{
    install_service, with_service, DefaultHookBackend, DragService, HandlerFactory, HookBackend,
    MockHookBackend, MockHookHandle,
};
pub use state::{DragSessionState, SharedSnapshot, SharedState};
