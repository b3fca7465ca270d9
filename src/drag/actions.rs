use super::events::{Point, WindowId};

/// The window primitives a drag session drives. Only ever called from the
/// dispatcher thread.
pub trait WindowActions: Send {
    fn is_movable(&self, window: WindowId) -> bool;
    fn is_resizable(&self, window: WindowId) -> bool;
    fn start_move(&mut self, window: WindowId, point: Point);
    fn do_move(&mut self, point: Point);
    fn end_move(&mut self);
    fn start_resize(&mut self, window: WindowId, point: Point);
    fn do_resize(&mut self, point: Point);
    fn end_resize(&mut self);
}

/// Window topology queries. Some of these pump messages on Windows, so they
/// must stay off the hook threads.
pub trait WindowLocator: Send + Sync {
    fn window_at(&self, point: Point) -> WindowId;
    fn root_window(&self, window: WindowId) -> WindowId;
    fn foreground_window(&self) -> WindowId;
}

/// Creates a fresh [`WindowActions`] each time interception is enabled.
pub trait WindowActionsFactory: Send + Sync {
    fn create(&self) -> Box<dyn WindowActions>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }
}

pub const MIN_WINDOW_WIDTH: i32 = 100;
pub const MIN_WINDOW_HEIGHT: i32 = 40;

/// Which edges follow the cursor during a resize. Picked from the quadrant of
/// the window the press landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeAnchor {
    pub left_edge: bool,
    pub top_edge: bool,
}

impl ResizeAnchor {
    pub fn from_point(rect: &Rect, point: Point) -> Self {
        Self {
            left_edge: point.x < rect.left + rect.width() / 2,
            top_edge: point.y < rect.top + rect.height() / 2,
        }
    }

    /// Apply a cursor delta to the rectangle captured at the start of the
    /// resize. The edge opposite each moving edge stays put, and the size
    /// never drops below the minimum.
    pub fn resize(&self, start: &Rect, dx: i32, dy: i32) -> Rect {
        let mut rect = *start;
        if self.left_edge {
            rect.left = (start.left + dx).min(start.right - MIN_WINDOW_WIDTH);
        } else {
            rect.right = (start.right + dx).max(start.left + MIN_WINDOW_WIDTH);
        }
        if self.top_edge {
            rect.top = (start.top + dy).min(start.bottom - MIN_WINDOW_HEIGHT);
        } else {
            rect.bottom = (start.bottom + dy).max(start.top + MIN_WINDOW_HEIGHT);
        }
        rect
    }
}

#[cfg(windows)]
pub use platform::{Win32WindowActions, Win32WindowLocator};

#[cfg(windows)]
mod platform {
    use super::*;
    use windows::Win32::Foundation::{HWND, POINT, RECT};
    use windows::Win32::UI::WindowsAndMessaging::{
        GetAncestor, GetDesktopWindow, GetForegroundWindow, GetShellWindow, GetWindowLongPtrW,
        GetWindowRect, IsIconic, IsWindowVisible, IsZoomed, SetWindowPos, WindowFromPoint,
        GA_ROOT, GWL_STYLE, SWP_NOACTIVATE, SWP_NOOWNERZORDER, SWP_NOSIZE, SWP_NOZORDER,
        WS_THICKFRAME,
    };

    #[derive(Debug, Clone, Copy)]
    struct MoveSession {
        window: WindowId,
        origin: Point,
        start: Rect,
    }

    #[derive(Debug, Clone, Copy)]
    struct ResizeSession {
        window: WindowId,
        origin: Point,
        start: Rect,
        anchor: ResizeAnchor,
    }

    fn hwnd(window: WindowId) -> HWND {
        HWND(window.0 as *mut core::ffi::c_void)
    }

    fn window_id(hwnd: HWND) -> WindowId {
        WindowId(hwnd.0 as isize)
    }

    fn window_rect(window: WindowId) -> Option<Rect> {
        let mut rect = RECT::default();
        match unsafe { GetWindowRect(hwnd(window), &mut rect) } {
            Ok(()) => Some(Rect::new(rect.left, rect.top, rect.right, rect.bottom)),
            Err(err) => {
                tracing::warn!(?err, window = window.0, "GetWindowRect failed");
                None
            }
        }
    }

    fn place(window: WindowId, rect: Rect, keep_size: bool) {
        let mut flags = SWP_NOZORDER | SWP_NOOWNERZORDER | SWP_NOACTIVATE;
        if keep_size {
            flags |= SWP_NOSIZE;
        }
        let result = unsafe {
            SetWindowPos(
                hwnd(window),
                HWND(std::ptr::null_mut()),
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                flags,
            )
        };
        if let Err(err) = result {
            tracing::warn!(?err, window = window.0, "SetWindowPos failed");
        }
    }

    #[derive(Debug, Default)]
    pub struct Win32WindowActions {
        moving: Option<MoveSession>,
        resizing: Option<ResizeSession>,
    }

    impl Win32WindowActions {
        fn is_shell_window(window: WindowId) -> bool {
            let h = hwnd(window);
            unsafe { h == GetDesktopWindow() || h == GetShellWindow() }
        }

        fn is_placeable(window: WindowId) -> bool {
            if window.is_none() || Self::is_shell_window(window) {
                return false;
            }
            let h = hwnd(window);
            unsafe {
                IsWindowVisible(h).as_bool() && !IsZoomed(h).as_bool() && !IsIconic(h).as_bool()
            }
        }
    }

    impl WindowActions for Win32WindowActions {
        fn is_movable(&self, window: WindowId) -> bool {
            Self::is_placeable(window)
        }

        fn is_resizable(&self, window: WindowId) -> bool {
            if !Self::is_placeable(window) {
                return false;
            }
            let style = unsafe { GetWindowLongPtrW(hwnd(window), GWL_STYLE) } as u32;
            style & WS_THICKFRAME.0 != 0
        }

        fn start_move(&mut self, window: WindowId, point: Point) {
            self.moving = window_rect(window).map(|start| MoveSession {
                window,
                origin: point,
                start,
            });
        }

        fn do_move(&mut self, point: Point) {
            if let Some(session) = self.moving {
                let (dx, dy) = point.offset_from(session.origin);
                place(session.window, session.start.offset(dx, dy), true);
            }
        }

        fn end_move(&mut self) {
            self.moving = None;
        }

        fn start_resize(&mut self, window: WindowId, point: Point) {
            self.resizing = window_rect(window).map(|start| ResizeSession {
                window,
                origin: point,
                start,
                anchor: ResizeAnchor::from_point(&start, point),
            });
        }

        fn do_resize(&mut self, point: Point) {
            if let Some(session) = self.resizing {
                let (dx, dy) = point.offset_from(session.origin);
                place(session.window, session.anchor.resize(&session.start, dx, dy), false);
            }
        }

        fn end_resize(&mut self) {
            self.resizing = None;
        }
    }

    #[derive(Debug, Default)]
    pub struct Win32WindowLocator;

    impl WindowLocator for Win32WindowLocator {
        fn window_at(&self, point: Point) -> WindowId {
            let pt = POINT {
                x: point.x,
                y: point.y,
            };
            window_id(unsafe { WindowFromPoint(pt) })
        }

        fn root_window(&self, window: WindowId) -> WindowId {
            window_id(unsafe { GetAncestor(hwnd(window), GA_ROOT) })
        }

        fn foreground_window(&self) -> WindowId {
            window_id(unsafe { GetForegroundWindow() })
        }
    }

    #[derive(Debug, Default)]
    pub struct Win32ActionsFactory;

    impl WindowActionsFactory for Win32ActionsFactory {
        fn create(&self) -> Box<dyn WindowActions> {
            Box::new(Win32WindowActions::default())
        }
    }

    pub fn default_actions_factory() -> std::sync::Arc<dyn WindowActionsFactory> {
        std::sync::Arc::new(Win32ActionsFactory)
    }

    pub fn default_locator() -> std::sync::Arc<dyn WindowLocator> {
        std::sync::Arc::new(Win32WindowLocator)
    }
}

/// Stand-ins for targets without a window system we drive. Nothing is ever
/// movable, so every session degrades to `Ignoring`.
#[cfg(not(windows))]
mod platform {
    use super::*;

    #[derive(Debug, Default)]
    pub struct NullWindowActions;

    impl WindowActions for NullWindowActions {
        fn is_movable(&self, _window: WindowId) -> bool {
            false
        }
        fn is_resizable(&self, _window: WindowId) -> bool {
            false
        }
        fn start_move(&mut self, _window: WindowId, _point: Point) {}
        fn do_move(&mut self, _point: Point) {}
        fn end_move(&mut self) {}
        fn start_resize(&mut self, _window: WindowId, _point: Point) {}
        fn do_resize(&mut self, _point: Point) {}
        fn end_resize(&mut self) {}
    }

    #[derive(Debug, Default)]
    pub struct NullWindowLocator;

    impl WindowLocator for NullWindowLocator {
        fn window_at(&self, _point: Point) -> WindowId {
            WindowId::NONE
        }
        fn root_window(&self, window: WindowId) -> WindowId {
            window
        }
        fn foreground_window(&self) -> WindowId {
            WindowId::NONE
        }
    }

    #[derive(Debug, Default)]
    struct NullActionsFactory;

    impl WindowActionsFactory for NullActionsFactory {
        fn create(&self) -> Box<dyn WindowActions> {
            Box::new(NullWindowActions)
        }
    }

    pub fn default_actions_factory() -> std::sync::Arc<dyn WindowActionsFactory> {
        std::sync::Arc::new(NullActionsFactory)
    }

    pub fn default_locator() -> std::sync::Arc<dyn WindowLocator> {
        std::sync::Arc::new(NullWindowLocator)
    }
}

pub use platform::{default_actions_factory, default_locator};
