use super::actions::{default_actions_factory, default_locator, WindowActionsFactory, WindowLocator};
use super::dispatcher::Dispatcher;
use super::handlers::{DiagnosticsHandler, HandlerRegistry, MouseHandler};
use super::interceptor::{InputInterceptor, Verdict};
use super::machine::DragStateMachine;
use super::state::SharedState;
use super::events::RawMouseMessage;
use crate::settings::DragBindings;
use anyhow::anyhow;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Routes system-wide input into an [`InputInterceptor`].
pub trait HookBackend: Send {
    fn install(&mut self, interceptor: Arc<InputInterceptor>) -> anyhow::Result<()>;
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

/// Builds extra subscribers each time the dispatcher is (re)created.
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn MouseHandler> + Send + Sync>;

pub struct DragService {
    bindings: DragBindings,
    diagnostics: bool,
    shared: Arc<SharedState>,
    interceptor: Arc<InputInterceptor>,
    backend: Box<dyn HookBackend>,
    actions_factory: Arc<dyn WindowActionsFactory>,
    locator: Arc<dyn WindowLocator>,
    extra_handlers: Vec<HandlerFactory>,
    dispatcher: Option<Dispatcher>,
}

impl DragService {
    pub fn new(bindings: DragBindings) -> Self {
        Self::new_with_backend(bindings, Box::new(DefaultHookBackend::default()))
    }

    pub fn new_with_backend(bindings: DragBindings, backend: Box<dyn HookBackend>) -> Self {
        Self::new_with_parts(bindings, backend, default_actions_factory(), default_locator())
    }

    pub fn new_with_parts(
        bindings: DragBindings,
        backend: Box<dyn HookBackend>,
        actions_factory: Arc<dyn WindowActionsFactory>,
        locator: Arc<dyn WindowLocator>,
    ) -> Self {
        let shared = Arc::new(SharedState::new());
        let interceptor = Arc::new(InputInterceptor::new(Arc::clone(&shared), bindings));
        Self {
            bindings,
            diagnostics: false,
            shared,
            interceptor,
            backend,
            actions_factory,
            locator,
            extra_handlers: Vec::new(),
            dispatcher: None,
        }
    }

    /// Log every dispatched event. Takes effect on the next enable.
    pub fn set_diagnostics(&mut self, enabled: bool) {
        self.diagnostics = enabled;
    }

    /// Register an additional subscriber, notified after the drag state
    /// machine. Takes effect on the next enable.
    pub fn add_handler(&mut self, factory: HandlerFactory) {
        self.extra_handlers.push(factory);
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn interceptor(&self) -> &Arc<InputInterceptor> {
        &self.interceptor
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_installed()
    }

    /// Whether window actions are running. False while disabled, and also
    /// while enabled in degraded mode after the dispatcher failed.
    pub fn is_dispatching(&self) -> bool {
        self.dispatcher
            .as_ref()
            .map(Dispatcher::is_running)
            .unwrap_or(false)
    }

    pub fn enable(&mut self) -> anyhow::Result<()> {
        if self.is_enabled() {
            return Ok(());
        }

        self.shared.reset();
        self.start_dispatcher();

        if let Err(err) = self.backend.install(Arc::clone(&self.interceptor)) {
            tracing::error!(?err, "failed to install input hooks");
            self.stop_dispatcher();
            return Err(err);
        }
        tracing::info!(bindings = ?self.bindings, "drag interception enabled");
        Ok(())
    }

    pub fn disable(&mut self) {
        if !self.is_enabled() && self.dispatcher.is_none() {
            return;
        }
        if let Err(err) = self.backend.uninstall() {
            tracing::error!(?err, "failed to uninstall input hooks");
        }
        self.stop_dispatcher();
        tracing::info!("drag interception disabled");
    }

    fn registry(&self) -> HandlerRegistry {
        let machine = DragStateMachine::new(
            Arc::clone(&self.shared),
            self.bindings,
            self.actions_factory.create(),
            Arc::clone(&self.locator),
        );
        let mut registry = HandlerRegistry::new().with(Box::new(machine));
        for factory in &self.extra_handlers {
            registry.register(factory());
        }
        if self.diagnostics {
            registry.register(Box::new(DiagnosticsHandler));
        }
        registry
    }

    fn start_dispatcher(&mut self) {
        let mut dispatcher = Dispatcher::new(self.registry(), Arc::clone(&self.locator));
        match dispatcher.start() {
            Ok(()) => {
                self.interceptor.set_poster(Some(dispatcher.poster()));
                self.dispatcher = Some(dispatcher);
            }
            Err(err) => {
                // Hooks still go in so the verdicts stay consistent; windows
                // just never move.
                tracing::error!(%err, "dispatcher failed to start; drag actions disabled");
                self.interceptor.set_poster(None);
            }
        }
    }

    fn stop_dispatcher(&mut self) {
        self.interceptor.set_poster(None);
        if let Some(mut dispatcher) = self.dispatcher.take() {
            if let Err(err) = dispatcher.stop() {
                tracing::error!(%err, "dispatcher did not stop cleanly");
            }
        }
    }
}

impl Drop for DragService {
    fn drop(&mut self) {
        self.disable();
    }
}

impl std::fmt::Debug for DragService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragService")
            .field("bindings", &self.bindings)
            .field("enabled", &self.is_enabled())
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}

static SERVICE: OnceCell<Mutex<Option<DragService>>> = OnceCell::new();

/// Run `f` against the process-wide service, if one has been installed with
/// [`install_service`].
pub fn with_service<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut DragService) -> R,
{
    let service = SERVICE.get_or_init(|| Mutex::new(None));
    match service.lock() {
        Ok(mut guard) => guard.as_mut().map(f),
        Err(err) => {
            tracing::error!(?err, "failed to lock drag service");
            None
        }
    }
}

pub fn install_service(service: DragService) {
    let slot = SERVICE.get_or_init(|| Mutex::new(None));
    match slot.lock() {
        Ok(mut guard) => *guard = Some(service),
        Err(err) => tracing::error!(?err, "failed to lock drag service"),
    }
}

/// Hook backend for tests: stands in for the OS by feeding events straight
/// into the installed interceptor.
#[derive(Clone, Default)]
pub struct MockHookBackend {
    state: Arc<MockHookState>,
}

#[derive(Default)]
struct MockHookState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    interceptor: Mutex<Option<Arc<InputInterceptor>>>,
}

impl MockHookBackend {
    pub fn new() -> (Self, MockHookHandle) {
        let backend = Self::default();
        let handle = MockHookHandle {
            state: Arc::clone(&backend.state),
        };
        (backend, handle)
    }
}

impl HookBackend for MockHookBackend {
    fn install(&mut self, interceptor: Arc<InputInterceptor>) -> anyhow::Result<()> {
        let mut guard = self.state.interceptor.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(interceptor);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.interceptor.lock().map_err(|_| anyhow!("lock"))?;
        if guard.take().is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.state
            .interceptor
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

pub struct MockHookHandle {
    state: Arc<MockHookState>,
}

impl MockHookHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    fn interceptor(&self) -> Option<Arc<InputInterceptor>> {
        self.state
            .interceptor
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Deliver a mouse event. Returns `None` while no hook is installed, which
    /// is the same as the OS passing the event through.
    pub fn mouse(&self, raw: RawMouseMessage) -> Option<Verdict> {
        self.interceptor().map(|i| i.on_mouse(raw))
    }

    pub fn modifier(&self, down: bool) -> Option<Verdict> {
        self.interceptor().map(|i| i.on_modifier(down))
    }
}

#[cfg(windows)]
pub use platform::DefaultHookBackend;

#[cfg(windows)]
mod platform {
    use super::{HookBackend, InputInterceptor, Verdict};
    use crate::drag::events::{Point, RawMouseMessage};
    use crate::keys::modifier_state_after;
    use anyhow::anyhow;
    use once_cell::sync::Lazy;
    use std::sync::{Arc, Mutex};
    use std::thread::JoinHandle;
    use std::time::Duration;
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSLLHOOKSTRUCT, WM_KEYDOWN,
        WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    static INTERCEPTOR: Lazy<Mutex<Option<Arc<InputInterceptor>>>> =
        Lazy::new(|| Mutex::new(None));

    fn current_interceptor() -> Option<Arc<InputInterceptor>> {
        INTERCEPTOR.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_interceptor(interceptor: Option<Arc<InputInterceptor>>) {
        if let Ok(mut guard) = INTERCEPTOR.lock() {
            *guard = interceptor;
        }
    }

    #[derive(Debug)]
    struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    #[derive(Debug, Default)]
    pub struct DefaultHookBackend {
        hook_thread: Option<HookThread>,
    }

    unsafe impl Send for DefaultHookBackend {}

    impl HookBackend for DefaultHookBackend {
        fn install(&mut self, interceptor: Arc<InputInterceptor>) -> anyhow::Result<()> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            set_interceptor(Some(interceptor));

            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
                UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL,
            };

            // install() only returns once the hooks are really in place.
            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<anyhow::Result<u32>>(1);

            let join = std::thread::Builder::new()
                .name("drag-hooks".to_string())
                .spawn(move || {
                    // Make sure the thread owns a message queue before hooking.
                    let mut msg = MSG::default();
                    unsafe {
                        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                    }

                    let thread_id = unsafe { GetCurrentThreadId() };
                    let hmodule = match unsafe { GetModuleHandleW(None) } {
                        Ok(h) => h,
                        Err(err) => {
                            let _ = ready_tx.send(Err(anyhow!(err)));
                            return;
                        }
                    };

                    let mouse_hook = match unsafe {
                        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                            return;
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(anyhow!(err)));
                            return;
                        }
                    };

                    let keyboard_hook = match unsafe {
                        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                            unsafe {
                                let _ = UnhookWindowsHookEx(mouse_hook);
                            }
                            return;
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(anyhow!(err)));
                            unsafe {
                                let _ = UnhookWindowsHookEx(mouse_hook);
                            }
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok(thread_id));

                    // Low-level hooks are called through this thread's message loop.
                    loop {
                        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                        if r.0 == 0 {
                            break;
                        }
                        if r.0 == -1 {
                            tracing::error!(
                                err = ?windows::core::Error::from_win32(),
                                "GetMessageW failed on hook thread"
                            );
                            break;
                        }
                        unsafe {
                            let _ = TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    unsafe {
                        let _ = UnhookWindowsHookEx(mouse_hook);
                        let _ = UnhookWindowsHookEx(keyboard_hook);
                    }
                })
                .map_err(|err| anyhow!(err))?;

            let thread_id = match ready_rx.recv_timeout(Duration::from_secs(2)) {
                Ok(Ok(id)) => id,
                Ok(Err(err)) => {
                    set_interceptor(None);
                    let _ = join.join();
                    return Err(err);
                }
                Err(_) => {
                    set_interceptor(None);
                    return Err(anyhow!("hook thread did not signal readiness"));
                }
            };

            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }

        fn uninstall(&mut self) -> anyhow::Result<()> {
            set_interceptor(None);

            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0))
                        .map_err(|err| anyhow!(err))?;
                }
                th.join
                    .join()
                    .map_err(|_| anyhow!("hook thread panicked"))?;
            }
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    fn call_next(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
        unsafe { CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param) }
    }

    unsafe extern "system" fn mouse_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code == HC_ACTION as i32 {
            if let Some(interceptor) = current_interceptor() {
                let info = unsafe { &*(l_param.0 as *const MSLLHOOKSTRUCT) };
                let raw = RawMouseMessage::new(w_param.0 as u32, Point::new(info.pt.x, info.pt.y))
                    .with_mouse_data(info.mouseData);
                if interceptor.on_mouse(raw) == Verdict::Suppress {
                    return LRESULT(1);
                }
            }
        }
        call_next(n_code, w_param, l_param)
    }

    fn key_is_pressed(vk: u32) -> bool {
        (unsafe { GetAsyncKeyState(vk as i32) } as u16 & 0x8000) != 0
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        if n_code == HC_ACTION as i32 {
            if let Some(interceptor) = current_interceptor() {
                let msg = w_param.0 as u32;
                let key_down = match msg {
                    WM_KEYDOWN | WM_SYSKEYDOWN => Some(true),
                    WM_KEYUP | WM_SYSKEYUP => Some(false),
                    _ => None,
                };
                if let Some(key_down) = key_down {
                    let info = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
                    let modifier = interceptor.bindings().modifier;
                    if let Some(down) =
                        modifier_state_after(modifier, info.vkCode, key_down, key_is_pressed)
                    {
                        if interceptor.on_modifier(down) == Verdict::Suppress {
                            return LRESULT(1);
                        }
                    }
                }
            }
        }
        call_next(n_code, w_param, l_param)
    }
}

#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct DefaultHookBackend;

#[cfg(not(windows))]
impl HookBackend for DefaultHookBackend {
    fn install(&mut self, _interceptor: Arc<InputInterceptor>) -> anyhow::Result<()> {
        Err(anyhow!("input hooks are not supported on this platform"))
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_installed(&self) -> bool {
        false
    }
}
