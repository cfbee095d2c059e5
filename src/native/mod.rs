//! Desktop back end: a `winit` event loop hosting a `tray-icon` icon with a `muda` menu.
//!
//! Tray jobs and user callbacks are both sent to the event loop as [`TrayMessage`]s, so the
//! event loop thread is at once the tray's queue and the application's event thread.

use std::fmt;
use std::sync::Arc;

use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowAttributes};

use crate::dispatch::{EventSink, Job, OwnerWindow, Task, Toolkit, TrayQueue};
use crate::error::Error;
use crate::platform::PlatformProfile;
use crate::tray::TrayIcon;

mod app;
mod context_menu;
mod tray_icon;

pub use self::tray_icon::NativeTray;

pub enum TrayMessage {
    Job(Job),
    Dispatch(Task),
    Exit,
    MenuEvent(muda::MenuEvent),
    TrayIconEvent(::tray_icon::TrayIconEvent),
}

impl fmt::Debug for TrayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrayMessage::Job(_) => f.write_str("Job"),
            TrayMessage::Dispatch(_) => f.write_str("Dispatch"),
            TrayMessage::Exit => f.write_str("Exit"),
            TrayMessage::MenuEvent(event) => f.debug_tuple("MenuEvent").field(event).finish(),
            TrayMessage::TrayIconEvent(event) => {
                f.debug_tuple("TrayIconEvent").field(event).finish()
            }
        }
    }
}

pub(crate) fn backend_error<E: fmt::Display>(context: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Backend(anyhow::anyhow!("{context}: {e}"))
}

/// Whether this desktop can show a tray icon.
pub fn is_supported() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
    }

    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        true
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        false
    }
}

/// Sends tray jobs and callbacks to the event loop.
#[derive(Clone)]
pub struct NativeQueue {
    proxy: EventLoopProxy<TrayMessage>,
}

impl NativeQueue {
    fn send(&self, message: TrayMessage) {
        if let Err(e) = self.proxy.send_event(message) {
            tracing::error!("Failed to send `{:?}`, event loop closed", e.0);
        }
    }
}

impl TrayQueue for NativeQueue {
    fn is_supported(&self) -> bool {
        is_supported()
    }

    fn submit(&self, job: Job) {
        self.send(TrayMessage::Job(job));
    }
}

impl EventSink for NativeQueue {
    fn dispatch(&self, task: Task) {
        self.send(TrayMessage::Dispatch(task));
    }

    fn request_exit(&self) {
        self.send(TrayMessage::Exit);
    }
}

impl OwnerWindow for Window {
    fn title(&self) -> Option<String> {
        Some(Window::title(self)).filter(|title| !title.is_empty())
    }

    fn show(&self) {
        self.set_visible(true);
        self.set_minimized(false);
        self.focus_window();
    }
}

/// What [`run`]'s setup closure gets to create its tray icon with.
pub struct NativeContext<'a> {
    pub event_loop: &'a ActiveEventLoop,
    pub window: Arc<Window>,
    pub toolkit: Toolkit,
}

impl NativeContext<'_> {
    pub fn owner(&self) -> Arc<dyn OwnerWindow> {
        self.window.clone()
    }
}

/// Runs the event loop until the application exits.
///
/// Creates the owner window from `window_attributes` once the loop starts, then calls `setup` to
/// create the tray icon, which is kept alive until the loop ends.
pub fn run<F>(
    window_attributes: WindowAttributes,
    profile: PlatformProfile,
    setup: F,
) -> anyhow::Result<()>
where
    F: FnOnce(&NativeContext) -> anyhow::Result<TrayIcon>,
{
    #[cfg(target_os = "linux")]
    gtk::init()?;

    let evl = EventLoop::<TrayMessage>::with_user_event().build()?;

    let proxy = evl.create_proxy();
    muda::MenuEvent::set_event_handler(Some(move |e| {
        if let Err(e) = proxy.send_event(TrayMessage::MenuEvent(e)) {
            tracing::error!("Failed to send `TrayMessage::MenuEvent`: {e}")
        }
    }));

    let proxy = evl.create_proxy();
    ::tray_icon::TrayIconEvent::set_event_handler(Some(move |e| {
        if let Err(e) = proxy.send_event(TrayMessage::TrayIconEvent(e)) {
            tracing::error!("Failed to send `TrayMessage::TrayIconEvent`: {e}")
        }
    }));

    let queue = Arc::new(NativeQueue {
        proxy: evl.create_proxy(),
    });
    let toolkit = Toolkit::new(queue.clone(), queue).with_profile(profile);

    let mut app = app::App::new(toolkit, window_attributes, setup);
    evl.run_app(&mut app)?;

    app.into_result()
}
