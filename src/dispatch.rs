//! Seams between the tray façade and the toolkit it runs on.
//!
//! The façade never touches a concrete toolkit type. It talks to:
//! - an [`EventSink`], the application's event thread where user callbacks run,
//! - a [`TrayQueue`], which serially runs jobs against the [`TrayBackend`] on the tray's thread,
//! - an [`OwnerWindow`], the window the tray icon belongs to.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, Result};
use crate::icon::Bitmap;
use crate::menu::{Callback, NativeEntry};
use crate::platform::PlatformProfile;

pub type Task = Box<dyn FnOnce() + Send>;

pub type Job = Box<dyn FnOnce(&mut dyn TrayBackend) + Send>;

/// The application's event thread.
pub trait EventSink: Send + Sync {
    /// Runs `task` on the event thread, eventually.
    fn dispatch(&self, task: Task);

    /// Asks the application to exit.
    fn request_exit(&self);
}

/// The tray's event queue.
pub trait TrayQueue: Send + Sync {
    /// Whether the desktop environment has a system tray at all.
    fn is_supported(&self) -> bool;

    /// Queues `job`, jobs run one at a time in submission order.
    fn submit(&self, job: Job);
}

/// Primitive operations on one native tray icon and its popup menu.
pub trait TrayBackend {
    fn publish(&mut self, icon: &Bitmap, tooltip: Option<&str>) -> Result<()>;
    fn unpublish(&mut self);
    fn is_published(&self) -> bool;

    fn set_icon(&mut self, icon: &Bitmap) -> Result<()>;
    fn set_tooltip(&mut self, tooltip: Option<&str>) -> Result<()>;
    /// Action run when the icon itself is clicked.
    fn set_primary_action(&mut self, action: Option<Callback>);

    fn insert(&mut self, index: usize, entry: &NativeEntry) -> Result<()>;
    fn remove(&mut self, index: usize) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn item_count(&self) -> usize;

    fn set_checked(&mut self, index: usize, checked: bool) -> Result<()>;
    fn is_checked(&self, index: usize) -> Option<bool>;

    fn display_message(
        &mut self,
        kind: MessageKind,
        title: Option<&str>,
        message: &str,
    ) -> Result<()>;
}

/// The window a tray icon belongs to.
pub trait OwnerWindow: Send + Sync {
    fn title(&self) -> Option<String>;

    /// Shows and focuses the window.
    fn show(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MessageKind {
    #[strum(serialize = "Information")]
    Info,
    Warning,
    Error,
    #[strum(serialize = "Message")]
    Plain,
}

/// Everything a tray icon needs from its host.
#[derive(Clone)]
pub struct Toolkit {
    pub queue: Arc<dyn TrayQueue>,
    pub sink: Arc<dyn EventSink>,
    pub profile: PlatformProfile,
}

impl Toolkit {
    pub fn new(queue: Arc<dyn TrayQueue>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            queue,
            sink,
            profile: PlatformProfile::current(),
        }
    }

    pub fn with_profile(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn is_supported(&self) -> bool {
        self.queue.is_supported()
    }
}

/// Result of one job queued on a [`TrayQueue`].
#[derive(Debug)]
pub struct Completion<T = ()> {
    rx: Receiver<Result<T>>,
}

impl<T> Completion<T> {
    fn channel() -> (Sender<Result<T>>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (tx, Self { rx })
    }

    /// A completion that already holds its result.
    pub fn ready(result: Result<T>) -> Self {
        let (tx, completion) = Self::channel();
        let _ = tx.send(result);
        completion
    }

    /// Whether the job already ran.
    pub fn is_done(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Blocks until the job ran and returns its result.
    ///
    /// Calling this on the thread that drains the queue never returns.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| Error::QueueClosed)?
    }
}

/// Queues `f` on `queue` and returns a handle to its result.
pub fn run_job<T, F>(queue: &dyn TrayQueue, f: F) -> Completion<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn TrayBackend) -> Result<T> + Send + 'static,
{
    let (tx, completion) = Completion::channel();
    queue.submit(Box::new(move |backend: &mut dyn TrayBackend| {
        let _ = tx.send(f(backend));
    }));
    completion
}
