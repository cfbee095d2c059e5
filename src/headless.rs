//! In-memory back end for running tray icons without a desktop, and for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;

use crate::dispatch::{
    EventSink, Job, MessageKind, OwnerWindow, Task, Toolkit, TrayBackend, TrayQueue,
};
use crate::error::Result;
use crate::icon::Bitmap;
use crate::menu::{Callback, NativeEntry};

/// Runs every task right away on the calling thread.
#[derive(Debug, Default)]
pub struct ImmediateSink {
    exit_requested: AtomicBool,
}

impl ImmediateSink {
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }
}

impl EventSink for ImmediateSink {
    fn dispatch(&self, task: Task) {
        task()
    }

    fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}

/// Holds tasks until [`QueuedSink::run_pending`] is called, like an event loop that hasn't
/// turned yet.
#[derive(Default)]
pub struct QueuedSink {
    tasks: Mutex<Vec<Task>>,
    exit_requested: AtomicBool,
}

impl QueuedSink {
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Runs queued tasks, including ones queued while running, and returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let tasks = {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *tasks)
            };
            if tasks.is_empty() {
                return ran;
            }
            ran += tasks.len();
            tasks.into_iter().for_each(|task| task());
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }
}

impl EventSink for QueuedSink {
    fn dispatch(&self, task: Task) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }

    fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}

/// An owner window that only counts how often it was shown.
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    title: Option<String>,
    shown: AtomicUsize,
}

impl HeadlessWindow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            shown: AtomicUsize::new(0),
        }
    }

    pub fn untitled() -> Self {
        Self::default()
    }

    pub fn times_shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl OwnerWindow for HeadlessWindow {
    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }
}

/// A notification shown by a [`HeadlessTray`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub kind: MessageKind,
    pub title: Option<String>,
    pub message: String,
}

#[derive(Default)]
struct HeadlessState {
    published: bool,
    icon: Option<Bitmap>,
    icon_updates: usize,
    tooltip: Option<String>,
    primary_action: Option<Callback>,
    entries: Vec<NativeEntry>,
    messages: Vec<RecordedMessage>,
}

impl TrayBackend for HeadlessState {
    fn publish(&mut self, icon: &Bitmap, tooltip: Option<&str>) -> Result<()> {
        self.published = true;
        self.icon = Some(icon.clone());
        self.tooltip = tooltip.map(ToString::to_string);
        Ok(())
    }

    fn unpublish(&mut self) {
        self.published = false;
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn set_icon(&mut self, icon: &Bitmap) -> Result<()> {
        self.icon = Some(icon.clone());
        self.icon_updates += 1;
        Ok(())
    }

    fn set_tooltip(&mut self, tooltip: Option<&str>) -> Result<()> {
        self.tooltip = tooltip.map(ToString::to_string);
        Ok(())
    }

    fn set_primary_action(&mut self, action: Option<Callback>) {
        self.primary_action = action;
    }

    fn insert(&mut self, index: usize, entry: &NativeEntry) -> Result<()> {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry.clone());
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(anyhow!("no menu item at index {index}").into());
        }
        self.entries.remove(index);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn item_count(&self) -> usize {
        self.entries.len()
    }

    fn set_checked(&mut self, index: usize, value: bool) -> Result<()> {
        match self.entries.get_mut(index) {
            Some(NativeEntry::Check { checked, .. }) => {
                *checked = value;
                Ok(())
            }
            _ => Err(anyhow!("no check menu item at index {index}").into()),
        }
    }

    fn is_checked(&self, index: usize) -> Option<bool> {
        match self.entries.get(index) {
            Some(NativeEntry::Check { checked, .. }) => Some(*checked),
            _ => None,
        }
    }

    fn display_message(
        &mut self,
        kind: MessageKind,
        title: Option<&str>,
        message: &str,
    ) -> Result<()> {
        self.messages.push(RecordedMessage {
            kind,
            title: title.map(ToString::to_string),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// An in-memory system tray. Jobs run inline on the submitting thread.
#[derive(Clone)]
pub struct HeadlessTray {
    state: Arc<Mutex<HeadlessState>>,
    supported: bool,
}

impl Default for HeadlessTray {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessTray {
    pub fn new() -> Self {
        Self {
            state: Default::default(),
            supported: true,
        }
    }

    /// A desktop without a system tray.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// A toolkit backed by this tray that runs callbacks immediately.
    pub fn toolkit(&self) -> Toolkit {
        Toolkit::new(Arc::new(self.clone()), Arc::new(ImmediateSink::default()))
    }

    fn state(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_published(&self) -> bool {
        self.state().published
    }

    pub fn icon(&self) -> Option<Bitmap> {
        self.state().icon.clone()
    }

    /// How many times the icon was swapped after publishing.
    pub fn icon_updates(&self) -> usize {
        self.state().icon_updates
    }

    pub fn tooltip(&self) -> Option<String> {
        self.state().tooltip.clone()
    }

    pub fn entries(&self) -> Vec<NativeEntry> {
        self.state().entries.clone()
    }

    /// Labels of the top level entries, `None` for separators.
    pub fn labels(&self) -> Vec<Option<String>> {
        self.state()
            .entries
            .iter()
            .map(|entry| entry.label().map(ToString::to_string))
            .collect()
    }

    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.state().messages.clone()
    }

    pub fn has_primary_action(&self) -> bool {
        self.state().primary_action.is_some()
    }

    /// Clicks the top level entry at `index`, returns `false` if it is missing, disabled or not
    /// clickable.
    pub fn click(&self, index: usize) -> bool {
        self.click_path(&[index])
    }

    /// Clicks an entry nested in submenus, `path` holds the index at every level.
    pub fn click_path(&self, path: &[usize]) -> bool {
        let action = {
            let mut state = self.state();
            let Some((first, rest)) = path.split_first() else {
                return false;
            };

            let mut entry = state.entries.get_mut(*first);
            for index in rest {
                entry = match entry {
                    Some(NativeEntry::Submenu { children, .. }) => children.get_mut(*index),
                    _ => None,
                };
            }

            match entry {
                Some(NativeEntry::Action {
                    enabled: true,
                    action,
                    ..
                }) => Some(action.clone()),
                Some(NativeEntry::Check {
                    enabled: true,
                    checked,
                    action,
                    ..
                }) => {
                    *checked = !*checked;
                    Some(action.clone())
                }
                _ => None,
            }
        };

        // the state lock is released, the action may queue more jobs
        match action {
            Some(action) => {
                if let Some(action) = action {
                    action();
                }
                true
            }
            None => false,
        }
    }

    /// Clicks the tray icon itself.
    pub fn click_icon(&self) -> bool {
        let action = self.state().primary_action.clone();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }
}

impl TrayQueue for HeadlessTray {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn submit(&self, job: Job) {
        let mut state = self.state();
        job(&mut *state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::run_job;

    fn action(label: &str) -> NativeEntry {
        NativeEntry::Action {
            label: label.into(),
            enabled: true,
            bold: false,
            action: None,
        }
    }

    #[test]
    fn jobs_run_in_submission_order() {
        let tray = HeadlessTray::new();
        for (index, label) in ["a", "b", "c"].into_iter().enumerate() {
            let entry = action(label);
            let _ = run_job(&tray, move |backend| backend.insert(index, &entry));
        }

        let labels = tray.labels();
        assert_eq!(
            labels,
            vec![Some("a".into()), Some("b".into()), Some("c".into())]
        );
    }

    #[test]
    fn removing_missing_index_fails() {
        let tray = HeadlessTray::new();
        let completion = run_job(&tray, |backend| backend.remove(3));
        assert!(completion.wait().is_err());
    }

    #[test]
    fn clicking_check_item_toggles_it() {
        let tray = HeadlessTray::new();
        let entry = NativeEntry::Check {
            label: "Wrap".into(),
            enabled: true,
            checked: false,
            action: None,
        };
        run_job(&tray, move |backend| backend.insert(0, &entry))
            .wait()
            .unwrap();

        assert!(tray.click(0));
        let checked = run_job(&tray, |backend| Ok(backend.is_checked(0)));
        assert_eq!(checked.wait().unwrap(), Some(true));
    }

    #[test]
    fn queued_sink_runs_nested_tasks() {
        let sink = Arc::new(QueuedSink::default());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_sink = sink.clone();
        let inner_counter = counter.clone();
        sink.dispatch(Box::new(move || {
            inner_counter.fetch_add(1, Ordering::SeqCst);
            let counter = inner_counter.clone();
            inner_sink.dispatch(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(sink.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
