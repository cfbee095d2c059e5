use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use strum::Display;

use crate::animation::{AnimationStatus, Animator, FrameSet, FrameSink};
use crate::convert::{convert_entry, convert_item, convert_menu, marshal};
use crate::dispatch::{
    run_job, Completion, EventSink, MessageKind, OwnerWindow, Toolkit, TrayBackend, TrayQueue,
};
use crate::error::{Error, Result};
use crate::icon::{self, Bitmap, IconScale, IconSource};
use crate::menu::{Callback, Menu, MenuEntry, MenuItem, NativeEntry};
use crate::platform::{NotificationStrategy, PlatformProfile};

pub const DEFAULT_TITLE_LABEL: &str = "Show Application";
pub const DEFAULT_EXIT_LABEL: &str = "Exit Application";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TrayState {
    /// Created but never shown.
    Unrealized,
    Shown,
    Hidden,
}

struct ExitItem {
    label: String,
    handler: Option<Callback>,
}

struct Inner {
    state: TrayState,
    icon_scale: IconScale,
    /// Icon restored by [`TrayIcon::reset_icon`].
    default_icon: Bitmap,
    current_icon: Bitmap,
    tooltip: Option<String>,
    app_title: Option<String>,
    /// Mirror of the popup menu, in order.
    entries: Vec<NativeEntry>,
    title_item: bool,
    exit_item: Option<ExitItem>,
    // the title entry sits at index 0 and the exit entry at the end while pinned
    title_pinned: bool,
    exit_pinned: bool,
    default_click: bool,
    // false while shown through show_minimal
    shown_with_defaults: bool,
    on_action: Option<Callback>,
}

impl Inner {
    /// Where appended entries go, above a pinned exit entry.
    fn append_index(&self) -> usize {
        if self.exit_pinned {
            self.entries.len().saturating_sub(1)
        } else {
            self.entries.len()
        }
    }

    fn insert_index(&self, index: usize) -> usize {
        index.min(self.append_index())
    }

    fn has_unique_label(&self, label: &str) -> bool {
        !self.entries.iter().any(|entry| entry.label() == Some(label))
    }

    /// The last entry with this label.
    fn position(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.label() == Some(label))
    }

    fn check_position(&self, label: &str) -> Option<usize> {
        self.entries.iter().position(
            |entry| matches!(entry, NativeEntry::Check { label: l, .. } if l == label),
        )
    }
}

struct Shared {
    queue: Arc<dyn TrayQueue>,
    sink: Arc<dyn EventSink>,
    owner: Arc<dyn OwnerWindow>,
    profile: PlatformProfile,
    inner: Mutex<Inner>,
    animator: Mutex<Option<Animator>>,
}

/// A system tray icon with a popup menu.
///
/// Menu contents are validated against the icon's own copy of the menu, then applied to the
/// native tray through its [`TrayQueue`]. Mutations return a [`Completion`] that resolves once the
/// native tray has been updated.
#[derive(Clone)]
pub struct TrayIcon {
    shared: Arc<Shared>,
}

impl TrayIcon {
    /// Creates a tray icon scaled to the platform's default icon size.
    ///
    /// Without an icon source the bundled default icon is used.
    pub fn new(
        toolkit: Toolkit,
        owner: Option<Arc<dyn OwnerWindow>>,
        icon: Option<IconSource>,
    ) -> Result<Self> {
        let scale = toolkit.profile.icon_scale;
        Self::with_scale(toolkit, owner, icon, scale)
    }

    pub fn with_size(
        toolkit: Toolkit,
        owner: Option<Arc<dyn OwnerWindow>>,
        icon: Option<IconSource>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        Self::with_scale(toolkit, owner, icon, IconScale::new(width, height))
    }

    pub fn with_scale(
        toolkit: Toolkit,
        owner: Option<Arc<dyn OwnerWindow>>,
        icon: Option<IconSource>,
        icon_scale: IconScale,
    ) -> Result<Self> {
        if !toolkit.is_supported() {
            return Err(Error::TrayUnsupported);
        }

        let owner = owner.ok_or(Error::MissingOwner)?;
        let bitmap = icon::load(icon, icon_scale)?;
        let tooltip = owner.title().filter(|title| !title.is_empty());

        tracing::debug!(
            "Creating tray icon ({}x{}) for {:?}",
            icon_scale.width,
            icon_scale.height,
            tooltip
        );

        let inner = Inner {
            state: TrayState::Unrealized,
            icon_scale,
            default_icon: bitmap.clone(),
            current_icon: bitmap,
            tooltip,
            app_title: None,
            entries: Vec::new(),
            title_item: false,
            exit_item: None,
            title_pinned: false,
            exit_pinned: false,
            default_click: true,
            shown_with_defaults: false,
            on_action: None,
        };

        let shared = Shared {
            queue: toolkit.queue,
            sink: toolkit.sink,
            owner,
            profile: toolkit.profile,
            inner: Mutex::new(inner),
            animator: Mutex::new(None),
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Whether `toolkit` can host a tray icon at all. Never fails.
    pub fn is_supported(toolkit: &Toolkit) -> bool {
        toolkit.is_supported()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Jobs are submitted while `inner` is locked so the native menu sees mutations in the same
    // order as the mirror.
    fn submit<T, F>(&self, f: F) -> Completion<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn TrayBackend) -> Result<T> + Send + 'static,
    {
        run_job(&*self.shared.queue, f)
    }

    fn show_owner_action(&self) -> Callback {
        let owner = self.shared.owner.clone();
        let sink = self.shared.sink.clone();
        Arc::new(move || {
            let owner = owner.clone();
            sink.dispatch(Box::new(move || owner.show()));
        })
    }

    fn title_entry(&self, inner: &Inner) -> NativeEntry {
        let label = inner
            .app_title
            .clone()
            .or_else(|| self.shared.owner.title().filter(|t| !t.is_empty()))
            .unwrap_or_else(|| DEFAULT_TITLE_LABEL.to_string());

        NativeEntry::Action {
            label,
            enabled: true,
            bold: true,
            action: Some(self.show_owner_action()),
        }
    }

    fn exit_entry(&self, exit: &ExitItem) -> NativeEntry {
        let shared = Arc::downgrade(&self.shared);
        let handler = exit.handler.clone();

        let action: Callback = Arc::new(move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };

            let tray = TrayIcon { shared };
            let _ = tray.hide();

            match &handler {
                Some(handler) => {
                    let handler = handler.clone();
                    tray.shared.sink.dispatch(Box::new(move || handler()));
                }
                None => tray.shared.sink.request_exit(),
            }
        });

        NativeEntry::Action {
            label: exit.label.clone(),
            enabled: true,
            bold: false,
            action: Some(action),
        }
    }

    fn primary_action(&self, inner: &Inner, with_defaults: bool) -> Option<Callback> {
        match &inner.on_action {
            Some(on_action) => Some(marshal(on_action, &self.shared.sink)),
            None if with_defaults && inner.default_click => Some(self.show_owner_action()),
            None => None,
        }
    }

    /// Publishes the icon to the system tray.
    ///
    /// Adds the title and exit entries when they were requested with [`Self::add_title_item`] and
    /// [`Self::add_exit_item`], and makes a click on the icon show the owner window unless
    /// [`Self::set_default_click`] turned that off.
    pub fn show(&self) -> Completion {
        self.publish(true)
    }

    /// Publishes the icon without the title and exit entries or the default click action.
    pub fn show_minimal(&self) -> Completion {
        self.publish(false)
    }

    fn publish(&self, with_defaults: bool) -> Completion {
        let mut inner = self.inner();
        if inner.state == TrayState::Shown {
            return Completion::ready(Ok(()));
        }

        let mut inserts = Vec::new();

        if with_defaults && inner.title_item && !inner.title_pinned {
            let entry = self.title_entry(&inner);
            inner.entries.insert(0, entry.clone());
            inner.title_pinned = true;
            inserts.push((0, entry));
        }

        if with_defaults && !inner.exit_pinned {
            if let Some(exit) = &inner.exit_item {
                let entry = self.exit_entry(exit);
                let index = inner.entries.len();
                inner.entries.push(entry.clone());
                inner.exit_pinned = true;
                inserts.push((index, entry));
            }
        }

        let primary = self.primary_action(&inner, with_defaults);
        let icon = inner.current_icon.clone();
        let tooltip = inner.tooltip.clone();
        inner.state = TrayState::Shown;
        inner.shown_with_defaults = with_defaults;

        tracing::debug!("Showing tray icon with {} menu items", inner.entries.len());

        self.submit(move |backend| {
            for (index, entry) in &inserts {
                backend.insert(*index, entry)?;
            }
            backend.set_primary_action(primary);
            backend.publish(&icon, tooltip.as_deref())
        })
    }

    /// Removes the icon from the system tray. Does nothing unless the icon is showing.
    pub fn hide(&self) -> Completion {
        let mut inner = self.inner();
        if inner.state != TrayState::Shown {
            return Completion::ready(Ok(()));
        }

        inner.state = TrayState::Hidden;
        tracing::debug!("Hiding tray icon");

        self.submit(|backend| {
            backend.unpublish();
            Ok(())
        })
    }

    fn insert_entry(&self, index: Option<usize>, entry: NativeEntry) -> Result<Completion> {
        let mut inner = self.inner();

        if entry.is_unique_labelled() {
            let label = entry.label().unwrap_or_default();
            if !inner.has_unique_label(label) {
                return Err(Error::DuplicateLabel(label.to_string()));
            }
        }

        Ok(self.insert_locked(&mut inner, index, entry))
    }

    fn insert_locked(
        &self,
        inner: &mut Inner,
        index: Option<usize>,
        entry: NativeEntry,
    ) -> Completion {
        let index = match index {
            Some(index) => inner.insert_index(index),
            None => inner.append_index(),
        };

        tracing::trace!("Inserting menu item {:?} at {index}", entry.label());

        inner.entries.insert(index, entry.clone());
        self.submit(move |backend| backend.insert(index, &entry))
    }

    /// Appends an entry to the popup menu, above the exit entry if it is showing.
    ///
    /// Fails if the item uses features a tray menu can't display, or if a top level item with the
    /// same label already exists.
    pub fn add_menu_item(&self, entry: impl Into<MenuEntry>) -> Result<Completion> {
        match entry.into() {
            MenuEntry::Item(item) => {
                let entry = convert_item(&item, &self.shared.sink)?;
                self.insert_entry(None, entry)
            }
            MenuEntry::Menu(menu) => self.add_menu(menu),
            MenuEntry::Separator => Ok(self.add_separator()),
        }
    }

    /// Appends several items. Either all of them are added or, on error, none.
    pub fn add_menu_items<I>(&self, items: I) -> Result<Completion>
    where
        I: IntoIterator<Item = MenuItem>,
    {
        let entries = items
            .into_iter()
            .map(|item| convert_item(&item, &self.shared.sink))
            .collect::<Result<Vec<_>>>()?;

        let mut inner = self.inner();

        let mut batch: Vec<&str> = Vec::new();
        for entry in entries.iter().filter(|entry| entry.is_unique_labelled()) {
            let label = entry.label().unwrap_or_default();
            if !inner.has_unique_label(label) || batch.contains(&label) {
                return Err(Error::DuplicateLabel(label.to_string()));
            }
            batch.push(label);
        }

        let start = inner.append_index();
        for (offset, entry) in entries.iter().enumerate() {
            inner.entries.insert(start + offset, entry.clone());
        }

        tracing::trace!("Inserting {} menu items at {start}", entries.len());

        Ok(self.submit(move |backend| {
            entries
                .iter()
                .enumerate()
                .try_for_each(|(offset, entry)| backend.insert(start + offset, entry))
        }))
    }

    /// Inserts an entry at `index`, indices past the end (or past the exit entry) append.
    pub fn insert_menu_item(&self, entry: impl Into<MenuEntry>, index: usize) -> Result<Completion> {
        let entry = convert_entry(&entry.into(), &self.shared.sink)?;
        self.insert_entry(Some(index), entry)
    }

    /// Appends a submenu. Labels inside submenus don't need to be unique.
    pub fn add_menu(&self, menu: Menu) -> Result<Completion> {
        let entry = convert_menu(&menu, &self.shared.sink)?;
        self.insert_entry(None, entry)
    }

    pub fn add_separator(&self) -> Completion {
        let mut inner = self.inner();
        self.insert_locked(&mut inner, None, NativeEntry::Separator)
    }

    pub fn insert_separator(&self, index: usize) -> Completion {
        let mut inner = self.inner();
        self.insert_locked(&mut inner, Some(index), NativeEntry::Separator)
    }

    fn remove_locked(&self, inner: &mut Inner, index: usize) -> Completion {
        let last = inner.entries.len() - 1;
        inner.entries.remove(index);

        if inner.title_pinned && index == 0 {
            inner.title_pinned = false;
        }
        if inner.exit_pinned && index == last {
            inner.exit_pinned = false;
        }

        tracing::trace!("Removing menu item at {index}");
        self.submit(move |backend| backend.remove(index))
    }

    /// Removes the entry at `index`, does nothing if there is none.
    pub fn remove_menu_item_at(&self, index: usize) -> Completion {
        let mut inner = self.inner();
        if index >= inner.entries.len() {
            return Completion::ready(Ok(()));
        }
        self.remove_locked(&mut inner, index)
    }

    /// Removes the top level entry whose label equals the item's text, does nothing if there is none.
    pub fn remove_menu_item(&self, item: &MenuItem) -> Completion {
        self.remove_labelled(item.text())
    }

    pub fn remove_labelled(&self, label: &str) -> Completion {
        let mut inner = self.inner();
        match inner.position(label) {
            Some(index) => self.remove_locked(&mut inner, index),
            None => Completion::ready(Ok(())),
        }
    }

    /// Removes every entry, including the title and exit entries.
    pub fn clear(&self) -> Completion {
        let mut inner = self.inner();
        inner.entries.clear();
        inner.title_pinned = false;
        inner.exit_pinned = false;

        tracing::trace!("Clearing menu");
        self.submit(|backend| backend.clear())
    }

    pub fn set_checked(&self, label: &str, value: bool) -> Completion {
        let mut inner = self.inner();
        let Some(index) = inner.check_position(label) else {
            return Completion::ready(Ok(()));
        };

        if let Some(NativeEntry::Check { checked, .. }) = inner.entries.get_mut(index) {
            *checked = value;
        }

        self.submit(move |backend| backend.set_checked(index, value))
    }

    /// Checked state of the check item labelled `label` as the native menu sees it.
    pub fn is_checked(&self, label: &str) -> Completion<Option<bool>> {
        let inner = self.inner();
        match inner.check_position(label) {
            Some(index) => self.submit(move |backend| Ok(backend.is_checked(index))),
            None => Completion::ready(Ok(None)),
        }
    }

    fn load_icon(&self, source: IconSource, scale: Option<IconScale>) -> Result<Bitmap> {
        let scale = scale.unwrap_or_else(|| self.inner().icon_scale);
        icon::load(Some(source), scale)
    }

    fn replace_icon(&self, bitmap: Bitmap, as_default: bool) -> Completion {
        let mut inner = self.inner();
        if as_default {
            inner.default_icon = bitmap.clone();
        }
        inner.current_icon = bitmap.clone();
        self.submit(move |backend| backend.set_icon(&bitmap))
    }

    /// Replaces the icon, and the icon [`Self::reset_icon`] goes back to.
    ///
    /// A playing animation keeps swapping frames over it.
    pub fn set_graphic(&self, source: impl Into<IconSource>) -> Result<Completion> {
        let bitmap = self.load_icon(source.into(), None)?;
        Ok(self.replace_icon(bitmap, true))
    }

    pub fn set_graphic_scaled(
        &self,
        source: impl Into<IconSource>,
        width: u32,
        height: u32,
    ) -> Result<Completion> {
        let bitmap = self.load_icon(source.into(), Some(IconScale::new(width, height)))?;
        Ok(self.replace_icon(bitmap, true))
    }

    fn set_animation_frame(&self, frame: &Bitmap) {
        let _ = self.replace_icon(frame.clone(), false);
    }

    /// Goes back to the icon given at construction or by the last [`Self::set_graphic`].
    pub fn reset_icon(&self) -> Completion {
        let default = self.inner().default_icon.clone();
        self.replace_icon(default, false)
    }

    pub fn set_tooltip(&self, tooltip: impl Into<String>) -> Completion {
        let tooltip = tooltip.into();
        let mut inner = self.inner();
        inner.tooltip = Some(tooltip.clone());
        self.submit(move |backend| backend.set_tooltip(Some(&tooltip)))
    }

    /// Title used for the title entry instead of the owner window's title.
    pub fn set_application_title(&self, title: impl Into<String>) {
        self.inner().app_title = Some(title.into());
    }

    /// Adds an "Exit Application" entry at the end of the menu on [`Self::show`]. It removes the
    /// icon from the tray and asks the application to exit.
    pub fn add_exit_item(&self, add: bool) {
        self.inner().exit_item = add.then(|| ExitItem {
            label: DEFAULT_EXIT_LABEL.to_string(),
            handler: None,
        });
    }

    /// Like [`Self::add_exit_item`] with a custom label, and `handler` running instead of the
    /// application exit request.
    pub fn add_exit_item_with(&self, label: impl Into<String>, handler: Option<Callback>) {
        self.inner().exit_item = Some(ExitItem {
            label: label.into(),
            handler,
        });
    }

    /// Adds a bold entry showing the owner window at the top of the menu on [`Self::show`].
    pub fn add_title_item(&self, add: bool) {
        self.inner().title_item = add;
    }

    /// Whether clicking the icon shows the owner window when no action was set.
    pub fn set_default_click(&self, enabled: bool) -> Completion {
        let mut inner = self.inner();
        inner.default_click = enabled;
        if inner.state != TrayState::Shown {
            return Completion::ready(Ok(()));
        }

        let primary = self.primary_action(&inner, inner.shown_with_defaults);
        self.submit(move |backend| {
            backend.set_primary_action(primary);
            Ok(())
        })
    }

    /// Runs `f` on the application's event thread when the icon is clicked.
    pub fn set_on_action<F>(&self, f: F) -> Completion
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner();
        let callback: Callback = Arc::new(f);
        inner.on_action = Some(callback.clone());

        let action = marshal(&callback, &self.shared.sink);
        self.submit(move |backend| {
            backend.set_primary_action(Some(action));
            Ok(())
        })
    }

    fn notify(&self, kind: MessageKind, title: Option<&str>, message: &str) -> Result<Completion> {
        match &self.shared.profile.notifications {
            NotificationStrategy::Balloon => {
                let title = title.map(ToString::to_string);
                let message = message.to_string();
                Ok(self.submit(move |backend| {
                    backend.display_message(kind, title.as_deref(), &message)
                }))
            }
            NotificationStrategy::Script { program } => {
                notify_with_script(program, kind, title, message)?;
                Ok(Completion::ready(Ok(())))
            }
        }
    }

    pub fn show_info_message(&self, title: Option<&str>, message: &str) -> Result<Completion> {
        self.notify(MessageKind::Info, title, message)
    }

    pub fn show_warning_message(&self, title: Option<&str>, message: &str) -> Result<Completion> {
        self.notify(MessageKind::Warning, title, message)
    }

    pub fn show_error_message(&self, title: Option<&str>, message: &str) -> Result<Completion> {
        self.notify(MessageKind::Error, title, message)
    }

    pub fn show_message(&self, title: Option<&str>, message: &str) -> Result<Completion> {
        self.notify(MessageKind::Plain, title, message)
    }

    /// Replaces the current animation with `frames`, scaled to the icon size.
    pub fn new_animation<I>(&self, frames: I, interval: Duration, play: bool) -> Result<()>
    where
        I: IntoIterator<Item = IconSource>,
    {
        let scale = self.inner().icon_scale;
        let frames = frames
            .into_iter()
            .map(|source| icon::load(Some(source), scale))
            .collect::<Result<Vec<_>>>()?;
        let frames = FrameSet::new(frames)?;

        let shared = Arc::downgrade(&self.shared);
        let apply: FrameSink = Arc::new(move |frame: &Bitmap| {
            if let Some(shared) = shared.upgrade() {
                TrayIcon { shared }.set_animation_frame(frame);
            }
        });

        tracing::debug!("New animation with {} frames every {interval:?}", frames.len());

        let animator = Animator::new(frames, interval, apply);
        let previous = self
            .shared
            .animator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(animator.clone());

        if let Some(previous) = previous {
            previous.stop();
        }

        if play {
            animator.play();
        }

        Ok(())
    }

    fn animator(&self) -> Option<Animator> {
        self.shared
            .animator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn play(&self) {
        if let Some(animator) = self.animator() {
            animator.play();
        }
    }

    pub fn play_from_start(&self) {
        if let Some(animator) = self.animator() {
            animator.play_from_start();
        }
    }

    pub fn pause(&self) {
        if let Some(animator) = self.animator() {
            animator.pause();
        }
    }

    pub fn pause_resume(&self) {
        if let Some(animator) = self.animator() {
            animator.pause_resume();
        }
    }

    pub fn stop(&self) {
        if let Some(animator) = self.animator() {
            animator.stop();
        }
    }

    /// Stops the animation and goes back to the default icon.
    pub fn stop_reset(&self) -> Completion {
        self.stop();
        self.reset_icon()
    }

    /// Shows the next animation frame right away.
    pub fn step_animation(&self) {
        if let Some(animator) = self.animator() {
            animator.step();
        }
    }

    pub fn animation_status(&self) -> Option<AnimationStatus> {
        self.animator().map(|animator| animator.status())
    }

    pub fn state(&self) -> TrayState {
        self.inner().state
    }

    pub fn is_showing(&self) -> bool {
        self.state() == TrayState::Shown
    }

    /// Whether the icon is showing with a non empty popup menu.
    pub fn is_menu_showing(&self) -> bool {
        let inner = self.inner();
        inner.state == TrayState::Shown && !inner.entries.is_empty()
    }

    pub fn menu_item_count(&self) -> usize {
        self.inner().entries.len()
    }

    /// Labels of the top level entries, `None` for separators.
    pub fn menu_labels(&self) -> Vec<Option<String>> {
        self.inner()
            .entries
            .iter()
            .map(|entry| entry.label().map(ToString::to_string))
            .collect()
    }

    pub fn menu_item_label(&self, index: usize) -> Option<String> {
        self.inner()
            .entries
            .get(index)
            .and_then(|entry| entry.label().map(ToString::to_string))
    }

    pub fn current_icon(&self) -> Bitmap {
        self.inner().current_icon.clone()
    }

    pub fn icon_scale(&self) -> IconScale {
        self.inner().icon_scale
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.shared.profile
    }
}

fn escape_script(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// AppleScript posting a notification banner.
pub fn notification_script(kind: MessageKind, title: Option<&str>, message: &str) -> String {
    format!(
        "display notification \"{}\" with title \"{}\" subtitle \"{}\"",
        escape_script(message),
        kind,
        escape_script(title.unwrap_or_default()),
    )
}

fn notify_with_script(
    program: &str,
    kind: MessageKind,
    title: Option<&str>,
    message: &str,
) -> Result<()> {
    let script = notification_script(kind, title, message);

    let mut child = std::process::Command::new(program)
        .arg("-e")
        .arg(&script)
        .spawn()
        .map_err(|source| Error::Notification {
            program: program.to_string(),
            source,
        })?;

    tracing::trace!("Posted notification through {program}");

    // reap the child without blocking the caller
    std::thread::spawn(move || {
        if let Err(e) = child.wait() {
            tracing::error!("Failed to wait for notification process: {e}");
        }
    });

    Ok(())
}
