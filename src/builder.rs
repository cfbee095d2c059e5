use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::{OwnerWindow, Toolkit};
use crate::error::Result;
use crate::icon::{IconScale, IconSource};
use crate::menu::{Callback, Menu, MenuItem};
use crate::tray::TrayIcon;

enum PendingEntry {
    Item(MenuItem),
    Menu(Menu),
    Separator,
}

/// Menu entries recorded before the tray icon exists, in the order they were recorded.
#[derive(Default)]
struct BuildSequence {
    entries: Vec<PendingEntry>,
}

impl BuildSequence {
    fn record(&mut self, entry: PendingEntry) {
        self.entries.push(entry);
    }

    fn replay(self, tray: &TrayIcon) -> Result<()> {
        for entry in self.entries {
            match entry {
                PendingEntry::Item(item) => {
                    tray.add_menu_item(item)?;
                }
                PendingEntry::Menu(menu) => {
                    tray.add_menu(menu)?;
                }
                PendingEntry::Separator => {
                    tray.add_separator();
                }
            }
        }
        Ok(())
    }
}

struct ExitEntry {
    label: Option<String>,
    handler: Option<Callback>,
}

/// Builds a [`TrayIcon`] in one expression.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use tray_bridge::{headless::{HeadlessTray, HeadlessWindow}, menu::MenuItem, TrayBuilder};
/// let tray = HeadlessTray::new();
/// let icon = TrayBuilder::new(tray.toolkit())
///     .owner(Arc::new(HeadlessWindow::new("Notes")))
///     .menu_item_with("New note", || println!("new note"))
///     .separator()
///     .menu("Recent", [MenuItem::new("todo.txt")])
///     .add_exit_menu_item()
///     .show()
///     .build()?;
/// # Ok::<(), tray_bridge::Error>(())
/// ```
pub struct TrayBuilder {
    toolkit: Toolkit,
    owner: Option<Arc<dyn OwnerWindow>>,
    icon: Option<IconSource>,
    icon_scale: Option<IconScale>,
    application_title: Option<String>,
    tooltip: Option<String>,
    sequence: BuildSequence,
    exit: Option<ExitEntry>,
    title_item: bool,
    default_click: bool,
    on_action: Option<Callback>,
    animation: Option<(Vec<IconSource>, Duration)>,
    show: bool,
}

impl TrayBuilder {
    pub fn new(toolkit: Toolkit) -> Self {
        Self {
            toolkit,
            owner: None,
            icon: None,
            icon_scale: None,
            application_title: None,
            tooltip: None,
            sequence: BuildSequence::default(),
            exit: None,
            title_item: false,
            default_click: true,
            on_action: None,
            animation: None,
            show: false,
        }
    }

    pub fn owner(mut self, owner: Arc<dyn OwnerWindow>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn icon(mut self, icon: impl Into<IconSource>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn icon_size(mut self, width: u32, height: u32) -> Self {
        self.icon_scale = Some(IconScale::new(width, height));
        self
    }

    pub fn application_title(mut self, title: impl Into<String>) -> Self {
        self.application_title = Some(title.into());
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn menu_item(mut self, item: MenuItem) -> Self {
        self.sequence.record(PendingEntry::Item(item));
        self
    }

    pub fn menu_items(mut self, items: impl IntoIterator<Item = MenuItem>) -> Self {
        for item in items {
            self.sequence.record(PendingEntry::Item(item));
        }
        self
    }

    pub fn menu_item_with<F>(self, label: impl Into<String>, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.menu_item(MenuItem::new(label).with_action(f))
    }

    pub fn check_menu_item(self, label: impl Into<String>, selected: bool) -> Self {
        self.menu_item(MenuItem::check(label, selected))
    }

    /// Adds a submenu labelled `label` holding `items`.
    pub fn menu(self, label: impl Into<String>, items: impl IntoIterator<Item = MenuItem>) -> Self {
        self.add_menu(Menu::with_items(label, items))
    }

    pub fn add_menu(mut self, menu: Menu) -> Self {
        self.sequence.record(PendingEntry::Menu(menu));
        self
    }

    pub fn separator(mut self) -> Self {
        self.sequence.record(PendingEntry::Separator);
        self
    }

    pub fn add_exit_menu_item(mut self) -> Self {
        self.exit = Some(ExitEntry {
            label: None,
            handler: None,
        });
        self
    }

    pub fn exit_menu_item_with<F>(mut self, label: impl Into<String>, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.exit = Some(ExitEntry {
            label: Some(label.into()),
            handler: Some(Arc::new(f)),
        });
        self
    }

    /// Like [`Self::add_exit_menu_item`] with a custom label.
    pub fn exit_menu_item_labelled(mut self, label: impl Into<String>) -> Self {
        self.exit = Some(ExitEntry {
            label: Some(label.into()),
            handler: None,
        });
        self
    }

    pub fn add_title_item(mut self) -> Self {
        self.title_item = true;
        self
    }

    pub fn default_click(mut self, enabled: bool) -> Self {
        self.default_click = enabled;
        self
    }

    pub fn on_action<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_action = Some(Arc::new(f));
        self
    }

    /// Plays `frames` as soon as the icon is built.
    pub fn animation(
        mut self,
        frames: impl IntoIterator<Item = IconSource>,
        interval: Duration,
    ) -> Self {
        self.animation = Some((frames.into_iter().collect(), interval));
        self
    }

    /// Shows the icon once it is built.
    pub fn show(mut self) -> Self {
        self.show = true;
        self
    }

    /// Creates the tray icon and adds the recorded menu entries in recording order.
    pub fn build(self) -> Result<TrayIcon> {
        let tray = match self.icon_scale {
            Some(scale) => TrayIcon::with_scale(self.toolkit, self.owner, self.icon, scale)?,
            None => TrayIcon::new(self.toolkit, self.owner, self.icon)?,
        };

        if let Some(title) = self.application_title {
            tray.set_application_title(title);
        }
        if let Some(tooltip) = self.tooltip {
            let _ = tray.set_tooltip(tooltip);
        }

        match self.exit {
            Some(ExitEntry {
                label: Some(label),
                handler,
            }) => tray.add_exit_item_with(label, handler),
            Some(ExitEntry { label: None, .. }) => tray.add_exit_item(true),
            None => {}
        }

        tray.add_title_item(self.title_item);
        let _ = tray.set_default_click(self.default_click);
        if let Some(on_action) = self.on_action {
            let _ = tray.set_on_action(move || on_action());
        }

        self.sequence.replay(&tray)?;

        if let Some((frames, interval)) = self.animation {
            tray.new_animation(frames, interval, true)?;
        }

        if self.show {
            let _ = tray.show();
        }

        tracing::debug!("Built tray icon with {} menu items", tray.menu_item_count());

        Ok(tray)
    }
}
