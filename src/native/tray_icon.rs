use tray_icon::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};

use crate::dispatch::{MessageKind, TrayBackend};
use crate::error::Result;
use crate::icon::Bitmap;
use crate::menu::{Callback, NativeEntry};
use crate::native::backend_error;
use crate::native::context_menu::ContextMenu;

fn native_icon(icon: &Bitmap) -> Result<tray_icon::Icon> {
    tray_icon::Icon::from_rgba(icon.rgba().to_vec(), icon.width(), icon.height())
        .map_err(backend_error("Invalid tray icon"))
}

/// The tray icon as the OS sees it. Lives on the event loop thread.
pub struct NativeTray {
    icon: Option<tray_icon::TrayIcon>,
    context_menu: ContextMenu,
    primary_action: Option<Callback>,
    app_name: String,
}

impl NativeTray {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            icon: None,
            context_menu: ContextMenu::new(),
            primary_action: None,
            app_name: app_name.into(),
        }
    }

    pub fn handle_menu_event(&self, event: &muda::MenuEvent) -> Option<Callback> {
        self.context_menu.handle_menu_event(event)
    }

    // tray-icon emits no click events on linux, so the primary action never fires there
    pub fn handle_tray_event(&self, event: &TrayIconEvent) -> Option<Callback> {
        match event {
            TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } => self.primary_action.clone(),
            _ => None,
        }
    }
}

impl TrayBackend for NativeTray {
    fn publish(&mut self, icon: &Bitmap, tooltip: Option<&str>) -> Result<()> {
        let mut builder = TrayIconBuilder::new()
            .with_icon(native_icon(icon)?)
            .with_menu(Box::new(self.context_menu.menu.clone()))
            .with_menu_on_left_click(self.primary_action.is_none());

        if let Some(tooltip) = tooltip {
            builder = builder.with_tooltip(tooltip);
        }

        let tray = builder
            .build()
            .map_err(backend_error("Failed to create tray icon"))?;

        self.icon = Some(tray);
        tracing::debug!("Tray icon added to the system tray");

        Ok(())
    }

    fn unpublish(&mut self) {
        if self.icon.take().is_some() {
            tracing::debug!("Tray icon removed from the system tray");
        }
    }

    fn is_published(&self) -> bool {
        self.icon.is_some()
    }

    fn set_icon(&mut self, icon: &Bitmap) -> Result<()> {
        match &self.icon {
            Some(tray) => tray
                .set_icon(Some(native_icon(icon)?))
                .map_err(backend_error("Failed to set tray icon")),
            None => Ok(()),
        }
    }

    fn set_tooltip(&mut self, tooltip: Option<&str>) -> Result<()> {
        match &self.icon {
            Some(tray) => tray
                .set_tooltip(tooltip)
                .map_err(backend_error("Failed to set tray tooltip")),
            None => Ok(()),
        }
    }

    fn set_primary_action(&mut self, action: Option<Callback>) {
        if let Some(tray) = &self.icon {
            tray.set_show_menu_on_left_click(action.is_none());
        }
        self.primary_action = action;
    }

    fn insert(&mut self, index: usize, entry: &NativeEntry) -> Result<()> {
        self.context_menu.insert(index, entry)
    }

    fn remove(&mut self, index: usize) -> Result<()> {
        self.context_menu.remove(index)
    }

    fn clear(&mut self) -> Result<()> {
        self.context_menu.clear()
    }

    fn item_count(&self) -> usize {
        self.context_menu.len()
    }

    fn set_checked(&mut self, index: usize, checked: bool) -> Result<()> {
        self.context_menu.set_checked(index, checked)
    }

    fn is_checked(&self, index: usize) -> Option<bool> {
        self.context_menu.is_checked(index)
    }

    fn display_message(
        &mut self,
        kind: MessageKind,
        title: Option<&str>,
        message: &str,
    ) -> Result<()> {
        let summary = match title {
            Some(title) => title.to_string(),
            None => kind.to_string(),
        };

        let mut notification = notify_rust::Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&summary)
            .body(message);

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(match kind {
            MessageKind::Error => notify_rust::Urgency::Critical,
            _ => notify_rust::Urgency::Normal,
        });

        notification
            .show()
            .map(|_| ())
            .map_err(backend_error("Failed to show notification"))
    }
}
