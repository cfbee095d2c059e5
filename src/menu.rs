//! Application-side menu model.
//!
//! These are the types callers build their tray menu with. They carry more than a tray popup
//! menu can display (graphics, accelerators, styling), the [`convert`](crate::convert) module
//! rejects those.

use std::fmt;
use std::sync::Arc;

use crate::icon::Bitmap;

/// A click or validation handler.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Action,
    Check { selected: bool },
}

#[derive(Clone)]
pub struct MenuItem {
    pub(crate) text: String,
    pub(crate) disabled: bool,
    pub(crate) kind: ItemKind,
    pub(crate) on_action: Option<Callback>,
    pub(crate) graphic: Option<Bitmap>,
    pub(crate) accelerator: Option<String>,
    pub(crate) style: Option<String>,
    pub(crate) style_metadata: Vec<String>,
    pub(crate) on_validation: Option<Callback>,
}

impl MenuItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disabled: false,
            kind: ItemKind::Action,
            on_action: None,
            graphic: None,
            accelerator: None,
            style: None,
            style_metadata: Vec::new(),
            on_validation: None,
        }
    }

    /// A checkable item.
    pub fn check(text: impl Into<String>, selected: bool) -> Self {
        Self {
            kind: ItemKind::Check { selected },
            ..Self::new(text)
        }
    }

    pub fn with_action<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_action = Some(Arc::new(f));
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_graphic(mut self, graphic: Bitmap) -> Self {
        self.graphic = Some(graphic);
        self
    }

    pub fn with_accelerator(mut self, accelerator: impl Into<String>) -> Self {
        self.accelerator = Some(accelerator.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_style_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.style_metadata.push(metadata.into());
        self
    }

    pub fn with_validation<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_validation = Some(Arc::new(f));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("text", &self.text)
            .field("disabled", &self.disabled)
            .field("kind", &self.kind)
            .field("on_action", &self.on_action.is_some())
            .finish_non_exhaustive()
    }
}

/// A submenu.
#[derive(Debug, Clone)]
pub struct Menu {
    pub(crate) text: String,
    pub(crate) disabled: bool,
    pub(crate) items: Vec<MenuEntry>,
}

impl Menu {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disabled: false,
            items: Vec::new(),
        }
    }

    pub fn with_items<I, E>(text: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<MenuEntry>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            ..Self::new(text)
        }
    }

    pub fn item(mut self, item: MenuItem) -> Self {
        self.items.push(MenuEntry::Item(item));
        self
    }

    pub fn menu(mut self, menu: Menu) -> Self {
        self.items.push(MenuEntry::Menu(menu));
        self
    }

    pub fn separator(mut self) -> Self {
        self.items.push(MenuEntry::Separator);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn items(&self) -> &[MenuEntry] {
        &self.items
    }
}

#[derive(Debug, Clone)]
pub enum MenuEntry {
    Item(MenuItem),
    Menu(Menu),
    Separator,
}

impl From<MenuItem> for MenuEntry {
    fn from(item: MenuItem) -> Self {
        Self::Item(item)
    }
}

impl From<Menu> for MenuEntry {
    fn from(menu: Menu) -> Self {
        Self::Menu(menu)
    }
}

/// An entry of the tray's popup menu.
#[derive(Clone)]
pub enum NativeEntry {
    Action {
        label: String,
        enabled: bool,
        bold: bool,
        action: Option<Callback>,
    },
    Check {
        label: String,
        enabled: bool,
        checked: bool,
        action: Option<Callback>,
    },
    Submenu {
        label: String,
        enabled: bool,
        children: Vec<NativeEntry>,
    },
    Separator,
}

impl NativeEntry {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Action { label, .. } | Self::Check { label, .. } | Self::Submenu { label, .. } => {
                Some(label)
            }
            Self::Separator => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Action { enabled, .. }
            | Self::Check { enabled, .. }
            | Self::Submenu { enabled, .. } => *enabled,
            Self::Separator => false,
        }
    }

    pub fn action(&self) -> Option<&Callback> {
        match self {
            Self::Action { action, .. } | Self::Check { action, .. } => action.as_ref(),
            _ => None,
        }
    }

    /// Whether this entry takes part in the label uniqueness rule of the popup menu.
    pub(crate) fn is_unique_labelled(&self) -> bool {
        matches!(self, Self::Action { .. } | Self::Check { .. })
    }
}

impl fmt::Debug for NativeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action {
                label,
                enabled,
                bold,
                action,
            } => f
                .debug_struct("Action")
                .field("label", label)
                .field("enabled", enabled)
                .field("bold", bold)
                .field("action", &action.is_some())
                .finish(),
            Self::Check {
                label,
                enabled,
                checked,
                action,
            } => f
                .debug_struct("Check")
                .field("label", label)
                .field("enabled", enabled)
                .field("checked", checked)
                .field("action", &action.is_some())
                .finish(),
            Self::Submenu {
                label,
                enabled,
                children,
            } => f
                .debug_struct("Submenu")
                .field("label", label)
                .field("enabled", enabled)
                .field("children", children)
                .finish(),
            Self::Separator => f.write_str("Separator"),
        }
    }
}
