use std::collections::HashMap;

use muda::{CheckMenuItem, IsMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu};

use crate::error::Result;
use crate::menu::{Callback, NativeEntry};
use crate::native::backend_error;

enum Item {
    Normal(MenuItem),
    Check(CheckMenuItem),
    Submenu(Submenu),
    Separator(PredefinedMenuItem),
}

impl Item {
    fn as_menu_item(&self) -> &dyn IsMenuItem {
        match self {
            Item::Normal(item) => item,
            Item::Check(item) => item,
            Item::Submenu(item) => item,
            Item::Separator(item) => item,
        }
    }
}

/// A top level entry and the ids of every clickable item below it.
struct Slot {
    item: Item,
    ids: Vec<MenuId>,
}

/// The tray's popup menu.
pub struct ContextMenu {
    pub menu: Menu,
    slots: Vec<Slot>,
    actions: HashMap<MenuId, Callback>,
}

impl ContextMenu {
    pub fn new() -> Self {
        Self {
            menu: Menu::new(),
            slots: Vec::new(),
            actions: HashMap::new(),
        }
    }

    fn register(&mut self, id: &MenuId, action: &Option<Callback>, ids: &mut Vec<MenuId>) {
        if let Some(action) = action {
            self.actions.insert(id.clone(), action.clone());
        }
        ids.push(id.clone());
    }

    fn build(&mut self, entry: &NativeEntry, ids: &mut Vec<MenuId>) -> Result<Item> {
        let item = match entry {
            // muda can't render bold text
            NativeEntry::Action {
                label,
                enabled,
                action,
                ..
            } => {
                let item = MenuItem::new(label, *enabled, None);
                self.register(item.id(), action, ids);
                Item::Normal(item)
            }
            NativeEntry::Check {
                label,
                enabled,
                checked,
                action,
            } => {
                let item = CheckMenuItem::new(label, *enabled, *checked, None);
                self.register(item.id(), action, ids);
                Item::Check(item)
            }
            NativeEntry::Submenu {
                label,
                enabled,
                children,
            } => {
                let submenu = Submenu::new(label, *enabled);
                for child in children {
                    let child = self.build(child, ids)?;
                    submenu
                        .append(child.as_menu_item())
                        .map_err(backend_error("Failed to append submenu item"))?;
                }
                Item::Submenu(submenu)
            }
            NativeEntry::Separator => Item::Separator(PredefinedMenuItem::separator()),
        };

        Ok(item)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn insert(&mut self, index: usize, entry: &NativeEntry) -> Result<()> {
        let index = index.min(self.slots.len());

        let mut ids = Vec::new();
        let item = self.build(entry, &mut ids)?;

        self.menu
            .insert(item.as_menu_item(), index)
            .map_err(backend_error("Failed to insert menu item"))?;

        self.slots.insert(index, Slot { item, ids });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.slots.len() {
            return Err(anyhow::anyhow!("No menu item at index {index}").into());
        }

        let slot = self.slots.remove(index);
        for id in &slot.ids {
            self.actions.remove(id);
        }

        self.menu
            .remove(slot.item.as_menu_item())
            .map_err(backend_error("Failed to remove menu item"))
    }

    pub fn clear(&mut self) -> Result<()> {
        while !self.slots.is_empty() {
            self.remove(self.slots.len() - 1)?;
        }
        self.actions.clear();
        Ok(())
    }

    pub fn set_checked(&mut self, index: usize, checked: bool) -> Result<()> {
        match self.slots.get(index).map(|slot| &slot.item) {
            Some(Item::Check(item)) => {
                item.set_checked(checked);
                Ok(())
            }
            _ => Err(anyhow::anyhow!("No check menu item at index {index}").into()),
        }
    }

    pub fn is_checked(&self, index: usize) -> Option<bool> {
        match self.slots.get(index).map(|slot| &slot.item) {
            Some(Item::Check(item)) => Some(item.is_checked()),
            _ => None,
        }
    }

    /// The action registered for the clicked item, if any.
    pub fn handle_menu_event(&self, event: &MenuEvent) -> Option<Callback> {
        self.actions.get(event.id()).cloned()
    }
}
