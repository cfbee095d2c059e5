//! Conversion of application-side menu entries into tray popup menu entries.

use std::sync::Arc;

use crate::dispatch::EventSink;
use crate::error::{Error, Result, UnsupportedFeature};
use crate::menu::{Callback, ItemKind, Menu, MenuEntry, MenuItem, NativeEntry};

fn unsupported_features(item: &MenuItem) -> Vec<UnsupportedFeature> {
    let mut features = Vec::new();

    if item.graphic.is_some() {
        features.push(UnsupportedFeature::Graphic);
    }
    if item.accelerator.is_some() {
        features.push(UnsupportedFeature::Accelerator);
    }
    if !item.style_metadata.is_empty() {
        features.push(UnsupportedFeature::StyleMetadata);
    }
    if item.on_validation.is_some() {
        features.push(UnsupportedFeature::Validation);
    }
    if item.style.is_some() {
        features.push(UnsupportedFeature::Style);
    }

    features
}

/// Wraps `callback` so that invoking it runs `callback` on the application's event thread.
pub fn marshal(callback: &Callback, sink: &Arc<dyn EventSink>) -> Callback {
    let callback = callback.clone();
    let sink = sink.clone();
    Arc::new(move || {
        let callback = callback.clone();
        sink.dispatch(Box::new(move || callback()));
    })
}

pub fn convert_item(item: &MenuItem, sink: &Arc<dyn EventSink>) -> Result<NativeEntry> {
    let features = unsupported_features(item);
    if !features.is_empty() {
        return Err(Error::UnsupportedFeatures {
            label: item.text.clone(),
            features,
        });
    }

    let label = item.text.clone();
    let enabled = !item.disabled;
    let action = item.on_action.as_ref().map(|cb| marshal(cb, sink));

    let entry = match item.kind {
        ItemKind::Action => NativeEntry::Action {
            label,
            enabled,
            bold: false,
            action,
        },
        ItemKind::Check { selected } => NativeEntry::Check {
            label,
            enabled,
            checked: selected,
            action,
        },
    };

    Ok(entry)
}

pub fn convert_menu(menu: &Menu, sink: &Arc<dyn EventSink>) -> Result<NativeEntry> {
    let children = menu
        .items
        .iter()
        .map(|entry| convert_entry(entry, sink))
        .collect::<Result<Vec<_>>>()?;

    Ok(NativeEntry::Submenu {
        label: menu.text.clone(),
        enabled: !menu.disabled,
        children,
    })
}

pub fn convert_entry(entry: &MenuEntry, sink: &Arc<dyn EventSink>) -> Result<NativeEntry> {
    match entry {
        MenuEntry::Item(item) => convert_item(item, sink),
        MenuEntry::Menu(menu) => convert_menu(menu, sink),
        MenuEntry::Separator => Ok(NativeEntry::Separator),
    }
}
