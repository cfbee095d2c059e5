use strum::{AsRefStr, Display};

/// Features of a [`MenuItem`](crate::menu::MenuItem) that a tray popup menu has no way to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum UnsupportedFeature {
    #[strum(serialize = "graphic")]
    Graphic,
    #[strum(serialize = "accelerator")]
    Accelerator,
    #[strum(serialize = "style")]
    Style,
    #[strum(serialize = "style metadata")]
    StyleMetadata,
    #[strum(serialize = "validation hook")]
    Validation,
}

fn join_features(features: &[UnsupportedFeature]) -> String {
    features
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(",")
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "menu item `{label}` uses features not supported by the tray menu ({})",
        join_features(.features)
    )]
    UnsupportedFeatures {
        label: String,
        features: Vec<UnsupportedFeature>,
    },

    #[error("menu item labels must be unique, `{0}` is already in the menu")]
    DuplicateLabel(String),

    #[error("a tray icon requires an owning window")]
    MissingOwner,

    #[error("the icon bitmap is empty or its pixel buffer does not match its size")]
    InvalidIcon,

    #[error("unable to read the icon image at {location}")]
    IconLoad {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("system tray icons are not supported by the current desktop environment")]
    TrayUnsupported,

    #[error("cannot run `{program}` to display a notification")]
    Notification {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("an animation needs at least one frame")]
    EmptyAnimation,

    #[error("the tray event queue is no longer running")]
    QueueClosed,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
