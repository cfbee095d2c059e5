use strum::Display;

use crate::config::Config;
use crate::icon::IconScale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OsFamily {
    Windows,
    #[strum(serialize = "macOS")]
    MacOs,
    Linux,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

/// How tray notifications reach the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStrategy {
    /// The tray back end's own notification popup.
    Balloon,
    /// Shell out to a scripting host (`osascript`) that posts a notification banner.
    Script { program: String },
}

/// Platform dependent defaults, resolved once and handed to every tray icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub os: OsFamily,
    pub icon_scale: IconScale,
    pub notifications: NotificationStrategy,
}

impl PlatformProfile {
    pub fn current() -> Self {
        Self::for_os(OsFamily::current())
    }

    pub fn for_os(os: OsFamily) -> Self {
        let icon_scale = match os {
            OsFamily::Windows => IconScale::square(16),
            _ => IconScale::square(22),
        };

        let notifications = match os {
            OsFamily::MacOs => NotificationStrategy::Script {
                program: "osascript".into(),
            },
            _ => NotificationStrategy::Balloon,
        };

        Self {
            os,
            icon_scale,
            notifications,
        }
    }

    pub fn with_icon_scale(mut self, icon_scale: IconScale) -> Self {
        self.icon_scale = icon_scale;
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationStrategy) -> Self {
        self.notifications = notifications;
        self
    }

    /// Applies the overrides of a user config on top of the platform defaults.
    pub fn with_config(mut self, config: &Config) -> Self {
        match (config.icon_width, config.icon_height) {
            (Some(width), Some(height)) => self.icon_scale = IconScale::new(width, height),
            (Some(size), None) | (None, Some(size)) => self.icon_scale = IconScale::square(size),
            (None, None) => {}
        }

        if let Some(program) = &config.notification_program {
            self.notifications = NotificationStrategy::Script {
                program: program.clone(),
            };
        }

        self
    }
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::current()
    }
}
