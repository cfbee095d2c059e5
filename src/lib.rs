//! Manage a system tray icon and its popup menu from application-level menu types.
//!
//! [`TrayIcon`] is the façade. It runs on any toolkit that provides the seams in [`dispatch`]:
//! [`native`] hosts it on a `winit` event loop with `tray-icon` and `muda`, [`headless`] keeps
//! everything in memory.

pub mod animation;
pub mod builder;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod headless;
pub mod icon;
pub mod menu;
pub mod native;
pub mod platform;
pub mod tray;

pub use builder::TrayBuilder;
pub use error::{Error, Result};
pub use tray::TrayIcon;
