#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::f32::consts::TAU;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tray_bridge::config::Config;
use tray_bridge::icon::{Bitmap, IconSource};
use tray_bridge::menu::{Menu, MenuItem};
use tray_bridge::platform::PlatformProfile;
use tray_bridge::{TrayBuilder, TrayIcon};
use winit::dpi::LogicalSize;
use winit::window::Window;

mod utils;

const SPINNER_FRAMES: usize = 8;
const SPINNER_SIZE: u32 = 32;

/// A dot going round in a circle.
fn spinner_frames() -> Vec<IconSource> {
    let center = SPINNER_SIZE as f32 / 2.0;
    let radius = center * 0.6;

    (0..SPINNER_FRAMES)
        .map(|frame| {
            let angle = TAU * frame as f32 / SPINNER_FRAMES as f32;
            let (dot_x, dot_y) = (center + radius * angle.cos(), center + radius * angle.sin());

            let image = image::RgbaImage::from_fn(SPINNER_SIZE, SPINNER_SIZE, |x, y| {
                let distance = (x as f32 - dot_x).hypot(y as f32 - dot_y);
                if distance <= 4.0 {
                    image::Rgba([40, 120, 220, 255])
                } else {
                    image::Rgba([0, 0, 0, 0])
                }
            });

            IconSource::Bitmap(Bitmap::from(image))
        })
        .collect()
}

fn with_tray(tray: &Arc<OnceLock<TrayIcon>>, f: impl Fn(&TrayIcon)) {
    match tray.get() {
        Some(tray) => f(tray),
        None => tracing::warn!("Tray icon isn't ready yet"),
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    let profile = PlatformProfile::current().with_config(&config);

    tracing::debug!("Using {profile:?}");

    let window_attributes = Window::default_attributes()
        .with_title("tray-bridge")
        .with_inner_size(LogicalSize::new(360.0, 200.0));

    tray_bridge::native::run(window_attributes, profile, move |ctx| {
        let handle = Arc::new(OnceLock::<TrayIcon>::new());

        let hello = {
            let handle = handle.clone();
            move || {
                with_tray(&handle, |tray| {
                    if let Err(e) = tray.show_info_message(Some("Hello"), "Hello from the tray") {
                        tracing::error!("Failed to show notification: {e}");
                    }
                })
            }
        };

        let toggle_animation = {
            let handle = handle.clone();
            move || with_tray(&handle, TrayIcon::pause_resume)
        };

        let reset_icon = {
            let handle = handle.clone();
            move || {
                with_tray(&handle, |tray| {
                    let _ = tray.stop_reset();
                })
            }
        };

        let mut builder = TrayBuilder::new(ctx.toolkit.clone())
            .owner(ctx.owner())
            .application_title("tray-bridge")
            .menu_item_with("Say hello", hello)
            .add_menu(
                Menu::new("Animation")
                    .item(MenuItem::new("Play / Pause").with_action(toggle_animation))
                    .item(MenuItem::new("Stop").with_action(reset_icon)),
            )
            .separator()
            .menu_item_with("About", utils::about_dialog)
            .animation(spinner_frames(), Duration::from_millis(120))
            .show();

        if config.title_item {
            builder = builder.add_title_item();
        }

        if let Some(tooltip) = &config.tooltip {
            builder = builder.tooltip(tooltip);
        }

        builder = match &config.exit_label {
            Some(label) => builder.exit_menu_item_labelled(label),
            None => builder.add_exit_menu_item(),
        };

        let tray = builder.build()?;
        let _ = handle.set(tray.clone());

        Ok(tray)
    })
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_env("TRAY_BRIDGE_LOG").unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env_lossy()
    });

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .with_env_filter(env_filter)
        .finish();

    #[cfg(not(debug_assertions))]
    let (file_log_layer, _f_guard) = {
        use std::time::SystemTime;

        use anyhow::Context;

        let logs_dir = dirs::data_dir()
            .context("Failed to get $data_dir path")?
            .join("tray-bridge")
            .join("logs");

        const MONTH: Duration = Duration::from_secs(60 * 60 * 24 * 30);
        let now = SystemTime::now();

        // prune logs from before last month
        let stale = std::fs::read_dir(&logs_dir)
            .ok()
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| {
                entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .map(|modified| now.duration_since(modified).unwrap_or_default() > MONTH)
                    .unwrap_or(false)
            });

        for entry in stale {
            let _ = std::fs::remove_file(entry.path());
        }

        let appender = tracing_appender::rolling::daily(&logs_dir, "tray-bridge.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::Layer::default()
            .with_ansi(false)
            .with_writer(non_blocking);

        (layer, guard)
    };

    #[cfg(not(debug_assertions))]
    use tracing_subscriber::layer::SubscriberExt;
    #[cfg(not(debug_assertions))]
    let subscriber = subscriber.with(file_log_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!("Initialized Logger");

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("{info}");
        utils::error_dialog(info);
    }));

    if let Err(e) = run() {
        tracing::error!("{e:#}");
        utils::error_dialog(format!("{e:#}"));
        std::process::exit(1);
    }

    Ok(())
}
