use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tray_bridge::animation::AnimationStatus;
use tray_bridge::dispatch::{MessageKind, OwnerWindow, Toolkit};
use tray_bridge::headless::{HeadlessTray, HeadlessWindow, ImmediateSink, QueuedSink};
use tray_bridge::icon::{Bitmap, IconSource};
use tray_bridge::menu::{Menu, MenuItem, NativeEntry};
use tray_bridge::platform::{NotificationStrategy, OsFamily, PlatformProfile};
use tray_bridge::tray::DEFAULT_EXIT_LABEL;
use tray_bridge::{Error, TrayBuilder, TrayIcon};

fn owner(title: &str) -> Option<Arc<dyn OwnerWindow>> {
    Some(Arc::new(HeadlessWindow::new(title)))
}

fn solid(shade: u8, size: u32) -> Bitmap {
    Bitmap::from(RgbaImage::from_pixel(size, size, Rgba([shade, shade, shade, 255])))
}

#[test]
fn plain_items_keep_label_and_enabled_state() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();

    let items = [("Open", false), ("Save", true), ("Close", false)];
    for (label, disabled) in items {
        icon.add_menu_item(MenuItem::new(label).disabled(disabled).with_action(|| {}))
            .unwrap();
    }

    let entries = tray.entries();
    assert_eq!(entries.len(), items.len());
    for (entry, (label, disabled)) in entries.iter().zip(items) {
        assert_eq!(entry.label(), Some(label));
        assert_eq!(entry.is_enabled(), !disabled);
    }
}

#[test]
fn unsupported_features_are_all_named() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();

    let item = MenuItem::new("Fancy")
        .with_accelerator("Ctrl+F")
        .with_validation(|| {});

    let message = icon.add_menu_item(item).unwrap_err().to_string();
    assert!(message.contains("accelerator"), "{message}");
    assert!(message.contains("validation hook"), "{message}");
    assert!(!message.contains("graphic"), "{message}");
    assert_eq!(icon.menu_item_count(), 0);
}

#[test]
fn unique_items_are_counted_and_duplicates_rejected() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();

    for n in 1..=5 {
        icon.add_menu_item(MenuItem::new(format!("Item {n}"))).unwrap();
        assert_eq!(icon.menu_item_count(), n);
    }

    let err = icon.add_menu_item(MenuItem::new("Item 3")).unwrap_err();
    assert!(matches!(err, Error::DuplicateLabel(ref label) if label == "Item 3"));
    assert_eq!(icon.menu_item_count(), 5);
    assert_eq!(tray.entries().len(), 5);

    // labels are compared exactly
    icon.add_menu_item(MenuItem::new("item 3")).unwrap();
    assert_eq!(icon.menu_item_count(), 6);
}

#[test]
fn build_replays_entries_in_recorded_order() {
    let tray = HeadlessTray::new();
    let icon = TrayBuilder::new(tray.toolkit())
        .owner(Arc::new(HeadlessWindow::new("Main")))
        .menu_item(MenuItem::new("A"))
        .separator()
        .menu_item(MenuItem::new("B"))
        .add_menu(Menu::new("C").item(MenuItem::new("C1")))
        .build()
        .unwrap();

    let expected = vec![
        Some("A".to_string()),
        None,
        Some("B".to_string()),
        Some("C".to_string()),
    ];
    assert_eq!(icon.menu_labels(), expected);
    assert_eq!(tray.labels(), expected);

    let entries = tray.entries();
    assert!(matches!(entries[1], NativeEntry::Separator));
    assert!(matches!(entries[3], NativeEntry::Submenu { .. }));
}

#[test]
fn animation_full_cycle_returns_to_the_same_bitmap() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::with_size(tray.toolkit(), owner("Main"), None, 4, 4).unwrap();

    let frames: Vec<IconSource> = (1..=5).map(|n| solid(n * 40, 4).into()).collect();
    let k = frames.len();
    icon.new_animation(frames, Duration::from_secs(60), false)
        .unwrap();

    icon.step_animation();
    let before = icon.current_icon();
    assert_eq!(before, solid(40, 4));

    for _ in 0..k {
        icon.step_animation();
    }

    assert_eq!(icon.current_icon(), before);
    assert_eq!(tray.icon(), Some(before));
}

#[test]
fn animation_can_be_stopped_and_reset() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::with_size(tray.toolkit(), owner("Main"), None, 4, 4).unwrap();
    let default = icon.current_icon();

    assert!(matches!(
        icon.new_animation(Vec::new(), Duration::from_millis(10), true),
        Err(Error::EmptyAnimation)
    ));
    assert_eq!(icon.animation_status(), None);

    let frames: Vec<IconSource> = vec![solid(10, 4).into(), solid(20, 4).into()];
    icon.new_animation(frames, Duration::from_millis(5), true)
        .unwrap();
    assert_eq!(icon.animation_status(), Some(AnimationStatus::Playing));

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while tray.icon_updates() < 2 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(tray.icon_updates() >= 2);

    icon.stop_reset().wait().unwrap();
    assert_eq!(icon.animation_status(), Some(AnimationStatus::Stopped));
    assert_eq!(icon.current_icon(), default);
}

#[test]
fn capability_probe_agrees_with_construction() {
    let unsupported = HeadlessTray::unsupported();
    let toolkit = unsupported.toolkit();
    assert!(!TrayIcon::is_supported(&toolkit));
    assert!(matches!(
        TrayIcon::new(toolkit, owner("Main"), None),
        Err(Error::TrayUnsupported)
    ));

    let supported = HeadlessTray::new();
    let toolkit = supported.toolkit();
    assert!(TrayIcon::is_supported(&toolkit));
    assert!(TrayIcon::new(toolkit, owner("Main"), None).is_ok());
}

#[test]
fn construction_requires_an_owner() {
    let tray = HeadlessTray::new();
    assert!(matches!(
        TrayIcon::new(tray.toolkit(), None, None),
        Err(Error::MissingOwner)
    ));
}

#[test]
fn png_is_scaled_to_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("icon.png");
    RgbaImage::from_pixel(64, 64, Rgba([10, 200, 10, 255]))
        .save(&path)
        .unwrap();

    let tray = HeadlessTray::new();
    let icon = TrayIcon::with_size(tray.toolkit(), owner("Main"), Some(path.into()), 24, 24)
        .unwrap();

    let bitmap = icon.current_icon();
    assert_eq!((bitmap.width(), bitmap.height()), (24, 24));

    icon.show().wait().unwrap();
    let shown = tray.icon().unwrap();
    assert_eq!((shown.width(), shown.height()), (24, 24));
}

#[test]
fn exit_item_is_last_and_removes_the_icon() {
    let tray = HeadlessTray::new();
    let sink = Arc::new(ImmediateSink::default());
    let toolkit = Toolkit::new(Arc::new(tray.clone()), sink.clone());

    let icon = TrayIcon::new(toolkit, owner("Main"), None).unwrap();
    icon.add_menu_item(MenuItem::new("Open")).unwrap();
    icon.add_exit_item(true);
    icon.show().wait().unwrap();

    let labels = tray.labels();
    assert_eq!(labels.last(), Some(&Some(DEFAULT_EXIT_LABEL.to_string())));
    assert!(tray.is_published());

    assert!(tray.click(labels.len() - 1));

    assert!(!tray.is_published());
    assert!(!icon.is_showing());
    assert!(sink.exit_requested());
}

#[test]
fn custom_exit_item_runs_its_handler_instead_of_exiting() {
    let tray = HeadlessTray::new();
    let sink = Arc::new(ImmediateSink::default());
    let toolkit = Toolkit::new(Arc::new(tray.clone()), sink.clone());
    let exits = Arc::new(AtomicUsize::new(0));

    let icon = TrayIcon::new(toolkit, owner("Main"), None).unwrap();
    icon.add_exit_item_with(
        "Quit",
        Some(Arc::new({
            let exits = exits.clone();
            move || {
                exits.fetch_add(1, Ordering::SeqCst);
            }
        })),
    );
    icon.show();

    assert_eq!(icon.menu_labels(), vec![Some("Quit".to_string())]);
    assert!(tray.click(0));

    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert!(!sink.exit_requested());
    assert!(!tray.is_published());
}

#[test]
fn item_handlers_run_on_the_event_sink() {
    let tray = HeadlessTray::new();
    let sink = Arc::new(QueuedSink::default());
    let toolkit = Toolkit::new(Arc::new(tray.clone()), sink.clone());
    let clicks = Arc::new(AtomicUsize::new(0));

    let icon = TrayIcon::new(toolkit, owner("Main"), None).unwrap();
    icon.add_menu_item(MenuItem::new("Count").with_action({
        let clicks = clicks.clone();
        move || {
            clicks.fetch_add(1, Ordering::SeqCst);
        }
    }))
    .unwrap();
    icon.show();

    assert!(tray.click(0));
    assert_eq!(clicks.load(Ordering::SeqCst), 0);

    sink.run_pending();
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

#[test]
fn title_item_and_icon_click_show_the_owner() {
    let tray = HeadlessTray::new();
    let window = Arc::new(HeadlessWindow::new("Main"));
    let owner: Arc<dyn OwnerWindow> = window.clone();

    let icon = TrayIcon::new(tray.toolkit(), Some(owner), None).unwrap();
    icon.add_title_item(true);
    icon.show();

    assert!(tray.click(0));
    assert!(tray.click_icon());
    assert_eq!(window.times_shown(), 2);
}

#[test]
fn default_click_can_be_turned_off() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();
    icon.set_default_click(false);
    icon.show();

    assert!(!tray.has_primary_action());
    assert!(!tray.click_icon());
}

#[test]
fn hide_and_show_follow_the_lifecycle() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();

    // never shown, nothing to hide
    icon.hide().wait().unwrap();
    assert!(!icon.is_showing());
    assert_eq!(tray.tooltip(), None);

    icon.show().wait().unwrap();
    assert!(icon.is_showing());
    assert_eq!(tray.tooltip().as_deref(), Some("Main"));

    icon.hide().wait().unwrap();
    assert!(!icon.is_showing());
    assert!(!tray.is_published());

    icon.show().wait().unwrap();
    assert!(tray.is_published());
}

#[test]
fn menu_showing_needs_entries() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();
    icon.show();
    assert!(!icon.is_menu_showing());

    icon.add_menu_item(MenuItem::new("One")).unwrap();
    assert!(icon.is_menu_showing());

    icon.remove_menu_item(&MenuItem::new("One"));
    assert!(!icon.is_menu_showing());
}

#[test]
fn balloon_notifications_reach_the_tray() {
    let tray = HeadlessTray::new();
    let profile = PlatformProfile::for_os(OsFamily::Windows);
    let toolkit = tray.toolkit().with_profile(profile);
    let icon = TrayIcon::new(toolkit, owner("Main"), None).unwrap();

    icon.show_info_message(Some("Sync"), "Done")
        .unwrap()
        .wait()
        .unwrap();
    icon.show_error_message(None, "Failed").unwrap().wait().unwrap();

    let messages = tray.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].kind, MessageKind::Info);
    assert_eq!(messages[0].title.as_deref(), Some("Sync"));
    assert_eq!(messages[1].kind, MessageKind::Error);
    assert_eq!(messages[1].message, "Failed");
}

#[test]
fn script_notification_fails_when_the_program_is_missing() {
    let tray = HeadlessTray::new();
    let profile = PlatformProfile::for_os(OsFamily::MacOs).with_notifications(
        NotificationStrategy::Script {
            program: "tray-bridge-no-such-program".into(),
        },
    );
    let icon = TrayIcon::new(tray.toolkit().with_profile(profile), owner("Main"), None).unwrap();

    let err = icon.show_warning_message(Some("Disk"), "Almost full").unwrap_err();
    assert!(matches!(err, Error::Notification { .. }));
    assert!(tray.messages().is_empty());
}

#[cfg(unix)]
#[test]
fn script_notification_spawns_the_program() {
    let tray = HeadlessTray::new();
    let profile = PlatformProfile::for_os(OsFamily::MacOs).with_notifications(
        NotificationStrategy::Script {
            program: "true".into(),
        },
    );
    let icon = TrayIcon::new(tray.toolkit().with_profile(profile), owner("Main"), None).unwrap();

    icon.show_message(None, "Hello").unwrap().wait().unwrap();
    assert!(tray.messages().is_empty());
}

#[test]
fn set_graphic_becomes_the_reset_icon() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::with_size(tray.toolkit(), owner("Main"), None, 4, 4).unwrap();

    icon.set_graphic(solid(99, 8)).unwrap();
    let replaced = icon.current_icon();
    assert_eq!((replaced.width(), replaced.height()), (4, 4));

    let frames: Vec<IconSource> = vec![solid(1, 4).into()];
    icon.new_animation(frames, Duration::from_secs(60), false)
        .unwrap();
    icon.step_animation();
    assert_ne!(icon.current_icon(), replaced);

    icon.reset_icon().wait().unwrap();
    assert_eq!(icon.current_icon(), replaced);
}

#[test]
fn zero_icon_size_fails_construction() {
    let tray = HeadlessTray::new();
    let result = TrayIcon::with_size(tray.toolkit(), owner("Main"), None, 0, 0);
    assert!(matches!(result, Err(Error::InvalidIcon)));
}

#[test]
fn entries_are_removed_by_index() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();
    icon.add_menu_items([MenuItem::new("A"), MenuItem::new("B"), MenuItem::new("C")])
        .unwrap();

    icon.remove_menu_item_at(1).wait().unwrap();
    assert_eq!(tray.labels(), vec![Some("A".to_string()), Some("C".to_string())]);

    icon.remove_menu_item_at(7).wait().unwrap();
    assert_eq!(icon.menu_item_count(), 2);
    assert_eq!(tray.entries().len(), 2);
}

#[test]
fn removing_the_exit_entry_by_index_unpins_it() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();
    icon.add_menu_item(MenuItem::new("Open")).unwrap();
    icon.add_exit_item(true);
    icon.show();
    assert_eq!(icon.menu_item_count(), 2);

    icon.remove_menu_item_at(1);
    icon.add_menu_item(MenuItem::new("Later")).unwrap();
    assert_eq!(
        tray.labels(),
        vec![Some("Open".to_string()), Some("Later".to_string())]
    );

    icon.hide();
    icon.show();
    assert_eq!(
        tray.labels().last(),
        Some(&Some(DEFAULT_EXIT_LABEL.to_string()))
    );
}

#[test]
fn separators_can_be_inserted_anywhere() {
    let tray = HeadlessTray::new();
    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();
    icon.add_menu_items([MenuItem::new("A"), MenuItem::new("B")])
        .unwrap();

    icon.insert_separator(1).wait().unwrap();
    icon.insert_separator(0).wait().unwrap();
    icon.insert_separator(42).wait().unwrap();

    assert_eq!(
        tray.labels(),
        vec![None, Some("A".to_string()), None, Some("B".to_string()), None]
    );
    assert!(matches!(tray.entries()[2], NativeEntry::Separator));
}

#[test]
fn icon_action_replaces_the_default_click_and_runs_on_the_sink() {
    let tray = HeadlessTray::new();
    let sink = Arc::new(QueuedSink::default());
    let toolkit = Toolkit::new(Arc::new(tray.clone()), sink.clone());
    let window = Arc::new(HeadlessWindow::new("Main"));
    let owner: Arc<dyn OwnerWindow> = window.clone();
    let clicks = Arc::new(AtomicUsize::new(0));

    let icon = TrayIcon::new(toolkit, Some(owner), None).unwrap();
    icon.set_on_action({
        let clicks = clicks.clone();
        move || {
            clicks.fetch_add(1, Ordering::SeqCst);
        }
    });
    icon.show();

    assert!(tray.click_icon());
    assert_eq!(clicks.load(Ordering::SeqCst), 0);

    sink.run_pending();
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert_eq!(window.times_shown(), 0);
}

#[test]
fn minimal_show_keeps_the_icon_action() {
    let tray = HeadlessTray::new();
    let clicks = Arc::new(AtomicUsize::new(0));

    let icon = TrayIcon::new(tray.toolkit(), owner("Main"), None).unwrap();
    icon.add_exit_item(true);
    icon.set_on_action({
        let clicks = clicks.clone();
        move || {
            clicks.fetch_add(1, Ordering::SeqCst);
        }
    });
    icon.show_minimal().wait().unwrap();

    assert_eq!(icon.menu_item_count(), 0);
    assert!(tray.click_icon());
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

#[test]
fn click_settings_apply_while_showing() {
    let tray = HeadlessTray::new();
    let window = Arc::new(HeadlessWindow::new("Main"));
    let owner: Arc<dyn OwnerWindow> = window.clone();
    let clicks = Arc::new(AtomicUsize::new(0));

    let icon = TrayIcon::new(tray.toolkit(), Some(owner), None).unwrap();
    icon.show();
    assert!(tray.has_primary_action());

    icon.set_default_click(false).wait().unwrap();
    assert!(!tray.click_icon());

    icon.set_default_click(true).wait().unwrap();
    assert!(tray.click_icon());
    assert_eq!(window.times_shown(), 1);

    icon.set_on_action({
        let clicks = clicks.clone();
        move || {
            clicks.fetch_add(1, Ordering::SeqCst);
        }
    })
    .wait()
    .unwrap();
    assert!(tray.click_icon());
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert_eq!(window.times_shown(), 1);
}
