use std::fmt::Display;

fn message_dialog(level: rfd::MessageLevel, description: impl Display) {
    rfd::MessageDialog::new()
        .set_title("tray-bridge")
        .set_description(description.to_string())
        .set_level(level)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

pub fn error_dialog<T: Display>(error: T) {
    message_dialog(rfd::MessageLevel::Error, error);
}

pub fn about_dialog() {
    message_dialog(
        rfd::MessageLevel::Info,
        concat!(
            env!("CARGO_PKG_NAME"),
            " v",
            env!("CARGO_PKG_VERSION"),
            "\n",
            env!("CARGO_PKG_DESCRIPTION")
        ),
    );
}
