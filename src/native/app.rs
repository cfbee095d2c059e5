use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::dispatch::{Toolkit, TrayBackend};
use crate::native::{NativeContext, NativeTray, TrayMessage};
use crate::tray::TrayIcon;

pub struct App<F> {
    toolkit: Toolkit,
    window_attributes: WindowAttributes,
    setup: Option<F>,
    window: Option<Arc<Window>>,
    native_tray: NativeTray,
    tray_icon: Option<TrayIcon>,
    error: Option<anyhow::Error>,
}

impl<F> App<F>
where
    F: FnOnce(&NativeContext) -> anyhow::Result<TrayIcon>,
{
    pub fn new(toolkit: Toolkit, window_attributes: WindowAttributes, setup: F) -> Self {
        let native_tray = NativeTray::new(window_attributes.title.clone());

        Self {
            toolkit,
            window_attributes,
            setup: Some(setup),
            window: None,
            native_tray,
            tray_icon: None,
            error: None,
        }
    }

    pub fn into_result(mut self) -> anyhow::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_tray(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop.create_window(self.window_attributes.clone())?;
        let window = Arc::new(window);
        self.window = Some(window.clone());

        let Some(setup) = self.setup.take() else {
            return Ok(());
        };

        let ctx = NativeContext {
            event_loop,
            window,
            toolkit: self.toolkit.clone(),
        };

        self.tray_icon = Some(setup(&ctx)?);

        Ok(())
    }

    fn handle_tray_message(&mut self, event_loop: &ActiveEventLoop, message: TrayMessage) {
        match message {
            TrayMessage::Job(job) => job(&mut self.native_tray),
            TrayMessage::Dispatch(task) => task(),
            TrayMessage::Exit => {
                tracing::info!("Exiting event loop");
                event_loop.exit();
            }
            TrayMessage::MenuEvent(event) => {
                if let Some(action) = self.native_tray.handle_menu_event(&event) {
                    action();
                }
            }
            TrayMessage::TrayIconEvent(event) => {
                if let Some(action) = self.native_tray.handle_tray_event(&event) {
                    action();
                }
            }
        }
    }
}

impl<F> ApplicationHandler<TrayMessage> for App<F>
where
    F: FnOnce(&NativeContext) -> anyhow::Result<TrayIcon>,
{
    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if cause == StartCause::Init {
            if let Err(e) = self.create_tray(event_loop) {
                tracing::error!("Error while creating tray icon: {e}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn user_event(&mut self, event_loop: &ActiveEventLoop, message: TrayMessage) {
        self.handle_tray_message(event_loop, message);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = &self.window else {
            return;
        };

        if window.id() != window_id {
            return;
        }

        // closing the window only sends the application to the tray
        if matches!(event, WindowEvent::CloseRequested) {
            tracing::debug!("Hiding window {window_id:?}");
            window.set_visible(false);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // tray-icon and muda run on gtk on linux, which winit doesn't drive
        #[cfg(target_os = "linux")]
        {
            use std::time::{Duration, Instant};

            while gtk::events_pending() {
                gtk::main_iteration_do(false);
            }

            _event_loop.set_control_flow(winit::event_loop::ControlFlow::WaitUntil(
                Instant::now() + Duration::from_millis(16),
            ));
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.tray_icon = None;
        self.native_tray.unpublish();
    }
}
