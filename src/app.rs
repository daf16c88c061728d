//! winit host for the viewer
//!
//! [`ViewerApp`] opens a window, mounts a [`Viewer`] backed by the wgpu renderer on `resumed`,
//! and routes window events to it. Loaders run on a [`LocalPool`] that is drained every time the
//! event loop is about to wait.

use std::{rc::Rc, sync::Arc};

use anyhow::Context;
use futures::executor::LocalPool;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::ViewerConfig,
    gfx::{
        camera::{InputEvent, PointerButton},
        rendering::{render_engine::WgpuBackend, resize::ViewportSize},
    },
    loading::AssetSource,
    viewer::Viewer,
};

pub struct ViewerApp {
    event_loop: EventLoop<()>,
    state: AppState,
}

struct AppState {
    window: Option<Arc<Window>>,
    pool: LocalPool,
    viewer: Viewer<WgpuBackend>,
    /// Last cursor position in physical pixels, `None` outside the window
    cursor: Option<PhysicalPosition<f64>>,
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    /// Creates the event loop and an unmounted viewer fetching assets from `source`
    pub fn new(config: ViewerConfig, source: Rc<dyn AssetSource>) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        let pool = LocalPool::new();
        let viewer = Viewer::new(config, source, Box::new(pool.spawner()));

        Ok(Self {
            event_loop,
            state: AppState {
                window: None,
                pool,
                viewer,
                cursor: None,
                error: None,
            },
        })
    }

    /// See [`Viewer::set_progress_listener`]
    pub fn set_progress_listener(&mut self, listener: impl FnMut(u8) + 'static) {
        self.state.viewer.set_progress_listener(listener);
    }

    /// Runs until the window closes; returns the first fatal setup error, if any
    pub fn run(self) -> anyhow::Result<()> {
        let Self {
            event_loop,
            mut state,
        } = self;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut state)
            .context("event loop terminated abnormally")?;

        match state.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error.get_or_insert(error);
        self.viewer.unmount();
        event_loop.exit();
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        log::info!("Closing viewer");
        self.viewer.unmount();
        event_loop.exit();
    }

    fn viewport(window: &Window) -> ViewportSize {
        let size = window.inner_size();
        ViewportSize::from_physical(size.width, size.height, window.scale_factor())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let config = self.viewer.config();
        let (width, height) = config.initial_size;
        let attributes = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(width, height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("failed to create window"));
                return;
            }
        };

        let viewport = Self::viewport(&window);
        match self.viewer.mount(window.clone(), viewport) {
            Ok(_) => {
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("failed to mount viewer"))
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.close(event_loop),
            WindowEvent::Resized(size) => {
                self.viewer.resize(ViewportSize::from_physical(
                    size.width,
                    size.height,
                    window.scale_factor(),
                ));
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                self.viewer.resize(Self::viewport(&window));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = PointerButton::from_winit(button) {
                    let event = match state {
                        ElementState::Pressed => InputEvent::PointerDown(button),
                        ElementState::Released => InputEvent::PointerUp(button),
                    };
                    self.viewer.handle_input(event);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor.replace(position) {
                    let scale = window.scale_factor();
                    self.viewer.handle_input(InputEvent::PointerMove {
                        dx: ((position.x - last.x) / scale) as f32,
                        dy: ((position.y - last.y) / scale) as f32,
                    });
                }
            }
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseWheel { delta, .. } => {
                self.viewer.handle_input(InputEvent::from_wheel(&delta));
            }
            WindowEvent::RedrawRequested => {
                self.viewer.frame();
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.pool.run_until_stalled();
        self.viewer.pump_completions();

        if let Some(window) = self.window.as_ref() {
            if self.viewer.wants_frame() {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.viewer.unmount();
        self.window = None;
    }
}
