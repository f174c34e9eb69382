use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::config::LifeConfig;
use crate::engine::LifeEngine;
use crate::error::{LifeError, Result};
use crate::gfx::{DisplaySurface, GpuContext};
use crate::simulation::GridSize;

pub struct LifeApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: LifeConfig,
    window: Option<Arc<Window>>,
    engine: Option<LifeEngine>,
    cursor: Option<PhysicalPosition<f64>>,
    drawing: bool,
    /// First fatal error; ends the event loop and is returned from `run`
    fatal: Option<LifeError>,
}

impl LifeApp {
    pub fn new(config: LifeConfig) -> Result<Self> {
        config.validate()?;
        let event_loop = EventLoop::new()?;
        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                engine: None,
                cursor: None,
                drawing: false,
                fatal: None,
            },
        })
    }

    /// Run the application (consumes self and starts the event loop)
    pub fn run(mut self) -> Result<()> {
        let Some(event_loop) = self.event_loop.take() else {
            return Err(LifeError::config("event loop already consumed"));
        };
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.app_state)?;

        match self.app_state.fatal.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Maps a position in the view to the nearest grid cell
pub fn view_to_grid(position: (f64, f64), view: (u32, u32), grid: GridSize) -> (i64, i64) {
    let scale = |p: f64, extent: u32, cells: u32| {
        if extent == 0 {
            0
        } else {
            (p / f64::from(extent) * f64::from(cells)).round() as i64
        }
    };
    (
        scale(position.0, view.0, grid.width),
        scale(position.1, view.1, grid.height),
    )
}

impl AppState {
    fn create_engine(&self, window: Arc<Window>) -> Result<LifeEngine> {
        let PhysicalSize { width, height } = window.inner_size();
        let scale = window.scale_factor();

        let instance = GpuContext::create_instance();
        let surface = instance.create_surface(window)?;
        let ctx = pollster::block_on(GpuContext::from_instance(instance, Some(&surface)))?;
        let display = DisplaySurface::new(&ctx, surface, width, height, self.config.vsync)?;

        let grid_size =
            GridSize::from_display(width, height, scale).unwrap_or_else(|| GridSize::new(1, 1));
        LifeEngine::new(ctx, Some(display), grid_size, self.config.clone())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: LifeError) {
        log::error!("{error}");
        self.fatal.get_or_insert(error);
        event_loop.exit();
    }

    fn activate_at(&self, position: PhysicalPosition<f64>) {
        let (Some(engine), Some(window)) = (self.engine.as_ref(), self.window.as_ref()) else {
            return;
        };
        let view = window.inner_size();
        let (x, y) = view_to_grid(
            (position.x, position.y),
            (view.width, view.height),
            engine.grid_size(),
        );
        engine.request_activation(x, y);
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key_code: KeyCode) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let result = match key_code {
            KeyCode::Escape => {
                event_loop.exit();
                Ok(())
            }
            KeyCode::KeyR => {
                log::info!("Reseeding grid");
                engine.reseed()
            }
            KeyCode::KeyP => engine.population().map(|alive| {
                let size = engine.grid_size();
                let metrics = engine.metrics();
                log::info!(
                    "{} of {} cells alive ({}x{}), {:.1} fps, {:.2} ms waiting for a slot",
                    alive,
                    size.cell_count(),
                    size.width,
                    size.height,
                    metrics.fps,
                    metrics.acquire_wait_ms
                );
            }),
            _ => Ok(()),
        };
        if let Err(error) = result {
            self.fail(event_loop, error);
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            WindowAttributes::default()
                .with_title("lifegrid")
                .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
        ) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, LifeError::Window(e));
                return;
            }
        };

        match self.create_engine(window.clone()) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.window = Some(window);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if self.engine.is_none() {
            return;
        }

        match event {
            WindowEvent::KeyboardInput { event: key, .. }
                if key.state == ElementState::Pressed && !key.repeat =>
            {
                if let PhysicalKey::Code(key_code) = key.physical_key {
                    self.handle_key(event_loop, key_code);
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                if let Some(engine) = self.engine.as_mut() {
                    engine.notify_display_size_changed(width, height, scale);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // The size in pixels may be unchanged, but the cell size is not
                let (Some(window), Some(engine)) = (self.window.as_ref(), self.engine.as_mut())
                else {
                    return;
                };
                let PhysicalSize { width, height } = window.inner_size();
                engine.notify_display_size_changed(width, height, scale_factor);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.drawing = state == ElementState::Pressed;
                if let (true, Some(position)) = (self.drawing, self.cursor) {
                    self.activate_at(position);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(position);
                if self.drawing {
                    self.activate_at(position);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drawing = false;
            }
            WindowEvent::Touch(Touch {
                phase: TouchPhase::Started | TouchPhase::Moved,
                location,
                ..
            }) => {
                self.activate_at(location);
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let result = match self.engine.as_mut() {
                    Some(engine) => engine.tick().map(|_| ()),
                    None => Ok(()),
                };
                if let Err(error) = result {
                    self.fail(event_loop, error);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_ref() {
            if let Err(e) = engine.wait_idle() {
                log::warn!("Device did not drain on exit: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_to_grid_rounds_to_nearest_cell() {
        // Two pixels per cell
        let grid = GridSize::new(128, 64);
        let view = (256, 128);
        assert_eq!(view_to_grid((0.0, 0.0), view, grid), (0, 0));
        assert_eq!(view_to_grid((2.0, 4.0), view, grid), (1, 2));
        assert_eq!(view_to_grid((3.0, 5.0), view, grid), (2, 3));
        // The far edge maps one past the last cell; the engine wraps it to 0
        assert_eq!(view_to_grid((256.0, 128.0), view, grid), (128, 64));
    }

    #[test]
    fn test_view_to_grid_with_empty_view() {
        let grid = GridSize::new(10, 10);
        assert_eq!(view_to_grid((5.0, 5.0), (0, 0), grid), (0, 0));
    }
}
