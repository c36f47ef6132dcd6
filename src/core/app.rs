use std::{path::PathBuf, sync::Arc};

use glam::Mat4;
use log::{error, info};
use serde::Deserialize;
use thiserror::Error;
use winit::{
    dpi::{PhysicalSize, Size},
    error::{EventLoopError, OsError},
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Fullscreen, Window, WindowBuilder},
};

use crate::{
    assets::{
        model_loader::{load_mesh_from_file, ModelError},
        texture_loader::{TextureData, TextureError},
    },
    controllers::camera_controller::{CameraController, CameraSettings},
    render::{
        mesh_collection::MeshCollection,
        render_manager::{RenderError, RenderManager, RenderSettings},
        scene::{DirectionalLight, FrameUniforms, Material, ModelTransform},
    },
};

use super::{
    config::ConfigError,
    input_manager::{InputManager, InputSettings},
    time_manager::TimeManager,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("Failed to create window: {0}")]
    Window(#[from] OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error("App is already running")]
    AlreadyRunning,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
    pub target_frame_rate: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 640,
            title: "Model Viewer".into(),
            resizable: true,
            target_frame_rate: 60,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub model: PathBuf,
    pub texture: Option<PathBuf>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/Tank1.obj"),
            texture: Some(PathBuf::from("assets/Tank1DF.png")),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub window: WindowSettings,
    pub input: InputSettings,
    pub camera: CameraSettings,
    pub render: RenderSettings,
    pub lighting: DirectionalLight,
    pub material: Material,
    pub model_transform: ModelTransform,
    pub assets: AssetSettings,
}

pub struct App {
    settings: AppSettings,
    event_loop: Option<EventLoop<()>>,
    window: Arc<Window>,
    min_render_time: f32,
    render_timer: f32,
    model_matrix: Mat4,
    time_manager: TimeManager,
    input_manager: InputManager,
    render_manager: RenderManager<'static>,
    camera_controller: CameraController,
    meshes: MeshCollection,
}

impl App {
    pub async fn new(settings: &AppSettings) -> Result<App, AppError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let window = Arc::new(
            WindowBuilder::new()
                .with_inner_size(Size::Physical(PhysicalSize::new(
                    settings.window.width,
                    settings.window.height,
                )))
                .with_title(settings.window.title.clone())
                .with_resizable(settings.window.resizable)
                .build(&event_loop)?,
        );

        let texture = match &settings.assets.texture {
            Some(path) => TextureData::from_file(path)?,
            None => TextureData::white(),
        };

        let mut render_manager =
            RenderManager::new(&settings.render, window.clone(), &texture).await?;

        let mut meshes = MeshCollection::new();
        if let Err(err) =
            load_mesh_from_file(&settings.assets.model, render_manager.backend_mut(), &mut meshes)
        {
            meshes.destroy(render_manager.backend_mut());
            return Err(err.into());
        }
        info!(
            "Model ready: {} meshes, {} indices",
            meshes.len(),
            meshes.index_count()
        );

        let (width, height) = render_manager.surface_size();
        let camera_controller =
            CameraController::new(&settings.camera, width as f32 / height.max(1) as f32);

        let min_render_time = match settings.window.target_frame_rate {
            0 => 0.0,
            rate => 1.0 / rate as f32,
        };

        Ok(App {
            settings: settings.clone(),
            event_loop: Some(event_loop),
            window,
            min_render_time,
            render_timer: 0.0,
            model_matrix: settings.model_transform.matrix(),
            time_manager: TimeManager::new(),
            input_manager: InputManager::new(&settings.input),
            render_manager,
            camera_controller,
            meshes,
        })
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        let event_loop = self.event_loop.take().ok_or(AppError::AlreadyRunning)?;
        let mut result = Ok(());

        event_loop.run(|event, elwt| {
            if let Err(err) = self.handle_event(event, elwt) {
                error!("{}", err);
                result = Err(err);
                elwt.exit();
            }
        })?;

        result
    }

    fn handle_event(
        &mut self,
        event: Event<()>,
        elwt: &EventLoopWindowTarget<()>,
    ) -> Result<(), AppError> {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(size) => self.handle_resize(size),
                WindowEvent::KeyboardInput { event, .. } => {
                    self.input_manager.handle_keyboard_input(&event)
                }
                WindowEvent::CursorMoved { position, .. } => {
                    self.input_manager.handle_cursor_movement(position)
                }
                WindowEvent::CursorEntered { .. } => self.input_manager.handle_cursor_enter(),
                WindowEvent::Focused(false) => self.input_manager.clear_held_keys(),
                _ => (),
            },
            Event::AboutToWait => self.update(elwt)?,
            Event::LoopExiting => self.shutdown(),
            _ => (),
        }

        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        self.render_manager.handle_resize(size);
        self.camera_controller
            .camera_mut()
            .set_aspect_ratio(size.width as f32 / size.height as f32);
    }

    fn update(&mut self, elwt: &EventLoopWindowTarget<()>) -> Result<(), AppError> {
        self.time_manager.update();
        let delta = self.time_manager.delta();
        self.render_timer += delta;

        let frame = self.input_manager.frame();
        if frame.quit {
            elwt.exit();
            return Ok(());
        }
        if frame.toggle_fullscreen {
            self.toggle_fullscreen();
        }

        self.camera_controller.update(delta, &frame);
        self.input_manager.late_update();

        if self.render_timer >= self.min_render_time {
            self.render_timer = 0.0;

            let uniforms = FrameUniforms::new(
                self.model_matrix,
                self.camera_controller.camera_mut(),
                &self.settings.lighting,
                &self.settings.material,
            );
            self.render_manager.render(&self.meshes, &uniforms)?;
        }

        Ok(())
    }

    fn toggle_fullscreen(&self) {
        let fullscreen = match self.window.fullscreen() {
            Some(_) => None,
            None => Some(Fullscreen::Borderless(None)),
        };

        info!("Fullscreen: {}", fullscreen.is_some());
        self.window.set_fullscreen(fullscreen);
    }

    /// Releases GPU meshes while the device is still alive.
    fn shutdown(&mut self) {
        info!("Shutting down");
        self.meshes.destroy(self.render_manager.backend_mut());
    }
}
