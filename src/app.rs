use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::animator::AnimationMode;
use crate::gpu::{GpuContext, SurfaceErrorAction};
use crate::scene::Scene;
use crate::shader_library::ShaderLibrary;

/// Environment variable naming a directory of WGSL overrides.
pub const SHADER_DIR_ENV: &str = "TWIRL_SHADER_DIR";
/// Environment variable selecting the [`AnimationMode`].
pub const ANIMATION_ENV: &str = "TWIRL_ANIMATION";

/// Configuration for the demo window.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: wgpu::Color,
    /// Directory searched for `vertex.wgsl` / `fragment.wgsl` before the built-ins.
    pub shader_dir: Option<PathBuf>,
    pub animation: AnimationMode,
    /// Recompile shaders when their files change on disk.
    pub hot_reload: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Twirl".to_string(),
            width: 800,
            height: 800,
            clear_color: wgpu::Color::BLACK,
            shader_dir: None,
            animation: AnimationMode::default(),
            hot_reload: true,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `TWIRL_SHADER_DIR` and `TWIRL_ANIMATION`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = var(SHADER_DIR_ENV).filter(|d| !d.is_empty()) {
            config.shader_dir = Some(PathBuf::from(dir));
        }
        if let Some(mode) = var(ANIMATION_ENV) {
            config.animation = mode
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {ANIMATION_ENV}"))?;
        }
        Ok(config)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    pub fn animation(mut self, mode: AnimationMode) -> Self {
        self.animation = mode;
        self
    }

    pub fn hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }
}

/// Open a window and animate the scene until it is closed.
///
/// Escape closes the window, `R` resets the animation, `Space` pauses it.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TwirlApp::Pending { config };
    event_loop.run_app(&mut app).context("event loop failed")?;

    match app {
        TwirlApp::Failed(e) => Err(e),
        _ => Ok(()),
    }
}

enum TwirlApp {
    Pending {
        config: AppConfig,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        scene: Scene,
        clear_color: wgpu::Color,
    },
    Failed(anyhow::Error),
}

impl TwirlApp {
    fn start(config: &AppConfig, event_loop: &ActiveEventLoop) -> anyhow::Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("failed to create window")?,
        );

        let gpu = GpuContext::new(window.clone())?;
        let shaders =
            ShaderLibrary::new(config.shader_dir.clone()).with_hot_reload(config.hot_reload);
        let scene = Scene::new(&gpu, shaders, config.animation)?;
        log::info!("scene ready ({:?} animation)", config.animation);

        window.request_redraw();
        Ok(TwirlApp::Running {
            window,
            gpu,
            scene,
            clear_color: config.clear_color,
        })
    }
}

impl ApplicationHandler for TwirlApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let TwirlApp::Pending { config } = self else {
            return;
        };

        *self = match Self::start(config, event_loop) {
            Ok(running) => running,
            Err(e) => {
                log::error!("startup failed: {e:#}");
                event_loop.exit();
                TwirlApp::Failed(e)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let TwirlApp::Running {
            window,
            gpu,
            scene,
            clear_color,
        } = self
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::KeyR => scene.reset(),
                KeyCode::Space => scene.toggle_pause(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                if let Err(e) = render(gpu, scene, *clear_color) {
                    log::error!("{e:#}");
                    event_loop.exit();
                    return;
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Clear the surface and draw the scene once.
fn render(gpu: &GpuContext, scene: &mut Scene, clear_color: wgpu::Color) -> anyhow::Result<()> {
    let output = match gpu.acquire() {
        Ok(output) => output,
        Err(SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame) => return Ok(()),
        Err(SurfaceErrorAction::Fatal) => anyhow::bail!("surface is unusable"),
    };
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        scene.draw(gpu, &mut render_pass)?;
    }

    gpu.queue.submit(std::iter::once(encoder.finish()));
    output.present();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Twirl");
        assert_eq!((config.width, config.height), (800, 800));
        assert_eq!(config.animation, AnimationMode::Incremental);
        assert!(config.shader_dir.is_none());
        assert!(config.hot_reload);
    }

    #[test]
    fn builder_overrides() {
        let config = AppConfig::new()
            .title("Spin")
            .size(640, 480)
            .shader_dir("assets/shaders")
            .animation(AnimationMode::Absolute)
            .hot_reload(false);
        assert_eq!(config.title, "Spin");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.shader_dir, Some(PathBuf::from("assets/shaders")));
        assert_eq!(config.animation, AnimationMode::Absolute);
        assert!(!config.hot_reload);
    }

    #[test]
    fn reads_environment() {
        let config = AppConfig::from_vars(vars(&[
            (SHADER_DIR_ENV, "/tmp/shaders"),
            (ANIMATION_ENV, "absolute"),
        ]))
        .unwrap();
        assert_eq!(config.shader_dir, Some(PathBuf::from("/tmp/shaders")));
        assert_eq!(config.animation, AnimationMode::Absolute);

        let config = AppConfig::from_vars(vars(&[(SHADER_DIR_ENV, "")])).unwrap();
        assert!(config.shader_dir.is_none());
    }

    #[test]
    fn rejects_bad_animation_mode() {
        let err = AppConfig::from_vars(vars(&[(ANIMATION_ENV, "wobbly")])).unwrap_err();
        assert!(format!("{err:#}").contains("wobbly"));
    }
}
