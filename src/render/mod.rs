mod camera;
mod orbit;

pub use camera::{CameraController, CameraMovement, CameraView, Projection, WORLD_UP};
pub use orbit::OrbitControls;

use crate::app::EguiFrameOutput;
use crate::scene::sun::PointLight;
use crate::scene::{MeshMaterial, NodeKind, SceneGraph};
use winit::dpi::PhysicalSize;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("viewport has zero area ({width}x{height})")]
    EmptyViewport { width: u32, height: u32 },
    #[error("rasterizer failed on frame {frame}: {reason}")]
    Draw { frame: u64, reason: String },
}

/// Physical pixel size of the render target plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

/// Everything a rasterizer needs for one frame.
pub struct FrameDesc<'a> {
    pub frame_index: u64,
    pub scene: &'a SceneGraph,
    pub camera: CameraView,
    pub sun: &'a PointLight,
    pub ambient: AmbientLight,
    pub viewport: Viewport,
    pub ui: Option<&'a EguiFrameOutput>,
}

/// Draws one frame. GPU backends implement this outside the crate.
pub trait Rasterizer {
    fn draw(&mut self, frame: &FrameDesc<'_>) -> Result<(), RenderError>;

    fn resize(&mut self, _viewport: Viewport) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub meshes: usize,
    /// Meshes whose bounds center lands inside the view frustum.
    pub visible: usize,
    pub recolored: usize,
    pub translucent: usize,
    /// Meshes whose bounds center is within the sun's range.
    pub lit: usize,
    pub shadow_casters: usize,
    pub ui_primitives: usize,
    pub ui_texture_updates: usize,
}

/// Walks the scene like a real backend would and keeps per-frame statistics.
#[derive(Debug, Default)]
pub struct HeadlessRasterizer {
    frames: u64,
    last: FrameStats,
}

impl HeadlessRasterizer {
    const LOG_EVERY: u64 = 600;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last
    }
}

impl Rasterizer for HeadlessRasterizer {
    fn draw(&mut self, frame: &FrameDesc<'_>) -> Result<(), RenderError> {
        if frame.viewport.is_empty() {
            return Err(RenderError::EmptyViewport {
                width: frame.viewport.width,
                height: frame.viewport.height,
            });
        }
        let scene = frame.scene;
        let view_proj = frame.camera.projection * frame.camera.view;
        let sun = frame.sun;
        let mut stats = FrameStats::default();
        for id in scene.descendants(scene.root()) {
            let Some(node) = scene.get(id) else {
                continue;
            };
            let (NodeKind::Mesh, Some(mesh)) = (node.kind, node.mesh.as_ref()) else {
                continue;
            };
            stats.meshes += 1;
            if matches!(mesh.material, MeshMaterial::Flat(_)) {
                stats.recolored += 1;
            }
            if mesh.material.linear_rgba()[3] < 1.0 {
                stats.translucent += 1;
            }
            if sun.cast_shadows {
                stats.shadow_casters += 1;
            }
            if let Some(bounds) = scene.mesh_bounds(id) {
                if sun.intensity > 0.0 && bounds.center().distance(sun.position) <= sun.range {
                    stats.lit += 1;
                }
                let clip = view_proj * bounds.center().extend(1.0);
                let inside = clip.w > 0.0
                    && clip.x.abs() <= clip.w
                    && clip.y.abs() <= clip.w
                    && clip.z.abs() <= clip.w;
                if inside {
                    stats.visible += 1;
                }
            }
        }
        if let Some(ui) = frame.ui {
            stats.ui_primitives = ui.clipped_primitives.len();
            stats.ui_texture_updates = ui.textures_delta.set.len() + ui.textures_delta.free.len();
            let expected = [frame.viewport.width.max(1), frame.viewport.height.max(1)];
            if ui.screen_size_px != expected {
                log::debug!(
                    "Panel tessellated for {:?} at {:.2} points/px, viewport is {:?}",
                    ui.screen_size_px,
                    ui.pixels_per_point,
                    expected
                );
            }
        }

        self.frames += 1;
        self.last = stats;
        if frame.frame_index % Self::LOG_EVERY == 0 {
            log::debug!(
                "Frame {}: {}/{} meshes visible ({} recolored, {} translucent), {} ui primitives",
                frame.frame_index,
                stats.visible,
                stats.meshes,
                stats.recolored,
                stats.translucent,
                stats.ui_primitives
            );
            log::debug!(
                "Sun at ({:.2}, {:.2}, {:.2}) color {:?} x{:.1} lights {} meshes; ambient {:?} x{:.1}",
                sun.position.x,
                sun.position.y,
                sun.position.z,
                sun.color,
                sun.intensity,
                stats.lit,
                frame.ambient.color,
                frame.ambient.intensity
            );
        }
        Ok(())
    }
}

pub struct RenderContext {
    rasterizer: Box<dyn Rasterizer>,
    viewport: Viewport,
    draw_failures: u64,
}

impl RenderContext {
    pub fn new(rasterizer: Box<dyn Rasterizer>, size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let viewport = Viewport {
            width: size.width,
            height: size.height,
            pixel_ratio: scale_factor,
        };
        let mut context = Self {
            rasterizer,
            viewport,
            draw_failures: 0,
        };
        context.rasterizer.resize(viewport);
        context
    }

    pub fn headless(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        Self::new(Box::new(HeadlessRasterizer::new()), size, scale_factor)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        self.viewport = Viewport {
            width: new_size.width,
            height: new_size.height,
            pixel_ratio: scale_factor,
        };
        self.rasterizer.resize(self.viewport);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn draw_failures(&self) -> u64 {
        self.draw_failures
    }

    /// Hands the frame to the rasterizer. Failures are logged and counted, never propagated.
    pub fn draw(&mut self, frame: &FrameDesc<'_>) -> bool {
        match self.rasterizer.draw(frame) {
            Ok(()) => true,
            Err(err) => {
                self.draw_failures += 1;
                // A minimized window reports an empty viewport every frame.
                if self.draw_failures == 1 || self.draw_failures % 300 == 0 {
                    log::warn!("Draw failed ({} so far): {}", self.draw_failures, err);
                }
                false
            }
        }
    }
}
