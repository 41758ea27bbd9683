//! Render targets and the renderer interface the frame loop draws through
use crate::handle::PortalKey;
use crate::scene::Scene;
use anyhow::{ensure, Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};
use nalgebra::{Point3, Vector3};
use slotmap::SecondaryMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub type Rgba = [u8; 4];

/// Offscreen color + depth image. Cleared every frame, never reallocated.
pub struct RenderTarget {
    width: u32,
    height: u32,
    color: Vec<Rgba>,
    depth: Vec<f32>,
    written: bool,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![[0; 4]; n],
            depth: vec![1.; n],
            written: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reset color and depth. The target counts as written from here on.
    pub fn clear(&mut self, color: Rgba) {
        for px in self.color.iter_mut() {
            *px = color;
        }
        for d in self.depth.iter_mut() {
            *d = 1.;
        }
        self.written = true;
    }

    /// Mark the contents stale, e.g. when this frame's pass was culled
    pub fn invalidate(&mut self) {
        self.written = false;
    }

    /// Whether the contents belong to the current frame
    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.color[y as usize * self.width as usize + x as usize]
    }

    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[y as usize * self.width as usize + x as usize]
    }

    /// Depth-tested write; returns whether the fragment landed
    pub fn write_fragment(&mut self, x: u32, y: u32, depth: f32, color: Rgba) -> bool {
        let idx = y as usize * self.width as usize + x as usize;
        if depth < self.depth[idx] {
            self.depth[idx] = depth;
            self.color[idx] = color;
            true
        } else {
            false
        }
    }

    /// Nearest-texel lookup, (0, 0) is the bottom-left corner
    pub fn sample(&self, u: f32, v: f32) -> Rgba {
        let x = (u * self.width as f32).floor().max(0.).min(self.width as f32 - 1.) as u32;
        let y = ((1. - v) * self.height as f32).floor().max(0.).min(self.height as f32 - 1.) as u32;
        self.pixel(x, y)
    }

    /// Raw RGBA bytes, row-major from the top row
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color)
    }

    /// Copy the color buffer into a same-sized RGBA8 frame, e.g. a window's framebuffer
    pub fn copy_to(&self, frame: &mut [u8]) -> Result<()> {
        let data = self.as_bytes();
        ensure!(
            frame.len() == data.len(),
            "Frame holds {} bytes, the {}x{} image needs {}",
            frame.len(),
            self.width,
            self.height,
            data.len()
        );
        frame.copy_from_slice(data);
        Ok(())
    }

    /// Save the color buffer as an RGBA8 PNG
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let data = self.as_bytes();
        ensure!(
            data.len() == self.width as usize * self.height as usize * 4,
            "Color buffer is not a tight {}x{} RGBA8 image",
            self.width,
            self.height
        );
        let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
        let encoder = PngEncoder::new_with_quality(
            BufWriter::new(file),
            CompressionType::Fast,
            FilterType::NoFilter,
        );
        encoder
            .write_image(data, self.width, self.height, ColorType::Rgba8)
            .with_context(|| format!("Encoding {}", path.display()))?;
        Ok(())
    }
}

/// Convert a linear [0, 1] color to RGBA8
pub fn to_rgba(color: [f32; 3]) -> Rgba {
    let c = |v: f32| (v.max(0.).min(1.) * 255.).round() as u8;
    [c(color[0]), c(color[1]), c(color[2]), 255]
}

/// Half space `dot(normal, p) >= offset` that survives clipping
#[derive(Debug, Copy, Clone)]
pub struct ClipPlane {
    pub normal: Vector3<f32>,
    pub offset: f32,
}

impl ClipPlane {
    pub fn through(point: &Point3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            offset: normal.dot(&point.coords),
            normal,
        }
    }

    pub fn distance(&self, p: &Point3<f32>) -> f32 {
        self.normal.dot(&p.coords) - self.offset
    }
}

/// Cone used to skip objects that cannot appear in a portal pass
#[derive(Debug, Copy, Clone)]
pub struct CullCone {
    pub apex: Point3<f32>,
    pub axis: Vector3<f32>,
    /// Full opening angle, radians
    pub fov: f32,
}

impl CullCone {
    /// False only when the sphere lies entirely outside the cone
    pub fn may_contain(&self, center: &Point3<f32>, radius: f32) -> bool {
        let half = self.fov / 2.;
        if half >= std::f32::consts::FRAC_PI_2 {
            return true;
        }
        let v = center - self.apex;
        let along = v.dot(&self.axis);
        let across = (v - self.axis * along).norm();
        // Distance from the sphere center to the cone's surface, positive outside
        let outside = across * half.cos() - along * half.sin();
        outside <= radius
    }
}

/// One draw of the scene into one target
pub struct RenderPass<'a> {
    pub scene: &'a Scene,
    pub view_projection: nalgebra::Matrix4<f32>,
    pub eye: Point3<f32>,
    pub clear_color: Rgba,
    /// Portal views to texture the portal quads with; `None` draws portals flat
    pub portal_textures: Option<&'a SecondaryMap<PortalKey, RenderTarget>>,
    /// Portal not drawn in this pass (the one the camera looks out of)
    pub hidden_portal: Option<PortalKey>,
    /// Geometry on the negative side is discarded
    pub clip_plane: Option<ClipPlane>,
    pub cull_cone: Option<CullCone>,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PassStats {
    pub objects_drawn: usize,
    pub objects_culled: usize,
    pub triangles: usize,
}

/// Renders a scene from a camera into a target
pub trait Renderer {
    fn render(&mut self, pass: &RenderPass<'_>, target: &mut RenderTarget) -> Result<PassStats>;
}
