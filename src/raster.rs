//! Small CPU rasterizer: flat vertex colors, depth testing, and perspective-correct texturing
//! of portal quads from their partner's render target.
use crate::render::{to_rgba, PassStats, RenderPass, RenderTarget, Renderer, Rgba};
use anyhow::{format_err, Result};
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Renders into a `RenderTarget` on the CPU
#[derive(Debug, Default)]
pub struct SoftwareRenderer;

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for SoftwareRenderer {
    fn render(&mut self, pass: &RenderPass<'_>, target: &mut RenderTarget) -> Result<PassStats> {
        target.clear(pass.clear_color);
        let mut stats = PassStats::default();

        for (_, object) in pass.scene.objects() {
            let mesh = pass
                .scene
                .mesh(object.mesh)
                .ok_or_else(|| format_err!("Object references a mesh that does not exist"))?;

            if let Some(cone) = &pass.cull_cone {
                let (center, radius) = mesh.bounding_sphere();
                let center = transform_point(&object.transform, &center);
                let radius = radius * max_scale(&object.transform);
                if !cone.may_contain(&center, radius) {
                    stats.objects_culled += 1;
                    continue;
                }
            }
            stats.objects_drawn += 1;

            for [a, b, c] in mesh.triangles() {
                let corner = |v: &crate::Vertex| {
                    let world = transform_point(&object.transform, &v.position());
                    ClipVertex::new(pass, world, v.color)
                };
                let triangle = [corner(a), corner(b), corner(c)];
                stats.triangles += draw_polygon(pass, target, &triangle, &|attr| to_rgba(attr));
            }
        }

        for (key, portal) in pass.scene.portals() {
            if pass.hidden_portal == Some(key) {
                continue;
            }
            let in_front = portal.signed_distance(&pass.eye) > 0.;
            let texture = match (pass.portal_textures, portal.partner()) {
                (Some(textures), Some(partner)) if in_front => {
                    textures.get(partner).filter(|t| t.is_written())
                }
                _ => None,
            };

            let [bl, br, tr, tl] = portal.world_corners();
            let quad = match texture {
                Some(_) => [
                    ClipVertex::new(pass, bl, [0., 0., 0.]),
                    ClipVertex::new(pass, br, [1., 0., 0.]),
                    ClipVertex::new(pass, tr, [1., 1., 0.]),
                    ClipVertex::new(pass, tl, [0., 1., 0.]),
                ],
                None => [
                    ClipVertex::new(pass, bl, portal.color),
                    ClipVertex::new(pass, br, portal.color),
                    ClipVertex::new(pass, tr, portal.color),
                    ClipVertex::new(pass, tl, portal.color),
                ],
            };

            stats.triangles += match texture {
                Some(texture) => draw_polygon(pass, target, &quad, &|uv| texture.sample(uv[0], uv[1])),
                None => draw_polygon(pass, target, &quad, &|attr| to_rgba(attr)),
            };
        }

        Ok(stats)
    }
}

fn transform_point(m: &Matrix4<f32>, p: &Point3<f32>) -> Point3<f32> {
    let h = m * p.to_homogeneous();
    Point3::from(h.xyz() / h.w)
}

/// Largest axis scale of an affine transform, for bounding spheres
fn max_scale(m: &Matrix4<f32>) -> f32 {
    (0..3)
        .map(|i| Vector3::new(m[(0, i)], m[(1, i)], m[(2, i)]).norm())
        .fold(0., f32::max)
}

/// A polygon corner carried through clipping
#[derive(Debug, Copy, Clone)]
struct ClipVertex {
    world: Point3<f32>,
    clip: Vector4<f32>,
    /// Color, or texture coordinates in the first two slots
    attr: [f32; 3],
}

impl ClipVertex {
    fn new(pass: &RenderPass<'_>, world: Point3<f32>, attr: [f32; 3]) -> Self {
        Self {
            world,
            clip: pass.view_projection * world.to_homogeneous(),
            attr,
        }
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        let mut attr = [0.; 3];
        for i in 0..3 {
            attr[i] = self.attr[i] + (other.attr[i] - self.attr[i]) * t;
        }
        Self {
            world: self.world + (other.world - self.world) * t,
            clip: self.clip + (other.clip - self.clip) * t,
            attr,
        }
    }
}

/// Sutherland-Hodgman against one half space, `distance >= 0` is kept
fn clip_polygon(poly: &[ClipVertex], distance: impl Fn(&ClipVertex) -> f32) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(poly.len() + 2);
    for (i, a) in poly.iter().enumerate() {
        let b = &poly[(i + 1) % poly.len()];
        let (da, db) = (distance(a), distance(b));
        if da >= 0. {
            out.push(*a);
        }
        if (da >= 0.) != (db >= 0.) {
            out.push(a.lerp(b, da / (da - db)));
        }
    }
    out
}

/// Clip a convex polygon and rasterize it as a fan. Returns the number of triangles drawn.
fn draw_polygon(
    pass: &RenderPass<'_>,
    target: &mut RenderTarget,
    poly: &[ClipVertex],
    shade: &dyn Fn([f32; 3]) -> Rgba,
) -> usize {
    let mut poly = poly.to_vec();
    if let Some(plane) = &pass.clip_plane {
        poly = clip_polygon(&poly, |v| plane.distance(&v.world));
    }
    // OpenGL near plane: z >= -w
    poly = clip_polygon(&poly, |v| v.clip.z + v.clip.w);
    if poly.len() < 3 {
        return 0;
    }

    let mut drawn = 0;
    for i in 1..poly.len() - 1 {
        if rasterize(target, [&poly[0], &poly[i], &poly[i + 1]], shade) {
            drawn += 1;
        }
    }
    drawn
}

/// Screen-space vertex: pixel coordinates, depth in [0, 1], and 1/w
struct ScreenVertex {
    x: f32,
    y: f32,
    depth: f32,
    inv_w: f32,
}

fn to_screen(v: &ClipVertex, width: f32, height: f32) -> Option<ScreenVertex> {
    if !(v.clip.w > 0.) {
        return None;
    }
    let inv_w = 1. / v.clip.w;
    let ndc = v.clip.xyz() * inv_w;
    let screen = ScreenVertex {
        x: (ndc.x + 1.) * 0.5 * width,
        y: (1. - ndc.y) * 0.5 * height,
        depth: ndc.z * 0.5 + 0.5,
        inv_w,
    };
    if screen.x.is_finite() && screen.y.is_finite() && screen.depth.is_finite() {
        Some(screen)
    } else {
        None
    }
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, x: f32, y: f32) -> f32 {
    (x - a.x) * (b.y - a.y) - (y - a.y) * (b.x - a.x)
}

fn rasterize(
    target: &mut RenderTarget,
    tri: [&ClipVertex; 3],
    shade: &dyn Fn([f32; 3]) -> Rgba,
) -> bool {
    let (width, height) = (target.width() as f32, target.height() as f32);
    let (p0, p1, p2) = match (
        to_screen(tri[0], width, height),
        to_screen(tri[1], width, height),
        to_screen(tri[2], width, height),
    ) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return false,
    };

    let area = edge(&p0, &p1, p2.x, p2.y);
    if area.abs() <= f32::EPSILON {
        return false;
    }

    let min_x = p0.x.min(p1.x).min(p2.x).floor().max(0.);
    let max_x = p0.x.max(p1.x).max(p2.x).ceil().min(width - 1.);
    let min_y = p0.y.min(p1.y).min(p2.y).floor().max(0.);
    let max_y = p0.y.max(p1.y).max(p2.y).ceil().min(height - 1.);
    if min_x > max_x || min_y > max_y {
        return false;
    }

    for y in min_y as u32..=max_y as u32 {
        for x in min_x as u32..=max_x as u32 {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            // Dividing by the signed area accepts either winding
            let b0 = edge(&p1, &p2, px, py) / area;
            let b1 = edge(&p2, &p0, px, py) / area;
            let b2 = edge(&p0, &p1, px, py) / area;
            if b0 < 0. || b1 < 0. || b2 < 0. {
                continue;
            }

            let depth = b0 * p0.depth + b1 * p1.depth + b2 * p2.depth;
            if !(0. ..=1.).contains(&depth) {
                continue;
            }

            // Perspective-correct attributes
            let w0 = b0 * p0.inv_w;
            let w1 = b1 * p1.inv_w;
            let w2 = b2 * p2.inv_w;
            let sum = w0 + w1 + w2;
            let mut attr = [0.; 3];
            for i in 0..3 {
                attr[i] = (w0 * tri[0].attr[i] + w1 * tri[1].attr[i] + w2 * tri[2].attr[i]) / sum;
            }

            target.write_fragment(x, y, depth, shade(attr));
        }
    }
    true
}
