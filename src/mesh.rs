use crate::Vertex;
use anyhow::{ensure, Result};
use nalgebra::Point3;

/// Indexed triangle list
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u16>) -> Result<Self> {
        ensure!(indices.len() % 3 == 0, "Index count {} is not a multiple of 3", indices.len());
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            anyhow::bail!("Index {} out of range for {} vertices", bad, vertices.len());
        }
        Ok(Self { vertices, indices })
    }

    pub fn triangles(&self) -> impl Iterator<Item = [&Vertex; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                &self.vertices[tri[0] as usize],
                &self.vertices[tri[1] as usize],
                &self.vertices[tri[2] as usize],
            ]
        })
    }

    /// Center and radius of a sphere containing every vertex
    pub fn bounding_sphere(&self) -> (Point3<f32>, f32) {
        if self.vertices.is_empty() {
            return (Point3::origin(), 0.);
        }
        let sum = self
            .vertices
            .iter()
            .fold(Point3::origin().coords, |acc, v| acc + v.position().coords);
        let center = Point3::from(sum / self.vertices.len() as f32);
        let radius = self
            .vertices
            .iter()
            .map(|v| (v.position() - center).norm())
            .fold(0., f32::max);
        (center, radius)
    }
}

pub fn rainbow_cube() -> Mesh {
    let vertices = vec![
        Vertex::new([-1.0, -1.0, -1.0], [0.0, 1.0, 1.0]),
        Vertex::new([1.0, -1.0, -1.0], [1.0, 0.0, 1.0]),
        Vertex::new([1.0, 1.0, -1.0], [1.0, 1.0, 0.0]),
        Vertex::new([-1.0, 1.0, -1.0], [0.0, 1.0, 1.0]),
        Vertex::new([-1.0, -1.0, 1.0], [1.0, 0.0, 1.0]),
        Vertex::new([1.0, -1.0, 1.0], [1.0, 1.0, 0.0]),
        Vertex::new([1.0, 1.0, 1.0], [0.0, 1.0, 1.0]),
        Vertex::new([-1.0, 1.0, 1.0], [1.0, 0.0, 1.0]),
    ];

    let indices = vec![
        3, 1, 0, 2, 1, 3, 2, 5, 1, 6, 5, 2, 6, 4, 5, 7, 4, 6, 7, 0, 4, 3, 0, 7, 7, 2, 3, 6, 2, 7,
        0, 5, 4, 1, 5, 0,
    ];

    Mesh { vertices, indices }
}

/// Axis aligned box from `min` to `max` in a single color
pub fn cuboid(min: [f32; 3], max: [f32; 3], color: [f32; 3]) -> Mesh {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let vertices = vec![
        Vertex::new([x0, y0, z0], color),
        Vertex::new([x1, y0, z0], color),
        Vertex::new([x1, y1, z0], color),
        Vertex::new([x0, y1, z0], color),
        Vertex::new([x0, y0, z1], color),
        Vertex::new([x1, y0, z1], color),
        Vertex::new([x1, y1, z1], color),
        Vertex::new([x0, y1, z1], color),
    ];
    let mut mesh = rainbow_cube();
    mesh.vertices = vertices;
    mesh
}

/// Checkerboard floor on the y = 0 plane, `size` tiles out from the origin in each direction
pub fn checkerboard(size: i32, scale: f32, colors: [[f32; 3]; 2]) -> Mesh {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for i in -size..size {
        for j in -size..size {
            let color = colors[((i + j) & 1) as usize];
            let (x0, z0) = (i as f32 * scale, j as f32 * scale);
            let (x1, z1) = (x0 + scale, z0 + scale);
            let base = vertices.len() as u16;
            vertices.push(Vertex::new([x0, 0., z0], color));
            vertices.push(Vertex::new([x1, 0., z0], color));
            vertices.push(Vertex::new([x1, 0., z1], color));
            vertices.push(Vertex::new([x0, 0., z1], color));
            indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }
    }
    Mesh { vertices, indices }
}
