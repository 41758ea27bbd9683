//! Portalview. Flat rectangular portals that show, in real time, what a second camera sees
//! through a paired portal elsewhere in the scene. Each frame the camera behind the exit is
//! placed by mirroring the viewer through the entry, then given an off-axis projection framing
//! the portal rectangle exactly, so its image lines up with the world seen through the quad.
//! Scenes are drawn by a small CPU rasterizer, in a window or headless.
mod camera;
mod config;
mod frame;
mod handle;
mod input;
pub mod mesh;
mod portal;
mod portal_motion;
mod projection;
mod raster;
mod render;
pub mod runtime;
mod scene;
mod transform;
mod vertex;
pub use camera::{view_matrix, Camera, MotionSpeeds, PortalCamera, Viewer};
pub use config::Config;
pub use frame::{FrameState, FrameStats};
pub use handle::{MeshKey, ObjectKey, PortalKey};
pub use input::{InputState, KeyboardState};
pub use mesh::Mesh;
pub use portal::{
    mirror, portal_matrix, portal_rotation, solve_portal_camera_position, PortalPair,
    PortalSurface,
};
pub use portal_motion::PortalMotion;
pub use projection::{frame_corners, FramedView, Frustum};
pub use raster::SoftwareRenderer;
pub use render::{to_rgba, ClipPlane, CullCone, PassStats, RenderPass, RenderTarget, Renderer, Rgba};
pub use scene::{Object, Scene};
pub use transform::Transform;
pub use vertex::Vertex;
pub use nalgebra;
