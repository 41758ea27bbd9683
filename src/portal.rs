//! Portal surfaces and the pose solver that places the through-portal camera.
//!
//! Portals are rectangles on the local XY plane, front face toward local +Z. Stepping through
//! the front of the entry puts you in front of the exit, so the mapping between the two local
//! frames is a half turn about the shared up axis: local X and Z flip sign, Y is kept.
use crate::camera::PortalCamera;
use crate::handle::PortalKey;
use crate::transform::Transform;
use anyhow::{ensure, Context, Result};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector2, Vector3};

/// Map a point in the entry's local frame to the exit's local frame
pub fn mirror(local: &Point3<f32>) -> Point3<f32> {
    Point3::new(-local.x, local.y, -local.z)
}

/// `mirror` as a rotation
pub fn mirror_rotation() -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::PI)
}

/// Where the camera rendering "the view through `entry`" must stand, given the viewer's
/// position: the viewer's offset from the entry, reproduced (mirrored) at the exit.
pub fn solve_portal_camera_position(
    viewer: &Point3<f32>,
    entry: &Transform,
    exit: &Transform,
) -> Point3<f32> {
    let local = entry.world_to_local(viewer);
    exit.local_to_world(&mirror(&local))
}

/// The affine map `exit * mirror * entry^-1`, taking world points in front of the entry to
/// the corresponding world points in front of the exit
pub fn portal_matrix(entry: &Transform, exit: &Transform) -> Matrix4<f32> {
    exit.matrix() * mirror_rotation().to_homogeneous() * entry.inverse_matrix()
}

/// Rotation part of `portal_matrix`, for carrying orientations through a portal
pub fn portal_rotation(entry: &Transform, exit: &Transform) -> UnitQuaternion<f32> {
    exit.rotation * mirror_rotation() * entry.rotation.inverse()
}

/// A planar rectangular portal and the camera that renders the view arriving at it
#[derive(Debug, Clone)]
pub struct PortalSurface {
    transform: Transform,
    half_extents: Vector2<f32>,
    /// Shown where no view is available (back face, recursive passes)
    pub color: [f32; 3],
    pub camera: PortalCamera,
    pub(crate) partner: Option<PortalKey>,
}

impl PortalSurface {
    pub fn new(
        transform: Transform,
        half_extents: Vector2<f32>,
        color: [f32; 3],
        camera: PortalCamera,
    ) -> Result<Self> {
        transform.validate().context("Invalid portal transform")?;
        ensure!(
            half_extents.iter().all(|e| e.is_finite() && *e > 0.),
            "Portal extents must be positive, got {:?}",
            half_extents
        );
        ensure!(
            camera.near > 0. && camera.far > camera.near,
            "Portal camera clip range {}..{} is invalid",
            camera.near,
            camera.far
        );
        Ok(Self {
            transform,
            half_extents,
            color,
            camera,
            partner: None,
        })
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn half_extents(&self) -> Vector2<f32> {
        self.half_extents
    }

    pub fn partner(&self) -> Option<PortalKey> {
        self.partner
    }

    /// Local corners in winding order: bottom-left, bottom-right, top-right, top-left
    pub fn local_corners(&self) -> [Point3<f32>; 4] {
        let (w, h) = (self.half_extents.x, self.half_extents.y);
        [
            Point3::new(-w, -h, 0.),
            Point3::new(w, -h, 0.),
            Point3::new(w, h, 0.),
            Point3::new(-w, h, 0.),
        ]
    }

    pub fn world_corners(&self) -> [Point3<f32>; 4] {
        let [bl, br, tr, tl] = self.local_corners();
        [
            self.transform.local_to_world(&bl),
            self.transform.local_to_world(&br),
            self.transform.local_to_world(&tr),
            self.transform.local_to_world(&tl),
        ]
    }

    /// World-space front normal
    pub fn normal(&self) -> Vector3<f32> {
        let [bl, br, _, tl] = self.world_corners();
        (br - bl).cross(&(tl - bl)).normalize()
    }

    /// Signed distance of `point` from the portal plane, positive in front
    pub fn signed_distance(&self, point: &Point3<f32>) -> f32 {
        (point - self.transform.local_to_world(&Point3::origin())).dot(&self.normal())
    }

    /// The rectangle `entry` frames, carried into this portal's frame: bottom-left,
    /// bottom-right and top-left as a camera behind this portal looking out through it sees
    /// them. When both portals are the same size these are this portal's own corners.
    pub fn corners_through(&self, entry: &PortalSurface) -> [Point3<f32>; 3] {
        let [bl, br, _, tl] = entry.local_corners();
        let carry = |p: &Point3<f32>| self.transform.local_to_world(&mirror(p));
        [carry(&bl), carry(&br), carry(&tl)]
    }

    /// Where the segment `start -> end` crosses this portal's rectangle, if it does.
    /// Returns the crossing point in world space and whether it went front to back.
    pub fn crossing(&self, start: &Point3<f32>, end: &Point3<f32>) -> Option<(Point3<f32>, bool)> {
        let a = self.transform.world_to_local(start);
        let b = self.transform.world_to_local(end);
        let front_to_back = match (a.z >= 0., b.z >= 0.) {
            (true, false) => true,
            (false, true) => false,
            _ => return None,
        };
        let t = a.z / (a.z - b.z);
        let hit = a + (b - a) * t;
        let inside = hit.x.abs() <= self.half_extents.x && hit.y.abs() <= self.half_extents.y;
        if inside {
            Some((self.transform.local_to_world(&hit), front_to_back))
        } else {
            None
        }
    }
}

/// Two linked portals. Each direction is solved every frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PortalPair {
    pub entry: PortalKey,
    pub exit: PortalKey,
}

impl PortalPair {
    /// `(entry, exit)` for both directions of travel
    pub fn directions(&self) -> [(PortalKey, PortalKey); 2] {
        [(self.entry, self.exit), (self.exit, self.entry)]
    }
}
