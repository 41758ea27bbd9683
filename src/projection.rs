//! Generalized perspective projection: frame an arbitrary planar rectangle from an eye point.
//!
//! Given the eye and three corners of a rectangle (bottom-left, bottom-right, top-left), this
//! produces the camera rotation and the asymmetric frustum that make the rectangle exactly
//! fill the image. Camera space is OpenGL-like: +X right, +Y up, looking down -Z.
use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};
use std::f32::consts::PI;

/// Off-axis frustum extents measured on the near plane
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// OpenGL-style clip matrix (the same layout as `glFrustum`)
    pub fn matrix(&self) -> Matrix4<f32> {
        let Frustum {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;
        #[rustfmt::skip]
        let m = Matrix4::new(
            2. * n / (r - l), 0., (r + l) / (r - l), 0.,
            0., 2. * n / (t - b), (t + b) / (t - b), 0.,
            0., 0., (f + n) / (n - f), 2. * f * n / (n - f),
            0., 0., -1., 0.,
        );
        m
    }

    /// Closed form inverse of `matrix()`
    pub fn inverse_matrix(&self) -> Matrix4<f32> {
        let Frustum {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;
        #[rustfmt::skip]
        let m = Matrix4::new(
            (r - l) / (2. * n), 0., 0., (r + l) / (2. * n),
            0., (t - b) / (2. * n), 0., (t + b) / (2. * n),
            0., 0., 0., -1.,
            0., 0., (n - f) / (2. * f * n), (f + n) / (2. * f * n),
        );
        m
    }
}

/// Everything `frame_corners` derives for one camera
#[derive(Debug, Copy, Clone)]
pub struct FramedView {
    /// World orientation of the camera
    pub orientation: UnitQuaternion<f32>,
    pub frustum: Frustum,
    pub projection: Matrix4<f32>,
    pub projection_inverse: Matrix4<f32>,
    /// Perpendicular distance from the eye to the rectangle's plane
    pub distance: f32,
    /// Full cone angle (radians) containing the framed rectangle, if requested
    pub estimated_fov: Option<f32>,
}

impl FramedView {
    /// False for degenerate rectangles or an eye on (or behind) the rectangle's plane
    pub fn is_valid(&self) -> bool {
        self.distance > 0.
            && self.projection.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }
}

/// Frame the rectangle `[bottom_left, bottom_right, top_left]` as seen from `eye`.
///
/// The corners must not be collinear and `eye` must lie in front of the rectangle (on the
/// side its right-handed normal `right x up` points to). Violating that yields non-finite
/// values rather than a plausible but wrong projection.
pub fn frame_corners(
    eye: &Point3<f32>,
    [bottom_left, bottom_right, top_left]: [Point3<f32>; 3],
    near: f32,
    far: f32,
    estimate_fov: bool,
) -> FramedView {
    // Orthonormal screen basis
    let vr = (bottom_right - bottom_left).normalize();
    let vu = (top_left - bottom_left).normalize();
    let vn = vr.cross(&vu).normalize();

    // Eye to corners
    let va = bottom_left - eye;
    let vb = bottom_right - eye;
    let vc = top_left - eye;

    let distance = -va.dot(&vn);
    let scale = near / distance;
    let frustum = Frustum {
        left: vr.dot(&va) * scale,
        right: vr.dot(&vb) * scale,
        bottom: vu.dot(&va) * scale,
        top: vu.dot(&vc) * scale,
        near,
        far,
    };

    let orientation = screen_orientation(&vu, &vn);

    let estimated_fov = if estimate_fov {
        let top_right = bottom_right + (top_left - bottom_left);
        Some(enclosing_fov(
            eye,
            &-vn,
            &[bottom_left, bottom_right, top_right, top_left],
        ))
    } else {
        None
    };

    FramedView {
        orientation,
        frustum,
        projection: frustum.matrix(),
        projection_inverse: frustum.inverse_matrix(),
        distance,
        estimated_fov,
    }
}

/// Rotation taking +Y onto `up`, then the rotated +Z onto `normal`
fn screen_orientation(up: &Vector3<f32>, normal: &Vector3<f32>) -> UnitQuaternion<f32> {
    let align_up = rotation_or_half_turn(&Vector3::y(), up, &Vector3::x_axis());
    let forward = align_up * Vector3::z();
    // `forward` and `normal` are both perpendicular to `up`, so a half turn about it is exact
    let pivot = Unit::try_new(*up, f32::EPSILON).unwrap_or_else(|| Vector3::y_axis());
    let align_forward = rotation_or_half_turn(&forward, normal, &pivot);
    align_forward * align_up
}

fn rotation_or_half_turn(
    from: &Vector3<f32>,
    to: &Vector3<f32>,
    pivot: &Unit<Vector3<f32>>,
) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(from, to)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(pivot, PI))
}

/// Twice the widest angle between `forward` and any eye-to-corner direction
fn enclosing_fov(eye: &Point3<f32>, forward: &Vector3<f32>, corners: &[Point3<f32>]) -> f32 {
    let widest = corners
        .iter()
        .map(|corner| {
            let dir = (corner - eye).normalize();
            dir.dot(forward).max(-1.).min(1.).acos()
        })
        .fold(0., f32::max);
    2. * widest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::view_matrix;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::Vector4;

    const NEAR: f32 = 0.1;
    const FAR: f32 = 100.;

    fn project(m: &Matrix4<f32>, p: &Point3<f32>) -> Vector3<f32> {
        let clip: Vector4<f32> = m * p.to_homogeneous();
        clip.xyz() / clip.w
    }

    fn assert_frames_exactly(eye: Point3<f32>, bl: Point3<f32>, br: Point3<f32>, tl: Point3<f32>) {
        let tr = br + (tl - bl);
        let view = frame_corners(&eye, [bl, br, tl], NEAR, FAR, false);
        assert!(view.is_valid());
        let mvp = view.projection * view_matrix(&eye, &view.orientation);

        for (corner, expected) in [(bl, (-1., -1.)), (br, (1., -1.)), (tl, (-1., 1.)), (tr, (1., 1.))]
            .iter()
        {
            let ndc = project(&mvp, corner);
            assert_abs_diff_eq!(ndc.x, expected.0, epsilon = 1e-4);
            assert_abs_diff_eq!(ndc.y, expected.1, epsilon = 1e-4);
            assert!(ndc.z > -1. && ndc.z < 1.);
        }
    }

    #[test]
    fn corners_land_on_clip_corners() {
        assert_frames_exactly(
            Point3::new(0.3, -0.2, 4.),
            Point3::new(-1., -1., 0.),
            Point3::new(2., -1., 0.),
            Point3::new(-1., 0.5, 0.),
        );
    }

    #[test]
    fn corners_land_on_clip_corners_for_tilted_quad() {
        let rotation = UnitQuaternion::from_euler_angles(0.4, -1.1, 0.25);
        let origin = Vector3::new(3., 1., -2.);
        let place = |x: f32, y: f32| Point3::from(rotation * Vector3::new(x, y, 0.) + origin);
        let eye = Point3::from(rotation * Vector3::new(-2.5, 0.7, 6.) + origin);
        assert_frames_exactly(eye, place(-1.5, -1.), place(1.5, -1.), place(-1.5, 1.));
    }

    #[test]
    fn upside_down_quad_still_frames() {
        // Quad rotated half a turn about its normal, so up points along -Y
        assert_frames_exactly(
            Point3::new(0.5, 0.5, 3.),
            Point3::new(1., 1., 0.),
            Point3::new(-1., 1., 0.),
            Point3::new(1., -1., 0.),
        );
    }

    #[test]
    fn centered_quad_matches_symmetric_perspective() {
        let distance = 5.;
        let (half_w, half_h) = (4., 2.);
        let eye = Point3::origin();
        let view = frame_corners(
            &eye,
            [
                Point3::new(-half_w, -half_h, -distance),
                Point3::new(half_w, -half_h, -distance),
                Point3::new(-half_w, half_h, -distance),
            ],
            NEAR,
            FAR,
            false,
        );

        let fovy = 2. * (half_h / distance).atan();
        let expected = Matrix4::new_perspective(half_w / half_h, fovy, NEAR, FAR);
        assert_relative_eq!(view.projection, expected, epsilon = 1e-4);
        assert_relative_eq!(view.orientation, UnitQuaternion::identity(), epsilon = 1e-6);
        assert_abs_diff_eq!(view.distance, distance, epsilon = 1e-6);
    }

    #[test]
    fn inverse_is_inverse() {
        let view = frame_corners(
            &Point3::new(1., 2., 7.),
            [
                Point3::new(-1., -1., 0.),
                Point3::new(3., -1., 0.),
                Point3::new(-1., 2., 0.),
            ],
            NEAR,
            FAR,
            false,
        );
        assert_relative_eq!(
            view.projection * view.projection_inverse,
            Matrix4::identity(),
            epsilon = 1e-3
        );
    }

    #[test]
    fn orientation_faces_the_quad() {
        // Quad on the x = 0 plane, facing +X
        let view = frame_corners(
            &Point3::new(6., 0., 0.),
            [
                Point3::new(0., -1., 1.),
                Point3::new(0., -1., -1.),
                Point3::new(0., 1., 1.),
            ],
            NEAR,
            FAR,
            false,
        );
        let forward = view.orientation * -Vector3::z();
        let up = view.orientation * Vector3::y();
        assert_relative_eq!(forward, -Vector3::x(), epsilon = 1e-5);
        assert_relative_eq!(up, Vector3::y(), epsilon = 1e-5);
    }

    #[test]
    fn collinear_corners_are_not_finite() {
        let view = frame_corners(
            &Point3::new(0., 0., 5.),
            [
                Point3::new(0., 0., 0.),
                Point3::new(1., 0., 0.),
                Point3::new(2., 0., 0.),
            ],
            NEAR,
            FAR,
            false,
        );
        assert!(view.projection.iter().any(|v| !v.is_finite()));
        assert!(!view.is_valid());
    }

    #[test]
    fn eye_on_plane_is_not_finite() {
        let view = frame_corners(
            &Point3::new(5., 0., 0.),
            [
                Point3::new(-1., -1., 0.),
                Point3::new(1., -1., 0.),
                Point3::new(-1., 1., 0.),
            ],
            NEAR,
            FAR,
            false,
        );
        assert!(view.projection.iter().any(|v| !v.is_finite()));
        assert!(!view.is_valid());
    }

    #[test]
    fn deterministic() {
        let corners = [
            Point3::new(-1., -1., 0.),
            Point3::new(1.5, -1., 0.2),
            Point3::new(-1., 1., 0.),
        ];
        let eye = Point3::new(0.1, 0.2, 3.);
        let a = frame_corners(&eye, corners, NEAR, FAR, true);
        let b = frame_corners(&eye, corners, NEAR, FAR, true);
        assert_eq!(a.projection, b.projection);
        assert_eq!(a.orientation, b.orientation);
        assert_eq!(a.estimated_fov, b.estimated_fov);
    }

    #[test]
    fn fov_estimate_encloses_the_quad() {
        for &(half, distance) in &[(1., 2.), (1., 10.), (1., 0.5), (3., 4.)] {
            let view = frame_corners(
                &Point3::origin(),
                [
                    Point3::new(-half, -half, -distance),
                    Point3::new(half, -half, -distance),
                    Point3::new(-half, half, -distance),
                ],
                NEAR,
                FAR,
                true,
            );
            let analytic = 2. * (half / distance).atan();
            let estimate = view.estimated_fov.unwrap();
            assert!(estimate >= analytic - 1e-5, "{} < {}", estimate, analytic);
            assert!(estimate <= analytic * 2f32.sqrt() + 1e-5, "{} too wide", estimate);
        }
    }

    #[test]
    fn fov_estimate_is_optional() {
        let view = frame_corners(
            &Point3::new(0., 0., 1.),
            [
                Point3::new(-1., -1., 0.),
                Point3::new(1., -1., 0.),
                Point3::new(-1., 1., 0.),
            ],
            NEAR,
            FAR,
            false,
        );
        assert!(view.estimated_fov.is_none());
    }
}
