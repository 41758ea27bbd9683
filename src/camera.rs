use crate::input::InputState;
use crate::projection::{frame_corners, FramedView};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

pub trait Camera {
    /// Projection * view for an image of the given size
    fn matrix(&self, width: u32, height: u32) -> Matrix4<f32>;
    /// World position of the eye
    fn eye(&self) -> Point3<f32>;
}

/// View matrix of a camera placed at `position` with `orientation`, looking down its local -Z
pub fn view_matrix(position: &Point3<f32>, orientation: &UnitQuaternion<f32>) -> Matrix4<f32> {
    orientation.inverse().to_homogeneous() * Matrix4::new_translation(&-position.coords)
}

/// Per-press step sizes for the viewer
#[derive(Debug, Copy, Clone)]
pub struct MotionSpeeds {
    pub translation: f32,
    /// Radians
    pub rotation: f32,
}

/// The first-person camera the user drives
#[derive(Debug, Clone)]
pub struct Viewer {
    pub position: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub fov: f32,
    pub clipping: (f32, f32),
    home: (Point3<f32>, UnitQuaternion<f32>),
}

impl Viewer {
    pub fn new(position: Point3<f32>, orientation: UnitQuaternion<f32>, fov: f32, clipping: (f32, f32)) -> Self {
        Self {
            position,
            orientation,
            fov,
            clipping,
            home: (position, orientation),
        }
    }

    /// Place the viewer at `position`, looking at `target`. This is also the pose `reset` returns to.
    pub fn looking_at(position: Point3<f32>, target: Point3<f32>, fov: f32, clipping: (f32, f32)) -> Self {
        let orientation = look_rotation(&position, &target).unwrap_or_else(UnitQuaternion::identity);
        Self::new(position, orientation, fov, clipping)
    }

    pub fn view(&self) -> Matrix4<f32> {
        view_matrix(&self.position, &self.orientation)
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.orientation * -Vector3::z()
    }

    /// Move and turn along viewer-local axes according to one frame of input
    pub fn apply_input(&mut self, input: &InputState, speeds: &MotionSpeeds) {
        if input.reset {
            let (position, orientation) = self.home;
            self.position = position;
            self.orientation = orientation;
            return;
        }

        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        let local = Vector3::new(
            axis(input.move_right, input.move_left),
            axis(input.move_up, input.move_down),
            axis(input.move_backward, input.move_forward),
        );
        self.position += self.orientation * (local * speeds.translation);

        let yaw = axis(input.yaw_left, input.yaw_right) * speeds.rotation;
        let pitch = axis(input.pitch_up, input.pitch_down) * speeds.rotation;
        self.orientation *= UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
        self.orientation *= UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch);

        if input.turn_around {
            self.orientation *= UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::PI);
        }

        if input.look_at_origin {
            if let Some(orientation) = look_rotation(&self.position, &Point3::origin()) {
                self.orientation = orientation;
            }
        }
    }
}

impl Camera for Viewer {
    fn matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        let perspective = Matrix4::new_perspective(
            width as f32 / height as f32,
            self.fov,
            self.clipping.0,
            self.clipping.1,
        );
        perspective * self.view()
    }

    fn eye(&self) -> Point3<f32> {
        self.position
    }
}

/// Orientation looking from `eye` toward `target` with +Y up, if that is well defined
fn look_rotation(eye: &Point3<f32>, target: &Point3<f32>) -> Option<UnitQuaternion<f32>> {
    let dir = target - eye;
    if dir.norm() <= f32::EPSILON || dir.cross(&Vector3::y()).norm() <= f32::EPSILON {
        return None;
    }
    // face_towards points local +Z along its argument, and we look down -Z
    Some(UnitQuaternion::face_towards(&-dir, &Vector3::y()))
}

/// Offscreen camera owned by a portal surface. Its pose and projection are overwritten every
/// frame; the projection is never derived from a field of view.
#[derive(Debug, Clone)]
pub struct PortalCamera {
    pub position: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub projection: Matrix4<f32>,
    pub projection_inverse: Matrix4<f32>,
    pub near: f32,
    pub far: f32,
    /// Cone enclosing the framed portal, for culling
    pub estimated_fov: Option<f32>,
    /// Whether this camera renders this frame
    pub active: bool,
}

impl PortalCamera {
    pub fn new(near: f32, far: f32) -> Self {
        Self {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            projection: Matrix4::identity(),
            projection_inverse: Matrix4::identity(),
            near,
            far,
            estimated_fov: None,
            active: false,
        }
    }

    /// Aim at `[bottom_left, bottom_right, top_left]` from the current position and write the
    /// resulting orientation and off-axis projection onto this camera.
    pub fn frame_corners(&mut self, corners: [Point3<f32>; 3], estimate_fov: bool) -> FramedView {
        let framed = frame_corners(&self.position, corners, self.near, self.far, estimate_fov);
        self.orientation = framed.orientation;
        self.projection = framed.projection;
        self.projection_inverse = framed.projection_inverse;
        self.estimated_fov = framed.estimated_fov;
        framed
    }

    pub fn view(&self) -> Matrix4<f32> {
        view_matrix(&self.position, &self.orientation)
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.orientation * -Vector3::z()
    }
}

impl Camera for PortalCamera {
    /// The frustum already fixes the aspect ratio, so the image size is ignored
    fn matrix(&self, _width: u32, _height: u32) -> Matrix4<f32> {
        self.projection * self.view()
    }

    fn eye(&self) -> Point3<f32> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn speeds() -> MotionSpeeds {
        MotionSpeeds {
            translation: 0.5,
            rotation: 90f32.to_radians(),
        }
    }

    fn viewer() -> Viewer {
        Viewer::new(Point3::new(1., 2., 3.), UnitQuaternion::identity(), 0.5, (0.1, 100.))
    }

    #[test]
    fn moves_along_local_axes() {
        let mut v = viewer();
        v.orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        let input = InputState {
            move_forward: true,
            ..Default::default()
        };
        v.apply_input(&input, &speeds());
        // Turned left a quarter, so forward is -X
        assert_relative_eq!(v.position, Point3::new(0.5, 2., 3.), epsilon = 1e-5);
    }

    #[test]
    fn yaw_turns_left() {
        let mut v = viewer();
        let input = InputState {
            yaw_left: true,
            ..Default::default()
        };
        v.apply_input(&input, &speeds());
        assert_relative_eq!(v.forward(), -Vector3::x(), epsilon = 1e-5);
    }

    #[test]
    fn look_at_origin_and_reset() {
        let mut v = Viewer::looking_at(Point3::new(0., 0., 10.), Point3::new(0., 0., 20.), 0.5, (0.1, 100.));
        assert_relative_eq!(v.forward(), Vector3::z(), epsilon = 1e-5);

        let input = InputState {
            look_at_origin: true,
            ..Default::default()
        };
        v.apply_input(&input, &speeds());
        assert_relative_eq!(v.forward(), -Vector3::z(), epsilon = 1e-5);

        let input = InputState {
            move_up: true,
            turn_around: true,
            ..Default::default()
        };
        v.apply_input(&input, &speeds());
        assert_relative_eq!(v.position, Point3::new(0., 0.5, 10.), epsilon = 1e-5);
        assert_relative_eq!(v.forward(), Vector3::z(), epsilon = 1e-5);

        let input = InputState {
            reset: true,
            ..Default::default()
        };
        v.apply_input(&input, &speeds());
        assert_relative_eq!(v.position, Point3::new(0., 0., 10.), epsilon = 1e-5);
        assert_relative_eq!(v.forward(), Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn viewer_matrix_centers_forward_point() {
        let v = Viewer::looking_at(Point3::new(3., 1., 4.), Point3::origin(), 0.8, (0.1, 100.));
        let clip = v.matrix(600, 600) * Point3::origin().to_homogeneous();
        assert_relative_eq!(clip.x / clip.w, 0., epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0., epsilon = 1e-5);
    }

    #[test]
    fn portal_camera_takes_framed_view() {
        let mut cam = PortalCamera::new(0.1, 100.);
        cam.position = Point3::new(0., 0., 4.);
        let framed = cam.frame_corners(
            [
                Point3::new(-1., -1., 0.),
                Point3::new(1., -1., 0.),
                Point3::new(-1., 1., 0.),
            ],
            true,
        );
        assert_eq!(cam.projection, framed.projection);
        assert_eq!(cam.projection_inverse, framed.projection_inverse);
        assert!(cam.estimated_fov.is_some());
        assert_relative_eq!(cam.forward(), -Vector3::z(), epsilon = 1e-5);
    }
}
