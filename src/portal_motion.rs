use crate::camera::Viewer;
use crate::handle::PortalKey;
use crate::portal::{portal_rotation, solve_portal_camera_position};
use crate::scene::Scene;
use log::info;
use nalgebra::Point3;

/// Carries the viewer through a portal when its motion since the last frame passes through
/// the front of a linked portal's rectangle
pub struct PortalMotion {
    /// For calculating steps
    last_position: Point3<f32>,
}

impl PortalMotion {
    pub fn new(initial_position: Point3<f32>) -> Self {
        Self {
            last_position: initial_position,
        }
    }

    /// Forget the previous position, e.g. after a reset
    pub fn reset(&mut self, position: Point3<f32>) {
        self.last_position = position;
    }

    /// Teleport the viewer if it just stepped through a portal. Returns the portal entered.
    pub fn update(&mut self, viewer: &mut Viewer, scene: &Scene) -> Option<PortalKey> {
        let start = self.last_position;
        let end = viewer.position;

        let entered = scene.portals().find_map(|(key, portal)| {
            let exit = scene.portal(portal.partner()?)?;
            match portal.crossing(&start, &end)? {
                (_, true) => Some((key, portal, exit)),
                _ => None,
            }
        });

        if let Some((key, entry, exit)) = entered {
            viewer.position =
                solve_portal_camera_position(&end, entry.transform(), exit.transform());
            viewer.orientation = portal_rotation(entry.transform(), exit.transform()) * viewer.orientation;
            info!("Viewer went through portal {:?}, now at {}", key, viewer.position);
        }

        self.last_position = viewer.position;
        entered.map(|(key, _, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PortalCamera;
    use crate::portal::PortalSurface;
    use crate::transform::Transform;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector2, Vector3};

    fn linked_scene() -> (Scene, PortalKey, PortalKey) {
        let mut scene = Scene::new();
        let portal = |transform| {
            PortalSurface::new(transform, Vector2::new(1., 1.), [1.; 3], PortalCamera::new(0.1, 100.))
                .unwrap()
        };
        let a = scene.add_portal(portal(Transform::default()));
        let b = scene.add_portal(portal(Transform::from_parts(
            Vector3::new(-5., 0., 0.),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2),
        )));
        scene.link(a, b).unwrap();
        (scene, a, b)
    }

    fn viewer_at(position: Point3<f32>) -> Viewer {
        Viewer::new(position, UnitQuaternion::identity(), 1., (0.1, 100.))
    }

    #[test]
    fn walking_through_the_front_teleports() {
        let (scene, a, _) = linked_scene();
        let mut viewer = viewer_at(Point3::new(0., 0., 0.5));
        let mut motion = PortalMotion::new(viewer.position);
        viewer.position = Point3::new(0., 0., -0.5);

        assert_eq!(motion.update(&mut viewer, &scene), Some(a));
        // Half a unit out of the exit, which faces +X, now looking along +X
        assert_relative_eq!(viewer.position, Point3::new(-4.5, 0., 0.), epsilon = 1e-5);
        assert_relative_eq!(viewer.forward(), Vector3::x(), epsilon = 1e-5);
    }

    #[test]
    fn missing_or_backing_through_does_nothing() {
        let (scene, _, _) = linked_scene();
        let mut viewer = viewer_at(Point3::new(3., 0., 0.5));
        let mut motion = PortalMotion::new(viewer.position);
        viewer.position = Point3::new(3., 0., -0.5);
        assert_eq!(motion.update(&mut viewer, &scene), None);

        let mut viewer = viewer_at(Point3::new(0., 0., -0.5));
        let mut motion = PortalMotion::new(viewer.position);
        viewer.position = Point3::new(0., 0., 0.5);
        assert_eq!(motion.update(&mut viewer, &scene), None);
        assert_relative_eq!(viewer.position, Point3::new(0., 0., 0.5));
    }
}
