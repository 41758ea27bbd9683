use anyhow::Result;
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector2, Vector3};
use portalview::{
    mesh::{checkerboard, cuboid, rainbow_cube},
    runtime::{launch, App},
    Config, InputState, Object, ObjectKey, PortalCamera, PortalSurface, Scene, Transform, Viewer,
};

/// Two portals at right angles around a spinning cube
struct PortalDemo {
    cube: ObjectKey,
    time: f32,
}

const FLOOR_HEIGHT: f32 = -2.5;

impl App for PortalDemo {
    const NAME: &'static str = "Portal demo";

    fn new(scene: &mut Scene, config: &Config) -> Result<Self> {
        let floor = scene.add_mesh(checkerboard(10, 2., [[0.8, 0.8, 0.8], [0.25, 0.25, 0.3]]));
        scene.add_object(Object {
            mesh: floor,
            transform: Matrix4::new_translation(&Vector3::new(0., FLOOR_HEIGHT, 0.)),
        })?;

        let pillar = scene.add_mesh(cuboid(
            [6., FLOOR_HEIGHT, -7.],
            [7., 3., -6.],
            [0.8, 0.1, 0.1],
        ));
        scene.add_object(Object {
            mesh: pillar,
            transform: Matrix4::identity(),
        })?;

        let cube = scene.add_mesh(rainbow_cube());
        let cube = scene.add_object(Object {
            mesh: cube,
            transform: Matrix4::new_scaling(0.5),
        })?;

        let (near, far) = config.clipping;
        let half_extents = Vector2::new(2.5, 2.5);
        let first = scene.add_portal(PortalSurface::new(
            Transform::from_translation(Vector3::new(0., 0., -5.)),
            half_extents,
            [1., 1., 0.],
            PortalCamera::new(near, far),
        )?);
        let second = scene.add_portal(PortalSurface::new(
            Transform::from_parts(
                Vector3::new(-5., 0., 0.),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 90f32.to_radians()),
            ),
            half_extents,
            [0., 0.4, 1.],
            PortalCamera::new(near, far),
        )?);
        scene.link(first, second)?;

        Ok(Self { cube, time: 0. })
    }

    fn viewer(&self, config: &Config) -> Viewer {
        Viewer::looking_at(
            Point3::new(15., 2., 15.),
            Point3::origin(),
            config.fov.to_radians(),
            config.clipping,
        )
    }

    fn update(&mut self, scene: &mut Scene) -> Result<()> {
        self.time += 1.;
        if let Some(cube) = scene.object_mut(self.cube) {
            let spin = Matrix4::from_euler_angles(
                (0.6 * self.time).to_radians(),
                (0.7 * self.time).to_radians(),
                0.,
            );
            cube.transform = spin * Matrix4::new_scaling(0.5);
        }
        Ok(())
    }

    /// Turn slowly to the left so the portals sweep across the screen
    fn scripted_input(&mut self, frame: u64) -> InputState {
        InputState {
            yaw_left: frame % 4 == 0,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::from_env()?;
    launch::<PortalDemo>(config)
}
