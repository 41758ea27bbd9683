use anyhow::{ensure, Result};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// Local-to-world placement of a node: scale, then rotate, then translate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn new(
        translation: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Rigid placement with unit scale
    pub fn from_parts(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self::new(translation, rotation, Vector3::repeat(1.))
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self::from_parts(translation, UnitQuaternion::identity())
    }

    /// Checks that this transform can be inverted, i.e. `world_to_local` is well defined.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.translation.iter().all(|v| v.is_finite()),
            "Transform translation is not finite: {:?}",
            self.translation
        );
        ensure!(
            self.rotation.coords.iter().all(|v| v.is_finite()),
            "Transform rotation is not finite"
        );
        ensure!(
            self.scale.iter().all(|v| v.is_finite() && v.abs() > f32::EPSILON),
            "Transform scale must be finite and non-zero, got {:?}",
            self.scale
        );
        Ok(())
    }

    /// Local-to-world matrix
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// World-to-local matrix. Non-finite when the scale has a zero component.
    pub fn inverse_matrix(&self) -> Matrix4<f32> {
        let inv_scale = self.scale.map(|s| 1. / s);
        Matrix4::new_nonuniform_scaling(&inv_scale)
            * self.rotation.inverse().to_homogeneous()
            * Matrix4::new_translation(&-self.translation)
    }

    pub fn local_to_world(&self, local: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.rotation * local.coords.component_mul(&self.scale) + self.translation)
    }

    pub fn world_to_local(&self, world: &Point3<f32>) -> Point3<f32> {
        let unrotated = self.rotation.inverse() * (world.coords - self.translation);
        Point3::from(unrotated.component_div(&self.scale))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vector3::zeros())
    }
}
