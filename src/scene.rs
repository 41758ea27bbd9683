use crate::handle::{MeshKey, ObjectKey, PortalKey};
use crate::mesh::Mesh;
use crate::portal::{PortalPair, PortalSurface};
use crate::transform::Transform;
use anyhow::{bail, ensure, format_err, Result};
use log::debug;
use nalgebra::{Matrix4, Point3};
use slotmap::SlotMap;

/// A single object in the scene
#[derive(Debug, Copy, Clone)]
pub struct Object {
    /// Vertex and index data for the object
    pub mesh: MeshKey,
    /// Transformation applied to each vertex of this object
    pub transform: Matrix4<f32>,
}

/// Everything that gets drawn: meshes, objects placed with them, and linked portals.
/// Portals cannot be moved once added.
#[derive(Default)]
pub struct Scene {
    meshes: SlotMap<MeshKey, Mesh>,
    objects: SlotMap<ObjectKey, Object>,
    portals: SlotMap<PortalKey, PortalSurface>,
    pairs: Vec<PortalPair>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshKey {
        self.meshes.insert(mesh)
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    pub fn add_object(&mut self, object: Object) -> Result<ObjectKey> {
        ensure!(
            self.meshes.contains_key(object.mesh),
            "Object references a mesh that does not exist"
        );
        Ok(self.objects.insert(object))
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut Object> {
        self.objects.get_mut(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &Object)> + '_ {
        self.objects.iter()
    }

    pub fn add_portal(&mut self, portal: PortalSurface) -> PortalKey {
        self.portals.insert(portal)
    }

    /// Link two unlinked portals. Both directions render from then on.
    pub fn link(&mut self, entry: PortalKey, exit: PortalKey) -> Result<PortalPair> {
        ensure!(entry != exit, "A portal cannot be linked to itself");
        for key in &[entry, exit] {
            match self.portals.get(*key) {
                None => bail!("Portal {:?} does not exist", key),
                Some(portal) if portal.partner.is_some() => {
                    bail!("Portal {:?} is already linked", key)
                }
                Some(_) => (),
            }
        }
        self.portals[entry].partner = Some(exit);
        self.portals[exit].partner = Some(entry);
        let pair = PortalPair { entry, exit };
        self.pairs.push(pair);
        debug!("Linked portals {:?} <-> {:?}", entry, exit);
        Ok(pair)
    }

    pub fn portal(&self, key: PortalKey) -> Option<&PortalSurface> {
        self.portals.get(key)
    }

    pub(crate) fn portal_mut(&mut self, key: PortalKey) -> Option<&mut PortalSurface> {
        self.portals.get_mut(key)
    }

    pub fn portals(&self) -> impl Iterator<Item = (PortalKey, &PortalSurface)> + '_ {
        self.portals.iter()
    }

    pub fn pairs(&self) -> &[PortalPair] {
        &self.pairs
    }

    pub fn world_transform_of(&self, key: PortalKey) -> Result<&Transform> {
        self.portals
            .get(key)
            .map(PortalSurface::transform)
            .ok_or_else(|| format_err!("Portal {:?} does not exist", key))
    }

    pub fn local_to_world(&self, key: PortalKey, local: &Point3<f32>) -> Result<Point3<f32>> {
        Ok(self.world_transform_of(key)?.local_to_world(local))
    }

    pub fn world_to_local(&self, key: PortalKey, world: &Point3<f32>) -> Result<Point3<f32>> {
        Ok(self.world_transform_of(key)?.world_to_local(world))
    }
}
