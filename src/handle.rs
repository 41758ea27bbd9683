//! Typed handles into the scene's storage
use slotmap::new_key_type;

new_key_type! {
    /// Handle for a mesh (draw content)
    pub struct MeshKey;
    /// Handle for an object placed in the scene
    pub struct ObjectKey;
    /// Handle for a portal surface, and for the render target of its camera
    pub struct PortalKey;
}
