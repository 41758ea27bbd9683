//! Per-frame orchestration: move the viewer, solve and frame every portal camera, render the
//! portal views, then the screen.
use crate::camera::{Camera, MotionSpeeds, Viewer};
use crate::config::Config;
use crate::handle::PortalKey;
use crate::input::InputState;
use crate::portal::solve_portal_camera_position;
use crate::portal_motion::PortalMotion;
use crate::render::{ClipPlane, CullCone, PassStats, RenderPass, RenderTarget, Renderer, Rgba};
use crate::scene::Scene;
use anyhow::{format_err, Context, Result};
use log::{debug, info, trace, warn};
use nalgebra::{Matrix4, Point3};
use slotmap::SecondaryMap;
use std::path::PathBuf;

/// What happened during one call to `FrameState::next_frame`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    /// Portal cameras that rendered this frame
    pub portal_passes: usize,
    /// Portal cameras skipped this frame
    pub portal_culled: usize,
    pub portal: PassStats,
    pub screen: PassStats,
    /// Portal the viewer walked through this frame
    pub teleported: Option<PortalKey>,
}

/// Everything that lives from frame to frame
pub struct FrameState<R> {
    scene: Scene,
    viewer: Viewer,
    motion: PortalMotion,
    renderer: R,
    targets: SecondaryMap<PortalKey, RenderTarget>,
    screen: RenderTarget,
    offscreen_size: u32,
    speeds: MotionSpeeds,
    snapshot_path: PathBuf,
    pub clear_color: Rgba,
    frame: u64,
}

impl<R: Renderer> FrameState<R> {
    pub fn new(scene: Scene, viewer: Viewer, renderer: R, config: &Config) -> Self {
        let mut state = Self {
            scene,
            motion: PortalMotion::new(viewer.position),
            viewer,
            renderer,
            targets: SecondaryMap::new(),
            screen: RenderTarget::new(config.screen_width, config.screen_height),
            offscreen_size: config.offscreen_size,
            speeds: config.speeds(),
            snapshot_path: config.snapshot.clone(),
            clear_color: [0, 0, 0, 255],
            frame: 0,
        };
        state.allocate_targets();
        state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn screen(&self) -> &RenderTarget {
        &self.screen
    }

    /// Render target of the camera owned by `portal`
    pub fn target(&self, portal: PortalKey) -> Option<&RenderTarget> {
        self.targets.get(portal)
    }

    /// One target per linked portal. Existing targets are kept.
    fn allocate_targets(&mut self) {
        for pair in self.scene.pairs() {
            for key in [pair.entry, pair.exit].iter() {
                if !self.targets.contains_key(*key) {
                    let size = self.offscreen_size;
                    self.targets.insert(*key, RenderTarget::new(size, size));
                    debug!("Allocated {}x{} target for portal {:?}", size, size, key);
                }
            }
        }
    }

    pub fn next_frame(&mut self, input: &InputState) -> Result<FrameStats> {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..Default::default()
        };
        self.allocate_targets();

        // Viewer
        self.viewer.apply_input(input, &self.speeds);
        if input.reset {
            self.motion.reset(self.viewer.position);
        } else {
            stats.teleported = self.motion.update(&mut self.viewer, &self.scene);
        }

        let (width, height) = (self.screen.width(), self.screen.height());
        let viewer_matrix = self.viewer.matrix(width, height);

        // Solve and frame every portal camera
        let directions: Vec<(PortalKey, PortalKey)> = self
            .scene
            .pairs()
            .iter()
            .flat_map(|pair| pair.directions().to_vec())
            .collect();

        for &(entry_key, exit_key) in &directions {
            self.update_portal_camera(entry_key, exit_key, &viewer_matrix)?;
        }

        // Portal passes, flat portals and no recursion
        for &(_, exit_key) in &directions {
            let exit = self
                .scene
                .portal(exit_key)
                .ok_or_else(|| format_err!("Portal {:?} does not exist", exit_key))?;
            let target = &mut self.targets[exit_key];
            let camera = &exit.camera;
            if !camera.active {
                target.invalidate();
                stats.portal_culled += 1;
                continue;
            }

            let pass = RenderPass {
                scene: &self.scene,
                view_projection: camera.matrix(target.width(), target.height()),
                eye: camera.eye(),
                clear_color: self.clear_color,
                portal_textures: None,
                hidden_portal: Some(exit_key),
                clip_plane: Some(ClipPlane::through(
                    &exit.transform().local_to_world(&Point3::origin()),
                    exit.normal(),
                )),
                cull_cone: camera.estimated_fov.map(|fov| CullCone {
                    apex: camera.position,
                    axis: camera.forward(),
                    fov,
                }),
            };
            let pass_stats = self
                .renderer
                .render(&pass, target)
                .with_context(|| format!("Rendering the view arriving at portal {:?}", exit_key))?;
            trace!("Portal {:?} pass: {:?}", exit_key, pass_stats);
            stats.portal_passes += 1;
            stats.portal.objects_drawn += pass_stats.objects_drawn;
            stats.portal.objects_culled += pass_stats.objects_culled;
            stats.portal.triangles += pass_stats.triangles;
        }

        // Screen pass
        let pass = RenderPass {
            scene: &self.scene,
            view_projection: viewer_matrix,
            eye: self.viewer.eye(),
            clear_color: self.clear_color,
            portal_textures: Some(&self.targets),
            hidden_portal: None,
            clip_plane: None,
            cull_cone: None,
        };
        stats.screen = self
            .renderer
            .render(&pass, &mut self.screen)
            .context("Rendering the screen")?;

        if input.snapshot {
            self.save_snapshot()?;
        }

        Ok(stats)
    }

    /// Place the camera owned by `exit_key` for the view through `entry_key` and frame it
    fn update_portal_camera(
        &mut self,
        entry_key: PortalKey,
        exit_key: PortalKey,
        viewer_matrix: &Matrix4<f32>,
    ) -> Result<()> {
        let eye = self.viewer.position;
        let entry = self
            .scene
            .portal(entry_key)
            .ok_or_else(|| format_err!("Portal {:?} does not exist", entry_key))?;
        let exit = self
            .scene
            .portal(exit_key)
            .ok_or_else(|| format_err!("Portal {:?} does not exist", exit_key))?;

        let position = solve_portal_camera_position(&eye, entry.transform(), exit.transform());
        let corners = exit.corners_through(entry);
        let facing = entry.signed_distance(&eye) > 0.;
        let on_screen = !outside_clip_volume(viewer_matrix, &entry.world_corners());

        let camera = &mut self
            .scene
            .portal_mut(exit_key)
            .ok_or_else(|| format_err!("Portal {:?} does not exist", exit_key))?
            .camera;
        camera.position = position;
        let framed = camera.frame_corners(corners, true);
        camera.active = facing && on_screen && framed.is_valid();

        if facing && on_screen && !framed.is_valid() {
            warn!(
                "Degenerate view through portal {:?} from {}, skipping",
                entry_key, eye
            );
        }
        Ok(())
    }

    /// Write the screen target to the configured snapshot path
    pub fn save_snapshot(&self) -> Result<()> {
        self.screen.save_png(&self.snapshot_path)?;
        info!("Saved snapshot to {}", self.snapshot_path.display());
        Ok(())
    }
}

/// True when every point lies outside the same plane of the clip volume
fn outside_clip_volume(view_projection: &Matrix4<f32>, points: &[Point3<f32>]) -> bool {
    // Signed distances to the left, right, bottom, top, near and far planes
    let distances: Vec<[f32; 6]> = points
        .iter()
        .map(|p| {
            let c = view_projection * p.to_homogeneous();
            [c.w + c.x, c.w - c.x, c.w + c.y, c.w - c.y, c.w + c.z, c.w - c.z]
        })
        .collect();
    (0..6).any(|plane| distances.iter().all(|d| d[plane] < 0.))
}
