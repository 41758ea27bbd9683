mod headless;
mod target_time;
mod windowed;
pub use target_time::TargetTime;

use crate::camera::Viewer;
use crate::config::Config;
use crate::frame::{FrameState, FrameStats};
use crate::input::InputState;
use crate::raster::SoftwareRenderer;
use crate::render::Renderer;
use crate::scene::Scene;
use anyhow::Result;
use log::info;

pub trait App: Sized {
    const NAME: &'static str;
    /// Populate the scene
    fn new(scene: &mut Scene, config: &Config) -> Result<Self>;
    /// Starting pose of the viewer, also where a reset returns to
    fn viewer(&self, config: &Config) -> Viewer;
    /// Animate the scene, once before every frame
    fn update(&mut self, scene: &mut Scene) -> Result<()>;
    /// Input used for frame number `frame` when running without a window
    fn scripted_input(&mut self, _frame: u64) -> InputState {
        InputState::default()
    }
}

/// Build the app's scene and run it, in a window unless `config.headless_frames` is set
pub fn launch<A: App + 'static>(config: Config) -> Result<()> {
    let mut scene = Scene::new();
    let app = A::new(&mut scene, &config)?;
    let viewer = app.viewer(&config);
    info!(
        "{}: {} portal pair(s), {}x{} screen, {}px portal targets",
        A::NAME,
        scene.pairs().len(),
        config.screen_width,
        config.screen_height,
        config.offscreen_size
    );

    let mut state = FrameState::new(scene, viewer, SoftwareRenderer::new(), &config);
    state.clear_color = [0x44, 0x44, 0x44, 255];

    match config.headless_frames {
        Some(frames) => headless::run(app, state, frames),
        None => windowed::run(app, state, &config),
    }
}

/// Let the app animate, then draw
fn step<A: App, R: Renderer>(
    app: &mut A,
    state: &mut FrameState<R>,
    input: &InputState,
) -> Result<FrameStats> {
    app.update(state.scene_mut())?;
    state.next_frame(input)
}
