use super::{step, App};
use crate::frame::FrameState;
use crate::render::Renderer;
use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Run a fixed number of frames without a window, then save the last screen image
pub fn run<A: App, R: Renderer>(mut app: A, mut state: FrameState<R>, frames: u64) -> Result<()> {
    // Handle interrupts gracefully
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })
    .context("Setting Ctrl-C handler")?;

    for frame in 0..frames {
        if !running.load(Ordering::Relaxed) {
            info!("Interrupted after {} frames", frame);
            break;
        }

        let input = app.scripted_input(frame);
        let stats = step(&mut app, &mut state, &input)?;
        debug!("{:?}", stats);
    }

    state.save_snapshot()
}
