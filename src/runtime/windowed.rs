use super::{step, App, TargetTime};
use crate::config::Config;
use crate::frame::FrameState;
use crate::input::KeyboardState;
use crate::render::{RenderTarget, Renderer};
use anyhow::{Context, Result};
use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    dpi::PhysicalSize,
    event::{Event, StartCause, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

/// Drive the frame loop from a winit window, showing the screen target every frame. Frame
/// stats go to the title bar, and `p` writes the screen image to the snapshot path.
pub fn run<A: App + 'static, R: Renderer + 'static>(
    mut app: A,
    mut state: FrameState<R>,
    config: &Config,
) -> Result<()> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(A::NAME)
        .with_inner_size(PhysicalSize::new(config.screen_width, config.screen_height))
        .with_resizable(false)
        .build(&event_loop)?;

    let mut pixels = {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, &window);
        Pixels::new(config.screen_width, config.screen_height, surface)
            .context("Creating the window framebuffer")?
    };

    let mut keyboard = KeyboardState::new();
    let mut target_time = TargetTime::new(config.target_fps);

    event_loop.run(move |event, _, control_flow| match event {
        Event::NewEvents(StartCause::Init) => {
            *control_flow = ControlFlow::Poll;
        }
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                info!("Window closed");
                *control_flow = ControlFlow::Exit;
            }
            WindowEvent::Focused(false) => keyboard.release_all(),
            WindowEvent::KeyboardInput { input, .. } => keyboard.handle_input(&input),
            WindowEvent::ModifiersChanged(modifiers) => keyboard.handle_modifiers(modifiers),
            _ => (),
        },
        Event::MainEventsCleared => {
            target_time.start_frame();
            let input = keyboard.snapshot();
            let frame = step(&mut app, &mut state, &input)
                .and_then(|stats| present(&mut pixels, state.screen()).map(|_| stats));
            match frame {
                Ok(stats) => {
                    let position = state.viewer().position;
                    window.set_title(&format!(
                        "{} | frame {} | {} portal pass(es) | {:.1} ms | at ({:.1}, {:.1}, {:.1})",
                        A::NAME,
                        stats.frame,
                        stats.portal_passes,
                        target_time.last_frame_duration().as_secs_f32() * 1000.,
                        position.x,
                        position.y,
                        position.z,
                    ));
                }
                Err(e) => {
                    error!("Frame failed: {:?}", e);
                    *control_flow = ControlFlow::Exit;
                }
            }
            target_time.end_frame();
        }
        _ => (),
    })
}

/// Copy the software image into the window's framebuffer and put it on screen
fn present(pixels: &mut Pixels, screen: &RenderTarget) -> Result<()> {
    screen.copy_to(pixels.get_frame())?;
    pixels.render().context("Presenting the frame")?;
    Ok(())
}
