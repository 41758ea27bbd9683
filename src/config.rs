use crate::camera::MotionSpeeds;
use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;

/// Largest image, in pixels, any render target may have
pub const MAX_IMAGE_PIXELS: u64 = 1 << 26;

/// Run-time settings. Defaults follow the classroom demo; the command line can override them.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Side length of each square portal render target
    pub offscreen_size: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    /// World units per frame while a move key is held
    pub translation_speed: f32,
    /// Degrees per frame while a turn key is held
    pub rotation_speed: f32,
    /// Viewer vertical field of view, degrees
    pub fov: f32,
    pub clipping: (f32, f32),
    pub target_fps: u64,
    /// Run this many frames without a window, then exit
    pub headless_frames: Option<u64>,
    /// Where screen snapshots go
    pub snapshot: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offscreen_size: 256,
            screen_width: 600,
            screen_height: 600,
            translation_speed: 0.2,
            rotation_speed: 5.,
            fov: 30.,
            clipping: (0.1, 1000.),
            target_fps: 60,
            headless_frames: None,
            snapshot: PathBuf::from("portalview.png"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Size {
    width: u32,
    height: u32,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected <width>x<height>, got {}", s))?;
    let dim = |v: &str| v.parse::<u32>().map_err(|e| format!("{}: {}", v, e));
    Ok(Size {
        width: dim(w)?,
        height: dim(h)?,
    })
}

/// Command line overrides
#[derive(Parser, Debug)]
#[command(name = "portalview")]
#[command(about = "Real-time portal views drawn by a software rasterizer")]
struct Args {
    /// Run this many frames without a window, then save a snapshot and exit
    #[arg(long)]
    headless: Option<u64>,

    /// Where to save screen snapshots (PNG)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Side length of the portal render targets, in pixels
    #[arg(long)]
    offscreen: Option<u32>,

    /// Screen size as <width>x<height>
    #[arg(long, value_parser = parse_size)]
    size: Option<Size>,

    /// Target frame rate
    #[arg(long)]
    fps: Option<u64>,
}

impl Config {
    /// Parse overrides from the process arguments. Prints help or usage and exits on request
    /// or on malformed flags.
    pub fn from_env() -> Result<Self> {
        Self::with_args(Args::parse())
    }

    /// Parse overrides from `args`. The first item is the program name.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        Self::with_args(Args::try_parse_from(args)?)
    }

    fn with_args(args: Args) -> Result<Self> {
        let mut config = Self::default();
        config.headless_frames = args.headless;
        if let Some(snapshot) = args.snapshot {
            config.snapshot = snapshot;
        }
        if let Some(offscreen) = args.offscreen {
            config.offscreen_size = offscreen;
        }
        if let Some(size) = args.size {
            config.screen_width = size.width;
            config.screen_height = size.height;
        }
        if let Some(fps) = args.fps {
            config.target_fps = fps;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for &(name, width, height) in &[
            ("Screen", self.screen_width, self.screen_height),
            ("Portal target", self.offscreen_size, self.offscreen_size),
        ] {
            ensure!(width > 0 && height > 0, "{} size must be non-zero", name);
            let pixels = (width as u64).checked_mul(height as u64);
            ensure!(
                pixels.map_or(false, |p| p <= MAX_IMAGE_PIXELS),
                "{} size {}x{} exceeds {} pixels",
                name,
                width,
                height,
                MAX_IMAGE_PIXELS
            );
        }
        ensure!(self.target_fps > 0, "Target frame rate must be non-zero");
        let (near, far) = self.clipping;
        ensure!(
            near > 0. && far > near,
            "Invalid clip range {}..{}",
            near,
            far
        );
        Ok(())
    }

    pub fn speeds(&self) -> MotionSpeeds {
        MotionSpeeds {
            translation: self.translation_speed,
            rotation: self.rotation_speed.to_radians(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("portalview")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(Config::from_args(args(&[])).unwrap(), Config::default());
    }

    #[test]
    fn parses_overrides() {
        let config = Config::from_args(args(&[
            "--headless", "30", "--size", "320x200", "--offscreen", "128", "--snapshot", "out.png",
        ]))
        .unwrap();
        assert_eq!(config.headless_frames, Some(30));
        assert_eq!((config.screen_width, config.screen_height), (320, 200));
        assert_eq!(config.offscreen_size, 128);
        assert_eq!(config.snapshot, PathBuf::from("out.png"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Config::from_args(args(&["--fps"])).is_err());
        assert!(Config::from_args(args(&["--fps", "fast"])).is_err());
        assert!(Config::from_args(args(&["--fps", "0"])).is_err());
        assert!(Config::from_args(args(&["--size", "320"])).is_err());
        assert!(Config::from_args(args(&["--offscreen", "0"])).is_err());
        assert!(Config::from_args(args(&["--vr"])).is_err());
    }

    #[test]
    fn rejects_oversized_images() {
        // 70000 * 70000 overflows a u32
        assert!(Config::from_args(args(&["--size", "70000x70000"])).is_err());
        assert!(Config::from_args(args(&["--offscreen", "70000"])).is_err());
        assert!(Config::from_args(args(&["--size", "4294967295x4294967295"])).is_err());
        assert!(Config::from_args(args(&["--size", "8192x8192"])).is_ok());
    }
}
