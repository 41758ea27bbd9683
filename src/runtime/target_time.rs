use std::thread::sleep;
use std::time::{Duration, Instant};

/// Paces the frame loop to a target rate and keeps track of how long frames actually took.
pub struct TargetTime {
    target_frame_time: Duration,
    last_frame_start_time: Instant,
    last_frame_duration: Duration,
}

impl TargetTime {
    /// Create a new target time from frames/sec
    pub fn new(target_fps: u64) -> Self {
        Self {
            target_frame_time: Duration::from_micros(1_000_000 / target_fps.max(1)),
            last_frame_start_time: Instant::now(),
            last_frame_duration: Duration::default(),
        }
    }

    /// Start a new frame
    pub fn start_frame(&mut self) {
        self.last_frame_start_time = Instant::now();
    }

    /// End a frame, and wait any slack time we have. Returns the time spent working.
    pub fn end_frame(&mut self) -> Duration {
        let frame_duration = self.last_frame_start_time.elapsed();
        self.last_frame_duration = frame_duration;
        if frame_duration < self.target_frame_time {
            sleep(self.target_frame_time - frame_duration);
        }
        frame_duration
    }

    /// Work time of the last finished frame
    pub fn last_frame_duration(&self) -> Duration {
        self.last_frame_duration
    }
}

impl Default for TargetTime {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_out_the_slack() {
        let mut time = TargetTime::new(50);
        time.start_frame();
        let start = Instant::now();
        let worked = time.end_frame();
        assert!(worked < Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert_eq!(time.last_frame_duration(), worked);
    }
}
