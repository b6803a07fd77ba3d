use std::time::Duration;

/// Turns wall-clock frame times into a number of fixed simulation slices.
///
/// Each frame is capped at `max_frame_time` so a long stall (a suspended
/// terminal, a debugger break) does not replay minutes of simulation at once.
/// Time that does not fill a whole slice is carried into the next frame.
#[derive(Debug, Clone)]
pub struct FramePacer {
    time_slice: f64,
    max_frame_time: f64,
    carry: f64,
}

impl FramePacer {
    pub fn new(time_slice: f64, max_frame_time: f64) -> Self {
        Self {
            time_slice,
            max_frame_time,
            carry: 0.0,
        }
    }

    pub fn time_slice(&self) -> f64 {
        self.time_slice
    }

    /// Number of slices to run for a frame that took `elapsed`.
    pub fn slices(&mut self, elapsed: Duration) -> u32 {
        let frame = elapsed.as_secs_f64().min(self.max_frame_time);
        let available = self.carry + frame;
        let count = (available / self.time_slice).floor();
        self.carry = (available - count * self.time_slice).max(0.0);
        count as u32
    }

    /// Drop carried time, e.g. when resuming from pause.
    pub fn reset(&mut self) {
        self.carry = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_long_frames() {
        let mut pacer = FramePacer::new(0.125, 0.25);
        assert_eq!(pacer.slices(Duration::from_secs(10)), 2);
    }

    #[test]
    fn carries_partial_slices() {
        let mut pacer = FramePacer::new(0.125, 0.25);
        assert_eq!(pacer.slices(Duration::from_micros(62_500)), 0);
        assert_eq!(pacer.slices(Duration::from_micros(93_750)), 1);
        // 0.03125 carried + 0.09375 is exactly one more slice
        assert_eq!(pacer.slices(Duration::from_micros(93_750)), 1);
    }

    #[test]
    fn reset_drops_carry() {
        let mut pacer = FramePacer::new(0.125, 0.25);
        pacer.slices(Duration::from_micros(93_750));
        pacer.reset();
        assert_eq!(pacer.slices(Duration::from_micros(93_750)), 0);
    }
}
