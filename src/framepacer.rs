use std::thread;
use std::time::{Duration, Instant};

/// Self-adjusting frame delay.
///
/// The delay before the next frame is nudged towards whatever makes a whole
/// frame (render + send + sleep) last `1 / fps`, smoothed by `filter_gain`.
/// There is no deadline; if rendering is too slow the delay just drops to
/// zero and the frame rate goes down.
pub struct FramePacer {
    min_frame_time: f64,
    filter_gain: f64,
    current_delay: f64,
    filtered_frame_time: f64,
    last_tick: Instant,
    last_fps_print: Instant,
    frames: u32,
    falling_behind: bool,
}

impl FramePacer {
    pub fn new(fps: f32, filter_gain: f64) -> FramePacer {
        FramePacer {
            min_frame_time: 1.0 / fps as f64,
            filter_gain,
            current_delay: 0.0,
            filtered_frame_time: 0.0,
            last_tick: Instant::now(),
            last_fps_print: Instant::now(),
            frames: 0,
            falling_behind: false,
        }
    }

    pub fn current_delay(&self) -> Duration {
        Duration::from_secs_f64(self.current_delay)
    }

    pub fn filtered_frame_time(&self) -> f64 {
        self.filtered_frame_time
    }

    /// Feeds the duration of the last full frame and returns the next delay.
    pub fn update(&mut self, frame_time: f64) -> Duration {
        self.filtered_frame_time += (frame_time - self.filtered_frame_time) * self.filter_gain;
        self.current_delay += (self.min_frame_time - frame_time) * self.filter_gain;
        self.current_delay = self.current_delay.clamp(0.0, self.min_frame_time);
        self.current_delay()
    }

    pub fn sleep_until_next_frame(&mut self) {
        let now = Instant::now();
        let frame_time = (now - self.last_tick).as_secs_f64();
        self.last_tick = now;

        self.update_fps(now);
        let delay = self.update(frame_time);
        self.track_overrun(delay);

        thread::sleep(delay);
    }

    /// Warns once when the delay hits zero, stays quiet until frames fit
    /// again. Returns true if the warning was issued.
    fn track_overrun(&mut self, delay: Duration) -> bool {
        let frame_ms = self.filtered_frame_time() * 1000.0;

        if !delay.is_zero() {
            if self.falling_behind {
                log::info!("Frame rate recovered, frames take {frame_ms:.1} ms");
                self.falling_behind = false;
            }
            return false;
        }

        if self.falling_behind {
            log::debug!("Still behind, frames take {frame_ms:.1} ms");
            false
        } else {
            log::warn!(
                "Falling behind, frames take {frame_ms:.1} ms, budget {:.1} ms",
                self.min_frame_time * 1000.0
            );
            self.falling_behind = true;
            true
        }
    }

    fn update_fps(&mut self, now: Instant) {
        self.frames += 1;

        if now - self.last_fps_print > Duration::from_secs(1) {
            log::debug!("FPS: {}", self.frames);
            self.frames = 0;
            self.last_fps_print = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorutils::nearly_equal;

    #[test]
    fn delay_converges_to_remaining_frame_time() {
        let mut pacer = FramePacer::new(20.0, 0.05);
        let render_time = 0.01;

        for _ in 0..1000 {
            let frame_time = render_time + pacer.current_delay().as_secs_f64();
            pacer.update(frame_time);
        }

        assert!(nearly_equal(pacer.current_delay().as_secs_f64(), 0.04, 1e-3));
        assert!(nearly_equal(pacer.filtered_frame_time(), 0.05, 1e-3));
    }

    #[test]
    fn slow_frames_drop_delay_to_zero() {
        let mut pacer = FramePacer::new(30.0, 0.05);
        for _ in 0..100 {
            pacer.update(0.1);
        }
        assert!(pacer.current_delay().is_zero());
        assert!(nearly_equal(pacer.filtered_frame_time(), 0.1, 0.01));
    }

    #[test]
    fn delay_never_exceeds_frame_time() {
        let mut pacer = FramePacer::new(10.0, 0.5);
        for _ in 0..100 {
            pacer.update(0.0);
        }
        assert!(pacer.current_delay() <= Duration::from_secs_f64(0.1));
    }

    #[test]
    fn overrun_warns_once_until_recovered() {
        let mut pacer = FramePacer::new(30.0, 0.05);
        for _ in 0..100 {
            pacer.update(0.1);
        }

        let delay = pacer.current_delay();
        assert!(pacer.track_overrun(delay));
        assert!(!pacer.track_overrun(delay));
        assert!(!pacer.track_overrun(delay));

        assert!(!pacer.track_overrun(Duration::from_millis(5)));
        assert!(pacer.track_overrun(Duration::ZERO));
    }

    #[test]
    fn sleeps_roughly_one_frame() {
        let mut pacer = FramePacer::new(50.0, 1.0);
        let start = Instant::now();
        pacer.sleep_until_next_frame();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
