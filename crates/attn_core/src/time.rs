const FPS_SAMPLE_COUNT: usize = 60;

pub struct TimeState {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub total_time: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_timestamp_ms: Option<f64>,
    pub interpolation_alpha: f64,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
}

impl TimeState {
    pub fn new() -> Self {
        Self::with_fixed_dt(1.0 / 60.0)
    }

    pub fn with_fixed_dt(fixed_dt: f64) -> Self {
        assert!(
            fixed_dt.is_finite() && fixed_dt > 0.0,
            "fixed_dt must be a positive number of seconds, got {fixed_dt}"
        );
        Self {
            fixed_dt,
            max_accumulator: 0.25,
            accumulator: 0.0,
            total_time: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_timestamp_ms: None,
            interpolation_alpha: 0.0,
            fps_samples: [fixed_dt; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 1.0 / fixed_dt,
        }
    }

    /// Feed the frame timestamp in milliseconds. The first frame produces no
    /// simulated time; a timestamp that goes backwards is treated as zero delta.
    pub fn begin_frame(&mut self, timestamp_ms: f64) {
        self.real_dt = match self.last_timestamp_ms {
            Some(last) if timestamp_ms > last => (timestamp_ms - last) / 1000.0,
            Some(last) => {
                if timestamp_ms < last {
                    log::warn!(
                        "Non-monotonic frame timestamp {:.3}ms after {:.3}ms, ignoring delta",
                        timestamp_ms,
                        last
                    );
                }
                0.0
            }
            None => 0.0,
        };
        if self.last_timestamp_ms.map_or(true, |last| timestamp_ms > last) {
            self.last_timestamp_ms = Some(timestamp_ms);
        }

        // Spiral-of-death cap
        if self.real_dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                self.real_dt * 1000.0,
                self.max_accumulator * 1000.0
            );
            self.real_dt = self.max_accumulator;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        if self.real_dt > 0.0 {
            self.fps_samples[self.fps_sample_index] = self.real_dt;
            self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
            let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
            self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
        }
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.total_time += self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    pub fn end_frame(&mut self) {
        self.interpolation_alpha = self.accumulator / self.fixed_dt;
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}
