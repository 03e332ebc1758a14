use web_time::Instant;

/// Measures the wall-clock interval between frames.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_tick: Option<Instant>,
    interval: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a frame and returns the seconds since the previous mark.
    ///
    /// The first tick has nothing to measure against and returns 0.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        self.interval = match self.last_tick {
            Some(last) => now.duration_since(last).as_secs_f64(),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.interval
    }

    /// The interval measured by the last [`FrameClock::tick`], in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }
}
