use rand::{Rng, SeedableRng};
use rtos_vis_abstract::RandomSource;
use std::f64::consts::PI;

/// Standard deviation of the inter-arrival time, relative to its mean.
pub const JITTER_RATIO: f64 = 0.2;

/// `RandomSource` backed by a seeded `StdRng`.
pub struct SeededSource {
    rng: rand::rngs::StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Sample an inter-arrival time from N(mean, (0.2 * mean)^2) with Box–Muller.
///
/// The result may be negative (the interrupt is due immediately) or `+inf`
/// when the first draw is exactly zero (no interrupt for this sample).
pub fn gaussian_interval(mean: f64, source: &mut impl RandomSource) -> f64 {
    let u1 = source.next_uniform();
    let u2 = source.next_uniform();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + z * JITTER_RATIO * mean
}

/// Decides per step whether a new interrupt arrives.
#[derive(Debug, Clone, Default)]
pub struct InterruptGenerator {
    last_interrupt: Option<f64>,
}

impl InterruptGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the most recent interrupt, or zero before the first one.
    pub fn last_interrupt(&self) -> f64 {
        self.last_interrupt.unwrap_or(0.0)
    }

    /// Samples one interval and fires at most one interrupt at `now`.
    pub fn poll(&mut self, now: f64, mean_interval: f64, source: &mut impl RandomSource) -> bool {
        let interval = gaussian_interval(mean_interval, source);
        // NaN never compares true, so a degenerate sample simply does not fire.
        if now - self.last_interrupt() >= interval {
            self.last_interrupt = Some(now);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last_interrupt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtos_vis_abstract::SequenceSource;

    #[test]
    fn unit_first_draw_yields_the_mean() {
        let mut source = SequenceSource::new(vec![1.0, 0.3], 0.0);
        assert_eq!(gaussian_interval(2.0, &mut source), 2.0);
    }

    #[test]
    fn zero_first_draw_never_fires() {
        let mut source = SequenceSource::never();
        assert_eq!(gaussian_interval(3.0, &mut source), f64::INFINITY);

        let mut generator = InterruptGenerator::new();
        for step in 1..=1000 {
            assert!(!generator.poll(step as f64, 3.0, &mut source));
        }
    }

    #[test]
    fn negative_sample_fires_immediately() {
        // u1 small, u2 = 0.5 -> cos(pi) = -1, a large negative z.
        let mut source = SequenceSource::new(vec![1e-12, 0.5], 0.0);
        let interval = gaussian_interval(1.0, &mut source);
        assert!(interval < 0.0);

        let mut source = SequenceSource::new(vec![1e-12, 0.5], 0.0);
        let mut generator = InterruptGenerator::new();
        assert!(generator.poll(0.0, 1.0, &mut source));
        assert_eq!(generator.last_interrupt(), 0.0);
    }

    #[test]
    fn fires_once_elapsed_reaches_sample() {
        let mut source = SequenceSource::new(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0], 0.0);
        let mut generator = InterruptGenerator::new();
        assert!(!generator.poll(1.0, 2.0, &mut source));
        assert!(!generator.poll(1.5, 2.0, &mut source));
        assert!(generator.poll(2.0, 2.0, &mut source));
        assert_eq!(generator.last_interrupt(), 2.0);
        assert!(!generator.poll(2.5, 2.0, &mut source));
    }

    #[test]
    fn reset_forgets_last_interrupt() {
        let mut source = SequenceSource::new(vec![1.0, 0.0], 0.0);
        let mut generator = InterruptGenerator::new();
        assert!(generator.poll(5.0, 1.0, &mut source));
        generator.reset();
        assert_eq!(generator.last_interrupt(), 0.0);
    }

    #[test]
    fn seeded_sources_are_reproducible() {
        let mut a = SeededSource::new(42);
        let mut b = SeededSource::new(42);
        for _ in 0..16 {
            let draw = a.next_uniform();
            assert!((0.0..1.0).contains(&draw));
            assert_eq!(draw, b.next_uniform());
        }
    }
}
