/// Source of uniform draws used by the interrupt generator.
/// The simulator owns one and calls it twice per step, so scripted sources
/// make whole runs reproducible.
pub trait RandomSource {
    /// Next draw from the unit interval. Values of exactly 0 or 1 are allowed.
    fn next_uniform(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// Replays a fixed list of draws, then keeps returning `fallback`.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    draws: Vec<f64>,
    cursor: usize,
    fallback: f64,
}

impl SequenceSource {
    pub fn new(draws: Vec<f64>, fallback: f64) -> Self {
        Self {
            draws,
            cursor: 0,
            fallback,
        }
    }

    /// A source for which every sampled interval is infinite (u1 = 0).
    pub fn never() -> Self {
        Self::new(Vec::new(), 0.0)
    }

    /// Number of scripted draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor.min(self.draws.len())
    }
}

impl RandomSource for SequenceSource {
    fn next_uniform(&mut self) -> f64 {
        match self.draws.get(self.cursor) {
            Some(&value) => {
                self.cursor += 1;
                value
            }
            None => self.fallback,
        }
    }
}
