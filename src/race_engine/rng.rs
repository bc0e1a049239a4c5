//! Random sources
//!
//! The simulation draws every random number through [`RandomSource`], so a
//! race can run on live randomness while tests replay exact sequences.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// A source of uniform floats in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f32;
}

/// Adapter exposing any `rand` generator as a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R: RngCore>(pub R);

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f32 {
        self.0.gen::<f32>()
    }
}

impl RngSource<StdRng> {
    /// Live randomness seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

/// Replays a fixed list of values, then keeps returning `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: VecDeque<f32>,
    fallback: f32,
}

impl ScriptedRandom {
    /// The default fallback of 0.5 rolls no skill, no burst and no slowdown,
    /// and adds no speed variation.
    pub fn new(values: impl IntoIterator<Item = f32>) -> Self {
        Self::with_fallback(values, 0.5)
    }

    pub fn with_fallback(values: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            values: values.into_iter().collect(),
            fallback,
        }
    }

    /// Queue more values behind the ones not yet consumed.
    pub fn push(&mut self, values: impl IntoIterator<Item = f32>) {
        self.values.extend(values);
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f32 {
        self.values.pop_front().unwrap_or(self.fallback)
    }
}

/// Uniform draw in `[min, max)`.
pub fn uniform(rng: &mut dyn RandomSource, min: f32, max: f32) -> f32 {
    min + rng.next_unit() * (max - min)
}

/// Uniform index in `0..len`. `len` must be non-zero.
pub fn pick_index(rng: &mut dyn RandomSource, len: usize) -> usize {
    ((rng.next_unit() * len as f32) as usize).min(len.saturating_sub(1))
}

/// Uniform integer in `min..=max`.
pub fn uniform_count(rng: &mut dyn RandomSource, min: usize, max: usize) -> usize {
    min + pick_index(rng, max - min + 1)
}

/// Fisher-Yates shuffle driven by the given source.
pub fn shuffle<T>(rng: &mut dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = pick_index(rng, i + 1);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn scripted_values_then_fallback() {
        let mut rng = ScriptedRandom::with_fallback([0.1, 0.2], 0.9);
        assert_eq!(rng.next_unit(), 0.1);
        assert_eq!(rng.next_unit(), 0.2);
        assert_eq!(rng.next_unit(), 0.9);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn pick_index_stays_in_bounds() {
        let mut rng = ScriptedRandom::new([0.0, 0.999_999, 0.5]);
        assert_eq!(pick_index(&mut rng, 4), 0);
        assert_eq!(pick_index(&mut rng, 4), 3);
        assert_eq!(pick_index(&mut rng, 4), 2);
    }

    #[test]
    fn uniform_count_covers_inclusive_range() {
        let mut rng = ScriptedRandom::new([0.0, 0.99]);
        assert_eq!(uniform_count(&mut rng, 1, 3), 1);
        assert_eq!(uniform_count(&mut rng, 1, 3), 3);
    }

    #[test]
    fn shuffle_keeps_every_item() {
        let mut rng = RngSource(ChaCha8Rng::seed_from_u64(7));
        let mut items: Vec<u32> = (0..10).collect();
        shuffle(&mut rng, &mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_source_is_unit_interval() {
        let mut rng = RngSource(ChaCha8Rng::seed_from_u64(42));
        for _ in 0..1000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
