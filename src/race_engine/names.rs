//! Random participant names for races started without a name list.

use crate::race_engine::rng::{shuffle, RandomSource};

const PREFIXES: [&str; 7] = [
    "Unleashed",
    "Ferocious",
    "Swift",
    "Broken",
    "Limping",
    "Dashing",
    "Scruffy",
];

const SUFFIXES: [&str; 11] = [
    "Hojin", "Seungyeop", "Minjae", "Junho", "Seokhee", "Jeonghwan", "Changwan", "Hongseo",
    "Yeonho", "Seonho", "Sein",
];

/// Generate `count` distinct names in random order.
///
/// Names are "<prefix> <suffix>" pairs. Once every pair is used, further
/// rounds repeat the pairs with a round number appended.
pub fn generate_names(count: usize, rng: &mut dyn RandomSource) -> Vec<String> {
    let mut pairs: Vec<String> = PREFIXES
        .iter()
        .flat_map(|prefix| SUFFIXES.iter().map(move |suffix| format!("{} {}", prefix, suffix)))
        .collect();
    shuffle(rng, &mut pairs);

    let mut names: Vec<String> = (0..count)
        .map(|i| {
            let pair = &pairs[i % pairs.len()];
            match i / pairs.len() {
                0 => pair.clone(),
                round => format!("{} {}", pair, round + 1),
            }
        })
        .collect();
    shuffle(rng, &mut names);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::rng::{RngSource, ScriptedRandom};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn names_are_distinct_and_non_empty() {
        let mut rng = RngSource(ChaCha8Rng::seed_from_u64(1));
        let names = generate_names(20, &mut rng);
        assert_eq!(names.len(), 20);
        assert!(names.iter().all(|n| !n.trim().is_empty()));
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), 20);
    }

    #[test]
    fn more_names_than_pairs_still_terminates() {
        let mut rng = ScriptedRandom::new([]);
        let count = PREFIXES.len() * SUFFIXES.len() * 2 + 5;
        let names = generate_names(count, &mut rng);
        assert_eq!(names.len(), count);
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), count);
    }

    #[test]
    fn zero_names() {
        let mut rng = ScriptedRandom::new([]);
        assert!(generate_names(0, &mut rng).is_empty());
    }
}
