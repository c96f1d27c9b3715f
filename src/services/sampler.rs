use rand::Rng;

use crate::models::GenreScore;

/// Inverse-CDF sampler over a genre-weight distribution
#[derive(Debug, Clone, PartialEq)]
pub struct GenreSampler {
    entries: Vec<(String, f64)>,
}

impl GenreSampler {
    /// Builds a sampler from fingerprint scores, renormalizing them to sum
    /// to 1. Non-positive totals fall back to equal weights. Returns `None`
    /// for an empty distribution.
    pub fn new(genres: &[GenreScore]) -> Option<Self> {
        if genres.is_empty() {
            return None;
        }

        let total: f64 = genres
            .iter()
            .map(|genre| sanitize(genre.score))
            .sum();

        let entries = if total > 0.0 {
            genres
                .iter()
                .map(|genre| (genre.name.clone(), sanitize(genre.score) / total))
                .collect()
        } else {
            let even = 1.0 / genres.len() as f64;
            genres.iter().map(|genre| (genre.name.clone(), even)).collect()
        };

        Some(Self { entries })
    }

    /// Draws one genre
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let target: f64 = rng.gen();
        let mut cumulative = 0.0;

        for (name, weight) in &self.entries {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            if target <= cumulative {
                return name;
            }
        }

        // Rounding can leave the running sum just under the draw.
        self.entries
            .iter()
            .rev()
            .find(|(_, weight)| *weight > 0.0)
            .unwrap_or(&self.entries[self.entries.len() - 1])
            .0
            .as_str()
    }

    /// Draws `count` genres independently, with replacement
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        (0..count).map(|_| self.pick(rng).to_string()).collect()
    }

    pub fn weights(&self) -> &[(String, f64)] {
        &self.entries
    }
}

/// Negative and NaN scores carry no weight
fn sanitize(score: f64) -> f64 {
    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;

    #[test]
    fn test_empty_distribution_has_no_sampler() {
        assert!(GenreSampler::new(&[]).is_none());
    }

    #[test]
    fn test_weights_are_renormalized() {
        let sampler = GenreSampler::new(&[GenreScore::new("rock", 3.0), GenreScore::new("jazz", 1.0)])
            .unwrap();

        assert_eq!(
            sampler.weights(),
            &[("rock".to_string(), 0.75), ("jazz".to_string(), 0.25)]
        );
    }

    #[test]
    fn test_degenerate_scores_split_evenly() {
        let sampler = GenreSampler::new(&[
            GenreScore::new("rock", 0.0),
            GenreScore::new("jazz", f64::NAN),
            GenreScore::new("soul", -1.0),
            GenreScore::new("funk", 0.0),
        ])
        .unwrap();

        assert!(sampler.weights().iter().all(|(_, w)| (*w - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_sample_returns_requested_count() {
        let sampler = GenreSampler::new(&[GenreScore::new("rock", 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(sampler.sample(10, &mut rng), vec!["rock".to_string(); 10]);
        assert!(sampler.sample(0, &mut rng).is_empty());
    }

    #[test]
    fn test_last_genre_reachable_when_sum_falls_short() {
        // Cumulative weight tops out below the largest possible draw.
        let sampler = GenreSampler {
            entries: vec![
                ("a".to_string(), 0.1),
                ("b".to_string(), 0.2),
                ("c".to_string(), 0.3),
            ],
        };

        struct MaxRng;
        impl rand::RngCore for MaxRng {
            fn next_u32(&mut self) -> u32 {
                u32::MAX
            }
            fn next_u64(&mut self) -> u64 {
                u64::MAX
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0xff);
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                dest.fill(0xff);
                Ok(())
            }
        }

        assert_eq!(sampler.pick(&mut MaxRng), "c");
    }

    #[test]
    fn test_sampling_converges_to_distribution() {
        let genres = vec![
            GenreScore::new("rock", 0.5),
            GenreScore::new("jazz", 0.3),
            GenreScore::new("ambient", 0.15),
            GenreScore::new("folk", 0.05),
        ];
        let sampler = GenreSampler::new(&genres).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let draws = 100_000;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for genre in sampler.sample(draws, &mut rng) {
            *counts.entry(genre).or_insert(0) += 1;
        }

        for genre in &genres {
            let observed = counts.get(&genre.name).copied().unwrap_or(0) as f64 / draws as f64;
            assert!(
                (observed - genre.score).abs() < 0.01,
                "{}: expected {}, observed {}",
                genre.name,
                genre.score,
                observed
            );
        }
    }

    #[test]
    fn test_zero_weight_genre_never_picked() {
        struct ZeroRng;
        impl rand::RngCore for ZeroRng {
            fn next_u32(&mut self) -> u32 {
                0
            }
            fn next_u64(&mut self) -> u64 {
                0
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0);
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                dest.fill(0);
                Ok(())
            }
        }

        let sampler = GenreSampler::new(&[
            GenreScore::new("never", 0.0),
            GenreScore::new("rock", 1.0),
        ])
        .unwrap();

        assert_eq!(sampler.pick(&mut ZeroRng), "rock");
    }
}
