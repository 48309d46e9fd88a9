//! Candidate selection
//!
//! Picks reviewers out of a candidate pool that the caller has already
//! filtered. The random pickers take their generator as an argument, so they
//! are deterministic under a seeded `StdRng`.

use rand::seq::index;
use rand::Rng;

use crate::domain::User;

/// Pick at most `limit` distinct candidate ids
///
/// When the pool fits within `limit` every candidate is returned in pool
/// order. Otherwise a uniformly random subset of size `limit` is drawn
/// without replacement.
pub fn pick_up_to<R: Rng + ?Sized>(candidates: &[&User], limit: usize, rng: &mut R) -> Vec<String> {
    if limit == 0 || candidates.is_empty() {
        return Vec::new();
    }
    if candidates.len() <= limit {
        return candidates.iter().map(|u| u.id.clone()).collect();
    }

    index::sample(rng, candidates.len(), limit)
        .into_iter()
        .map(|i| candidates[i].id.clone())
        .collect()
}

/// Pick one candidate id uniformly at random, `None` for an empty pool
pub fn pick_one<R: Rng + ?Sized>(candidates: &[&User], rng: &mut R) -> Option<String> {
    match candidates {
        [] => None,
        [only] => Some(only.id.clone()),
        _ => {
            let i = rng.gen_range(0..candidates.len());
            Some(candidates[i].id.clone())
        }
    }
}

/// First id in `pool` that is neither the author nor already taken
///
/// Used by bulk repair, where the choice has to be reproducible.
pub fn first_fit<'a>(pool: &'a [String], author_id: &str, taken: &[String]) -> Option<&'a str> {
    pool.iter()
        .map(String::as_str)
        .find(|id| *id != author_id && !taken.iter().any(|t| t == id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn users(n: usize) -> Vec<User> {
        (0..n)
            .map(|i| User::new(format!("u{}", i), format!("user{}", i), "team"))
            .collect()
    }

    #[test]
    fn test_pick_up_to_returns_everyone_when_pool_is_small() {
        let pool = users(2);
        let refs: Vec<&User> = pool.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(pick_up_to(&refs, 2, &mut rng), vec!["u0", "u1"]);
        assert_eq!(pick_up_to(&refs, 5, &mut rng), vec!["u0", "u1"]);
    }

    #[test]
    fn test_pick_up_to_draws_distinct_subset() {
        let pool = users(6);
        let refs: Vec<&User> = pool.iter().collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let picked = pick_up_to(&refs, 2, &mut rng);
            assert_eq!(picked.len(), 2);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 2);
            assert!(picked.iter().all(|id| pool.iter().any(|u| &u.id == id)));
        }
    }

    #[test]
    fn test_pick_up_to_empty_and_zero_limit() {
        let pool = users(3);
        let refs: Vec<&User> = pool.iter().collect();
        let mut rng = StdRng::seed_from_u64(3);

        assert!(pick_up_to(&[], 2, &mut rng).is_empty());
        assert!(pick_up_to(&refs, 0, &mut rng).is_empty());
    }

    #[test]
    fn test_pick_up_to_is_deterministic_for_a_seed() {
        let pool = users(10);
        let refs: Vec<&User> = pool.iter().collect();

        let a = pick_up_to(&refs, 2, &mut StdRng::seed_from_u64(99));
        let b = pick_up_to(&refs, 2, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_pick_up_to_reaches_every_candidate() {
        let pool = users(4);
        let refs: Vec<&User> = pool.iter().collect();
        let mut rng = StdRng::seed_from_u64(11);

        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.extend(pick_up_to(&refs, 2, &mut rng));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_pick_one() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(pick_one(&[], &mut rng), None);

        let pool = users(1);
        let refs: Vec<&User> = pool.iter().collect();
        assert_eq!(pick_one(&refs, &mut rng), Some("u0".to_string()));

        let pool = users(3);
        let refs: Vec<&User> = pool.iter().collect();
        let mut seen = HashSet::new();
        for _ in 0..100 {
            seen.insert(pick_one(&refs, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_first_fit_skips_author_and_taken() {
        let pool: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];

        assert_eq!(first_fit(&pool, "x", &[]), Some("a"));
        assert_eq!(first_fit(&pool, "a", &[]), Some("b"));
        assert_eq!(first_fit(&pool, "a", &["b".into(), "c".into()]), Some("d"));
        assert_eq!(
            first_fit(&pool, "a", &["b".into(), "c".into(), "d".into()]),
            None
        );
        assert_eq!(first_fit(&[], "a", &[]), None);
    }
}
