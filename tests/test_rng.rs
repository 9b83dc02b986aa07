// Tests for RNG reproducibility and distribution.

use backprop::utils::SimpleRng;
use backprop::Context;

#[test]
fn test_same_seed_same_stream() {
    let mut a = SimpleRng::new(2024);
    let mut b = SimpleRng::new(2024);
    for _ in 0..256 {
        assert_eq!(a.next_u32(), b.next_u32());
    }
}

#[test]
fn test_different_seeds_differ() {
    let mut a = SimpleRng::new(1);
    let mut b = SimpleRng::new(2);
    let a_values: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
    let b_values: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
    assert_ne!(a_values, b_values);
}

#[test]
fn test_zero_seed_is_usable() {
    let mut rng = SimpleRng::new(0);
    let values: Vec<u32> = (0..4).map(|_| rng.next_u32()).collect();
    assert!(values.iter().any(|&v| v != 0));
}

#[test]
fn test_random_weight_mean_near_zero() {
    let mut rng = SimpleRng::new(99);
    let samples = 20_000;
    let sum: f64 = (0..samples).map(|_| rng.random_weight()).sum();
    assert!((sum / samples as f64).abs() < 0.05);
}

#[test]
fn test_random_index_covers_range() {
    let mut rng = SimpleRng::new(5);
    let mut seen = [false; 4];
    for _ in 0..400 {
        seen[rng.random_index(0, 4)] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_gen_range_bounds() {
    let mut rng = SimpleRng::new(31);
    for _ in 0..1000 {
        let v = rng.gen_range_f64(-3.0, 2.0);
        assert!((-3.0..=2.0).contains(&v));
    }
}

#[test]
fn test_contexts_are_independent() {
    let mut a = Context::new(17);
    let mut b = Context::new(17);
    a.rng.next_u32();
    a.rng.next_u32();

    let mut fresh = Context::new(17);
    assert_eq!(b.rng.next_u32(), fresh.rng.next_u32());

    a.reseed(17);
    assert_eq!(a.rng.next_u32(), Context::new(17).rng.next_u32());
}
