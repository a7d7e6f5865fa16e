//! The value engine: per-tick random walks for every numeric field.
//!
//! Edges drift with a small random step plus 1% mean reversion toward 100
//! and are quoted to two decimal places; quantities take whole-number
//! steps and stay inside [1, 100].

use rand::Rng;

pub const EDGE_MEAN: f64 = 100.0;
pub const QTY_MIN: f64 = 1.0;
pub const QTY_MAX: f64 = 100.0;

pub fn walk_edge<R: Rng>(rng: &mut R, current: f64) -> f64 {
    let step = rng.gen_range(-0.1..=0.1);
    let reversion = (EDGE_MEAN - current) * 0.01;
    round2(current + step + reversion)
}

pub fn walk_quantity<R: Rng>(rng: &mut R, current: f64) -> f64 {
    let step = rng.gen_range(-1.0..=1.0);
    (current + step).clamp(QTY_MIN, QTY_MAX).round()
}

/// Next value for `field`, walking from `current`.
pub fn next_value<R: Rng>(rng: &mut R, field: &str, current: f64) -> f64 {
    match field {
        "bid_edge" | "ask_edge" => walk_edge(rng, current),
        _ => walk_quantity(rng, current),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn edges_are_quoted_to_two_decimals() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let value = walk_edge(&mut rng, 99.5);
            assert_eq!(value, round2(value));
        }
    }

    #[test]
    fn edges_revert_toward_the_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut value = -10.0;
        for _ in 0..1000 {
            value = walk_edge(&mut rng, value);
        }
        assert!((value - EDGE_MEAN).abs() < 20.0, "value drifted to {value}");
    }

    #[test]
    fn quantities_stay_whole_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut value = 0.0;
        for _ in 0..1000 {
            value = walk_quantity(&mut rng, value);
            assert!((QTY_MIN..=QTY_MAX).contains(&value));
            assert_eq!(value, value.round());
        }
    }
}
