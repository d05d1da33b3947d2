//! Permutate: shuffle absorbed pitches among their contributors.

use rand::seq::SliceRandom;
use serde_yaml::Value;

use crate::seed::attribute_rng;

/// Reassign the pitches uniformly at random, one per contributor.
///
/// Contributors keep their absorption order; only the values move.
pub fn harmonize(name: &str, frame_seed: i64, input: &[(String, Value)]) -> Vec<(String, Value)> {
    let mut values: Vec<Value> = input.iter().map(|(_, v)| v.clone()).collect();
    let mut rng = attribute_rng(name, frame_seed, None);
    values.shuffle(&mut rng);
    input
        .iter()
        .map(|(element, _)| element.clone())
        .zip(values)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(values: &[i64]) -> Vec<(String, Value)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("/item_{i}/slot"), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_keys_keep_absorption_order() {
        let out = harmonize("/shuffle", 3, &input(&[1, 2, 3, 4]));
        let keys: Vec<_> = out.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["/item_0/slot", "/item_1/slot", "/item_2/slot", "/item_3/slot"]);
    }

    #[test]
    fn test_deterministic_per_frame_seed() {
        let a = harmonize("/shuffle", 11, &input(&[1, 2, 3, 4, 5, 6]));
        let b = harmonize("/shuffle", 11, &input(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input() {
        assert!(harmonize("/shuffle", 0, &[]).is_empty());
    }
}
