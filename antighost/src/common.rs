//! Parallel helpers shared by the plane operations.

use rayon::prelude::*;

/// 16KB of f32 per chunk keeps neighbouring threads off each other's cache lines.
const CHUNK_SIZE: usize = 4096;

/// Evaluate `f` for every index in parallel, collecting into a `Vec<f32>`.
pub fn parallel_map_f32<F>(len: usize, f: F) -> Vec<f32>
where
    F: Fn(usize) -> f32 + Sync + Send,
{
    if len == 0 {
        return Vec::new();
    }

    let mut result = vec![0.0f32; len];
    result
        .par_chunks_mut(CHUNK_SIZE)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start = chunk_idx * CHUNK_SIZE;
            for (i, val) in chunk.iter_mut().enumerate() {
                *val = f(start + i);
            }
        });
    result
}

/// Sum of an f32 slice, accumulated in f64 per chunk.
///
/// Plane means feed the log-domain anchoring, where f32 accumulation over a
/// few million pixels drifts visibly.
pub fn parallel_sum_f64(values: &[f32]) -> f64 {
    values
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| chunk.iter().map(|&v| v as f64).sum::<f64>())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_map_f32() {
        let result = parallel_map_f32(10_000, |i| i as f32 * 2.0);
        assert_eq!(result.len(), 10_000);
        for (i, &v) in result.iter().enumerate() {
            assert_eq!(v, i as f32 * 2.0);
        }
    }

    #[test]
    fn test_parallel_map_f32_empty() {
        assert!(parallel_map_f32(0, |_| 1.0).is_empty());
    }

    #[test]
    fn test_parallel_sum_f64() {
        let values: Vec<f32> = (1..=10_000).map(|x| x as f32).collect();
        assert_eq!(parallel_sum_f64(&values), 50_005_000.0);
    }
}
