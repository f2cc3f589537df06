//! Cosine similarity over embedding vectors.

/// Cosine similarity between two equal-length vectors, in [-1, 1].
///
/// A zero-norm vector maps to 0.0 rather than dividing by zero; callers
/// guarantee equal dimensionality (the matcher excludes mismatched
/// vectors before ranking).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have the same dimension");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
