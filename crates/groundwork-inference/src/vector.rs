//! Post-processing shared by every embedding backend.

use groundwork_core::{Error, Result, Vector};

/// Scale `v` to unit length in place. The zero vector is left untouched.
pub fn normalize_l2(v: &mut [f32]) {
    let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= magnitude);
    }
}

/// Turn raw model output into stored vectors.
///
/// Fails when the backend returned a different number of vectors than
/// inputs, or any vector whose length is not `dimension`.
pub fn finish_embeddings(
    raw: Vec<Vec<f32>>,
    expected_count: usize,
    dimension: usize,
    normalize: bool,
) -> Result<Vec<Vector>> {
    if raw.len() != expected_count {
        return Err(Error::Embedding(format!(
            "Backend returned {} embeddings for {} inputs",
            raw.len(),
            expected_count
        )));
    }

    raw.into_iter()
        .map(|mut v| {
            if v.len() != dimension {
                return Err(Error::Embedding(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dimension,
                    v.len()
                )));
            }
            if normalize {
                normalize_l2(&mut v);
            }
            Ok(Vector::from(v))
        })
        .collect()
}
