use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VectorMathError {
    #[error("vectors must not be empty")]
    Empty,
    #[error("vector length mismatch: {0} != {1}")]
    LengthMismatch(usize, usize),
}

/// Cosine similarity in `[-1, 1]`. A zero-norm side yields `0.0`, never NaN.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, VectorMathError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(VectorMathError::Empty);
    }
    if query.len() != candidate.len() {
        return Err(VectorMathError::LengthMismatch(query.len(), candidate.len()));
    }

    // f64 accumulators: squares of small components underflow in f32.
    let mut dot = 0.0f64;
    let mut query_sq = 0.0f64;
    let mut candidate_sq = 0.0f64;
    for (q, c) in query.iter().zip(candidate) {
        let (q, c) = (f64::from(*q), f64::from(*c));
        dot += q * c;
        query_sq += q * q;
        candidate_sq += c * c;
    }

    if query_sq == 0.0 || candidate_sq == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (query_sq.sqrt() * candidate_sq.sqrt());
    if !similarity.is_finite() {
        return Ok(0.0);
    }
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Ranks candidates by descending similarity. The sort is stable, so equal
/// scores keep their input order.
pub fn rank_descending_by_cosine<'a, I>(
    query: &[f32],
    candidates: I,
) -> Result<Vec<(usize, f32)>, VectorMathError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scores = Vec::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}
