//! Similarity scoring and result ordering

use std::cmp::Ordering;

use crate::models::VectorMatch;

/// Cosine similarity (`1 - cosine_distance`); 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() || a.is_empty() {
    return 0.0;
  }

  let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f32, 0.0f32, 0.0f32), |acc, (x, y)| {
    (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
  });

  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }
  dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Threshold is an exclusive lower bound
pub fn passes_threshold(similarity: f32, threshold: f32) -> bool {
  similarity > threshold
}

/// Best similarity first, then newest, then by id so equal scores never reorder
pub fn compare_matches(a: &VectorMatch, b: &VectorMatch) -> Ordering {
  b.similarity
    .total_cmp(&a.similarity)
    .then_with(|| b.created_at.cmp(&a.created_at))
    .then_with(|| a.document_id.cmp(&b.document_id))
}
