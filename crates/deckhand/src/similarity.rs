/// Cosine similarity between two embeddings.
///
/// Defined as 0.0 for mismatched lengths and for zero-magnitude vectors, so
/// degenerate embeddings rank last instead of poisoning the sort with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }

  let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let norms = magnitude(a) * magnitude(b);

  if norms == 0.0 {
    0.0
  } else {
    dot / norms
  }
}

fn magnitude(v: &[f32]) -> f32 {
  v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
