use anyhow::{anyhow, Result};
use std::collections::HashMap;

#[cfg(feature = "neural")]
use ort::{
  session::{builder::GraphOptimizationLevel, Session},
  value::TensorRef,
};
#[cfg(feature = "neural")]
use std::sync::Mutex;
#[cfg(feature = "neural")]
use tokenizers::Tokenizer;

/// Capability consumed by the embedding store: text in, fixed-length vector out.
/// Implementations must be deterministic within a session so stored vectors
/// stay comparable to query vectors.
pub trait TextEmbedder: Send + Sync {
  fn embed(&self, text: &str) -> Result<Vec<f32>>;
  fn dimensions(&self) -> usize;
}

/// Default backend: deterministic token-hash embedding.
///
/// Tokens are hashed (FNV-1a) into a fixed number of signed buckets and the
/// result is L2-normalized. No model download, no network, stable across runs,
/// which is exactly what the flat-file cache needs to be rebuildable anywhere.
pub struct HashEmbedder {
  dimensions: usize,
}

impl HashEmbedder {
  pub const DEFAULT_DIMENSIONS: usize = 256;

  pub fn new(dimensions: usize) -> Self {
    Self { dimensions: dimensions.max(1) }
  }
}

impl Default for HashEmbedder {
  fn default() -> Self {
    Self::new(Self::DEFAULT_DIMENSIONS)
  }
}

impl TextEmbedder for HashEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let mut vector = vec![0.0f32; self.dimensions];

    for raw_token in text.split(|c: char| !c.is_alphanumeric()) {
      if raw_token.is_empty() {
        continue;
      }
      let token = raw_token.to_ascii_lowercase();
      let hash = fnv1a(token.as_bytes());
      let index = (hash as usize) % self.dimensions;
      let sign = if hash & 1 == 0 { 1.0 } else { -1.0 };
      vector[index] += sign;
    }

    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
      for component in &mut vector {
        *component /= magnitude;
      }
    }

    Ok(vector)
  }

  fn dimensions(&self) -> usize {
    self.dimensions
  }
}

fn fnv1a(bytes: &[u8]) -> u64 {
  const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
  const PRIME: u64 = 0x100000001b3;

  let mut hash = OFFSET_BASIS;
  for byte in bytes {
    hash ^= *byte as u64;
    hash = hash.wrapping_mul(PRIME);
  }
  hash
}

/// Neural backend: all-MiniLM-L6-v2 via ONNX Runtime
#[cfg(feature = "neural")]
pub struct OnnxEmbedder {
  inner: Mutex<OnnxInner>,
}

#[cfg(feature = "neural")]
struct OnnxInner {
  session: Session,
  tokenizer: Tokenizer,
}

#[cfg(feature = "neural")]
impl OnnxEmbedder {
  const EMBEDDING_DIMENSIONS: usize = 384;

  /// Initialize the ONNX model and tokenizer
  pub fn new() -> Result<Self> {
    ort::init()
      .with_name("deckhand-embedder")
      .commit()
      .map_err(|e| anyhow!("Failed to initialize ONNX Runtime: {}", e))?;

    let session = Session::builder()
      .map_err(|e| anyhow!("Failed to create session builder: {}", e))?
      .with_optimization_level(GraphOptimizationLevel::Level1)
      .map_err(|e| anyhow!("Failed to set optimization level: {}", e))?
      .with_intra_threads(1)
      .map_err(|e| anyhow!("Failed to set thread count: {}", e))?
      .commit_from_url("https://cdn.pyke.io/0/pyke:ort-rs/example-models@0.0.0/all-MiniLM-L6-v2.onnx")
      .map_err(|e| anyhow!("Failed to load model: {}", e))?;

    let tokenizer_path = crate::config::data_root()?.join("models").join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
      anyhow!("Failed to load tokenizer from {} ({})", tokenizer_path.display(), e)
    })?;

    Ok(Self { inner: Mutex::new(OnnxInner { session, tokenizer }) })
  }
}

#[cfg(feature = "neural")]
impl TextEmbedder for OnnxEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let mut inner = self.inner.lock().map_err(|_| anyhow!("Embedding session lock poisoned"))?;

    let encoding = inner
      .tokenizer
      .encode(text, false)
      .map_err(|e| anyhow!("Failed to encode text: {}", e))?;

    let token_length = encoding.len();
    let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| m as i64).collect();

    let ids_tensor = TensorRef::from_array_view(([1, token_length], &*ids))?;
    let mask_tensor = TensorRef::from_array_view(([1, token_length], &*mask))?;

    let outputs = inner.session.run(ort::inputs![ids_tensor, mask_tensor])?;

    // Sentence-transformer exports put the pooled embedding at index 1
    let pooled = if outputs.len() > 1 { &outputs[1] } else { &outputs[0] };
    let embeddings = pooled.try_extract_array::<f32>()?.into_dimensionality::<ndarray::Ix2>()?;

    Ok(embeddings.index_axis(ndarray::Axis(0), 0).iter().copied().collect())
  }

  fn dimensions(&self) -> usize {
    Self::EMBEDDING_DIMENSIONS
  }
}

/// Mock embedding backend for testing
pub struct MockEmbedder {
  pub embeddings: HashMap<String, Vec<f32>>,
  pub fallback: Vec<f32>,
  pub fail_on_texts: Vec<String>,
}

impl Default for MockEmbedder {
  fn default() -> Self {
    Self::new()
  }
}

impl MockEmbedder {
  pub fn new() -> Self {
    Self {
      embeddings: HashMap::new(),
      fallback: vec![0.1, 0.2, 0.3],
      fail_on_texts: vec![],
    }
  }

  /// Pin the vector returned for one exact text
  pub fn with_embedding(mut self, text: &str, embedding: Vec<f32>) -> Self {
    self.embeddings.insert(text.to_string(), embedding);
    self
  }

  /// Vector returned for texts without a pinned embedding
  pub fn with_fallback(mut self, embedding: Vec<f32>) -> Self {
    self.fallback = embedding;
    self
  }

  pub fn with_failure_on(mut self, text: &str) -> Self {
    self.fail_on_texts.push(text.to_string());
    self
  }
}

impl TextEmbedder for MockEmbedder {
  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    if self.fail_on_texts.iter().any(|t| t == text) {
      return Err(anyhow!("Mock failure for text: {}", text));
    }

    Ok(self.embeddings.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
  }

  fn dimensions(&self) -> usize {
    self.fallback.len()
  }
}
