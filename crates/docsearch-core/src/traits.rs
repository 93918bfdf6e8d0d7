/// Embedding capability consumed by the vector index. Implementations
/// live in `docsearch-embed`; everything else treats this as opaque.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
