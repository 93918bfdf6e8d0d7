use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::info;

use docsearch_core::traits::Embedder;
use docsearch_core::EMBEDDING_DIM;

use crate::device::select_device;
use crate::tokenize::tokenize_on_device;

const MAX_SEQ_LEN: usize = 256;

/// BGE-M3 sentence embedder: masked mean pooling over the last hidden
/// state, L2-normalized.
pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingModel {
    pub fn new() -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir()?;
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("model loaded");
        Ok(Self { model, tokenizer, device })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, MAX_SEQ_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_SEQ_LEN), DType::I64, &self.device)?;
        let hidden =
            self.model
                .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;

        let hdim = hidden.dims()[2];
        let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
        let mask_3d = mask.unsqueeze(2)?;
        let mask_b = mask_3d
            .broadcast_as(hidden.shape())
            .unwrap_or(mask_3d.repeat((1, 1, hdim))?);
        let masked = (&hidden * &mask_b)?;
        let sum = masked.sum(1)?;
        let lens = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
        let mut emb = sum.broadcast_div(&lens)?;

        let eps = Tensor::new(&[1e-12f32], hidden.device())?
            .to_dtype(hidden.dtype())?
            .unsqueeze(0)?;
        let norm = emb.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
        emb = emb.broadcast_div(&norm)?;

        let emb_cpu: Vec<f32> = emb.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb_cpu.len() != EMBEDDING_DIM {
            return Err(anyhow!(
                "unexpected embedding width {} (want {EMBEDDING_DIM})",
                emb_cpu.len()
            ));
        }
        Ok(emb_cpu)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

fn resolve_model_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let default = Path::new("models/bge-m3");
    if default.exists() {
        return Ok(default.to_path_buf());
    }
    Err(anyhow!(
        "could not locate BGE-M3 model directory (set APP_MODEL_DIR or place it at models/bge-m3)"
    ))
}
