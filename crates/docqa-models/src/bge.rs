//! Local BGE-M3 embedder (XLM-RoBERTa encoder on candle).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch_on_device;

pub const BGE_M3_DIM: usize = 1024;
const MAX_LEN: usize = 256;

pub struct BgeEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl BgeEmbedder {
    /// Load `tokenizer.json`, `config.json` and `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::embedding(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display())))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| Error::embedding(format!("bad model config {}: {e}", config_path.display())))?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(Error::embedding)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(Error::embedding)?;
        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, dim: BGE_M3_DIM })
    }

    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Vec<Vec<f32>>> {
        let token_type_ids = Tensor::zeros(input_ids.dims(), DType::I64, &self.device)?;
        let hidden = self.model.forward(input_ids, attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, attention_mask)?;
        pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2::<f32>()
    }
}

impl Embedder for BgeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { MAX_LEN }
    fn id(&self) -> String { format!("bge-m3:d{}", self.dim) }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch_on_device(&self.tokenizer, texts, MAX_LEN, &self.device)?;
        let vectors = self.forward(&input_ids, &attention_mask).map_err(Error::embedding)?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() as usize > 100 * texts.len() {
            warn!(?elapsed, batch = texts.len(), "slow embedding batch");
        } else {
            debug!(?elapsed, batch = texts.len(), "embedded batch");
        }
        Ok(vectors)
    }
}

/// Locate the BGE-M3 directory: explicit setting, `APP_MODEL_DIR`, `MODEL_DIR`, then
/// `../models/bge-m3` and `models/bge-m3`.
pub fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("../models/bge-m3"), PathBuf::from("models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            debug!(dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(Error::NotFound("BGE-M3 model directory".into()))
}
