use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::ApiBuilder};
use serde::Deserialize;
use tokenizers::{
    PaddingParams,
    PaddingStrategy,
    Tokenizer,
    TruncationParams,
};

use crate::{
    embedding::{Embedder, HASH_MODEL_ID, HashEmbedder},
    error::{Error, Result},
};

pub const DEFAULT_MODEL_ID: &str = "BAAI/bge-small-zh-v1.5";
pub const MODEL_ENV_VAR: &str = "INFOSTREAM_MODEL";
pub const HF_ENDPOINT_ENV_VAR: &str = "HF_ENDPOINT";
pub const CACHE_DIR_ENV_VAR: &str = "INFOSTREAM_CACHE_DIR";

/// Longest token sequence fed to the model; longer inputs are truncated.
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// Resolves which embedding model to use and where to fetch it from.
///
/// Nothing is downloaded until [`load`](Self::load) is called.
#[derive(Debug, Clone)]
pub struct ModelManager {
    model_id: String,
    endpoint: Option<String>,
    cache_dir: Option<PathBuf>,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `INFOSTREAM_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`BAAI/bge-small-zh-v1.5`)
    ///
    /// The hub endpoint is read from `HF_ENDPOINT` so a mirror can be used.
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self {
            model_id,
            endpoint: std::env::var(HF_ENDPOINT_ENV_VAR)
                .ok()
                .filter(|e| !e.is_empty()),
            cache_dir: None,
        }
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model_id,
            endpoint: None,
            cache_dir: None,
        }
    }

    /// Use a hub mirror instead of the default endpoint.
    pub fn endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint.filter(|e| !e.is_empty());
        self
    }

    /// Store downloaded model files under `dir` instead of the default
    /// cache location. Nothing is created until a hub download happens.
    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Returns the model ID that will be loaded.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn hub_endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Load the embedder, downloading model files if needed.
    ///
    /// The model id `hash` selects the built-in [`HashEmbedder`]; a path to
    /// a local directory loads the model from disk; anything else is
    /// fetched from the model hub.
    pub fn load(&self) -> Result<Box<dyn Embedder>> {
        if self.model_id == HASH_MODEL_ID {
            return Ok(Box::new(HashEmbedder::default()));
        }

        let files = self.fetch_files()?;
        Ok(Box::new(BertEmbedder::load(
            &self.model_id,
            &files,
            default_device(),
        )?))
    }

    fn fetch_files(&self) -> Result<ModelFiles> {
        let local = Path::new(&self.model_id);
        if local.is_dir() {
            return ModelFiles::from_dir(local);
        }

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(endpoint) = &self.endpoint {
            tracing::info!(%endpoint, "using model hub mirror");
            builder = builder.with_endpoint(endpoint.clone());
        }
        let api = builder
            .with_cache_dir(models_cache_dir(self.cache_dir.as_deref())?)
            .build()?;
        let repo =
            api.repo(Repo::new(self.model_id.clone(), RepoType::Model));

        tracing::info!(model = %self.model_id, "fetching embedding model");
        let config = repo.get("config.json")?;
        let tokenizer = repo.get("tokenizer.json")?;
        let weights = match repo.get("model.safetensors") {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(
                    "no safetensors weights ({e}), trying pytorch_model.bin"
                );
                repo.get("pytorch_model.bin")?
            }
        };

        Ok(ModelFiles {
            config,
            tokenizer,
            weights,
        })
    }
}

/// Directory for hub downloads, resolved from, in order of priority:
/// 1. An explicit path (from --cache-dir)
/// 2. The INFOSTREAM_CACHE_DIR environment variable
/// 3. The XDG cache directory (~/.cache/infostream/)
///
/// with a `models` subdirectory created below it.
fn models_cache_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => match std::env::var(CACHE_DIR_ENV_VAR) {
            Ok(val) if !val.is_empty() => PathBuf::from(val),
            _ => xdg::BaseDirectories::with_prefix("infostream")
                .get_cache_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG cache home directory".into(),
                    )
                })?,
        },
    };

    let models = root.join("models");
    std::fs::create_dir_all(&models)
        .map_err(|_| Error::CacheDir(models.clone()))?;
    Ok(models)
}

#[derive(Debug)]
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    fn from_dir(dir: &Path) -> Result<Self> {
        let require = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(Error::NotFound {
                    kind: "model file",
                    name: path.display().to_string(),
                })
            }
        };

        let weights = require("model.safetensors")
            .or_else(|_| require("pytorch_model.bin"))?;

        Ok(Self {
            config: require("config.json")?,
            tokenizer: require("tokenizer.json")?,
            weights,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

/// A BERT sentence-embedding model (BGE family): CLS pooling followed by L2
/// normalization.
pub struct BertEmbedder {
    model_id: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl BertEmbedder {
    fn load(model_id: &str, files: &ModelFiles, device: Device) -> Result<Self> {
        let config_json = std::fs::read_to_string(&files.config)?;
        let config: Config = serde_json::from_str(&config_json)?;
        let HiddenSize { hidden_size } = serde_json::from_str(&config_json)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| Error::Tokenizer(e.to_string()))?;

        let is_safetensors = files
            .weights
            .extension()
            .is_some_and(|ext| ext == "safetensors");
        let vb = if is_safetensors {
            // SAFETY: the weights file is owned by the model cache and is not
            // modified while mapped.
            unsafe {
                VarBuilder::from_mmaped_safetensors(
                    &[files.weights.clone()],
                    DTYPE,
                    &device,
                )?
            }
        } else {
            VarBuilder::from_pth(&files.weights, DTYPE, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        tracing::info!(model = %model_id, dimension = hidden_size, "embedding model loaded");

        Ok(Self {
            model_id: model_id.to_string(),
            model,
            tokenizer,
            device,
            dimension: hidden_size,
        })
    }

    fn stack(&self, rows: Vec<&[u32]>) -> Result<Tensor> {
        let rows = rows
            .into_iter()
            .map(|row| Tensor::new(row, &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;

        let input_ids =
            self.stack(encodings.iter().map(|e| e.get_ids()).collect())?;
        let type_ids =
            self.stack(encodings.iter().map(|e| e.get_type_ids()).collect())?;
        let attention_mask = self.stack(
            encodings.iter().map(|e| e.get_attention_mask()).collect(),
        )?;

        // [batch, tokens, hidden]
        let hidden =
            self.model
                .forward(&input_ids, &type_ids, Some(&attention_mask))?;

        // CLS pooling: [batch, hidden]
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let norm = cls.sqr()?.sum_keepdim(1)?.sqrt()?.affine(1.0, 1e-12)?;
        let normalized = cls.broadcast_div(&norm)?;

        Ok(normalized
            .to_device(&Device::Cpu)?
            .to_dtype(DType::F32)?
            .to_vec2::<f32>()?)
    }
}
