//! Embedding generation for the retrieval index.
//!
//! `EmbeddingGenerator` is the opaque `encode(texts) -> vectors` capability
//! the rest of the crate depends on. `FastEmbedGenerator` backs it with a
//! local fastembed sentence-embedding model.

use std::path::Path;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::vector::{VectorDimension, VectorError};

/// Trait for generating embeddings from text.
///
/// Implementations must be thread-safe: one instance is shared by the
/// index build and every concurrent query.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts.
    ///
    /// Returns exactly one vector per input text, in input order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError>;

    /// Get the dimension of embeddings produced by this generator.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Stable name recorded next to persisted vectors.
    #[must_use]
    fn model_name(&self) -> &str;
}

/// FastEmbed implementation of [`EmbeddingGenerator`].
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    dimension: VectorDimension,
    model_name: String,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("model", &"<TextEmbedding>")
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Load `model_name` from `cache_dir`, downloading it on first use.
    ///
    /// # Errors
    /// Returns [`VectorError::ModelUnavailable`] if the name is unknown or the
    /// model cannot be loaded.
    pub fn new(
        model_name: &str,
        cache_dir: &Path,
        show_download_progress: bool,
    ) -> Result<Self, VectorError> {
        let model = parse_embedding_model(model_name)?;

        let has_cached_models = cache_dir.exists()
            && cache_dir
                .read_dir()
                .is_ok_and(|mut entries| entries.any(|_| true));
        if has_cached_models {
            tracing::info!(model = model_name, "loading embedding model from cache");
        } else {
            tracing::info!(model = model_name, "downloading embedding model (first time only)");
        }

        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model.clone())
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| VectorError::ModelUnavailable(format!("{model_name}: {e}")))?;

        // Probe once to learn the output dimension.
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| VectorError::ModelUnavailable(format!("{model_name}: {e}")))?;
        let dimension = probe
            .first()
            .map(Vec::len)
            .ok_or_else(|| {
                VectorError::ModelUnavailable(format!("{model_name}: probe returned no embedding"))
            })
            .and_then(VectorDimension::new)?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            model_name: model_to_string(&model),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
            })?;

        if embeddings.len() != texts.len() {
            return Err(VectorError::EmbeddingFailed(format!(
                "model returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        for embedding in &embeddings {
            self.dimension.validate_vector(embedding)?;
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Parse a configured model name (case-insensitive).
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, VectorError> {
    let model = match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
        "allminilml6v2" => EmbeddingModel::AllMiniLML6V2,
        "allminilml12v2" => EmbeddingModel::AllMiniLML12V2,
        "bgesmallenv15" => EmbeddingModel::BGESmallENV15,
        "bgebaseenv15" => EmbeddingModel::BGEBaseENV15,
        "multilinguale5small" => EmbeddingModel::MultilingualE5Small,
        "paraphrasemlminilml12v2" => EmbeddingModel::ParaphraseMLMiniLML12V2,
        _ => {
            return Err(VectorError::ModelUnavailable(format!(
                "unknown model '{name}' (supported: AllMiniLML6V2, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15, MultilingualE5Small, ParaphraseMLMiniLML12V2)"
            )));
        }
    };
    Ok(model)
}

/// Canonical name for a supported model.
#[must_use]
pub fn model_to_string(model: &EmbeddingModel) -> String {
    match model {
        EmbeddingModel::AllMiniLML6V2 => "AllMiniLML6V2",
        EmbeddingModel::AllMiniLML12V2 => "AllMiniLML12V2",
        EmbeddingModel::BGESmallENV15 => "BGESmallENV15",
        EmbeddingModel::BGEBaseENV15 => "BGEBaseENV15",
        EmbeddingModel::MultilingualE5Small => "MultilingualE5Small",
        EmbeddingModel::ParaphraseMLMiniLML12V2 => "ParaphraseMLMiniLML12V2",
        _ => return format!("{model:?}"),
    }
    .to_string()
}

/// Mock embedding generator for testing.
///
/// Each axis counts occurrences of one keyword, plus a small constant bias
/// axis so no text maps to the zero vector.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    vocabulary: Vec<&'static str>,
    dimension: VectorDimension,
}

#[cfg(test)]
impl Default for MockEmbeddingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MockEmbeddingGenerator {
    const VOCABULARY: [&'static str; 12] = [
        "technology",
        "california",
        "washington",
        "software",
        "hardware",
        "financials",
        "energy",
        "health",
        "retail",
        "company",
        "investors",
        "sector",
    ];

    #[must_use]
    pub fn new() -> Self {
        let vocabulary = Self::VOCABULARY.to_vec();
        let dimension = VectorDimension::new(vocabulary.len() + 1)
            .unwrap_or_else(|_| VectorDimension::dimension_384());
        Self {
            vocabulary,
            dimension,
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimension.get()];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if let Some(axis) = self.vocabulary.iter().position(|w| *w == token) {
                embedding[axis] += 1.0;
            }
        }
        embedding[self.vocabulary.len()] = 0.1;
        embedding
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "MockKeywordModel"
    }
}
