use std::collections::BTreeMap;

use super::ollama::OllamaClient;
use super::prompt::{
    build_explain_prompt, build_followup_prompt, build_summary_prompt, ALL_NORMAL_SUMMARY,
    GENERATION_ERROR,
};
use super::retrieval::{retrieve_context, RetrievalIndex};
use super::RagError;
use crate::config::AppConfig;
use crate::models::{LabResult, LabStatus};
use crate::pipeline::storage::embedder::embedder_for;
use crate::pipeline::storage::vectordb::{SqliteVectorStore, META_MODEL};

/// Trait for LLM text generation within the RAG pipeline.
pub trait LlmGenerate {
    fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

/// Passages retrieved per explanation and per question.
const EXPLAIN_TOP_K: usize = 3;
const SUMMARY_TOP_K: usize = 4;

/// Explanations, summaries and answers grounded in the reference index.
///
/// All methods block on model calls; run them off the async runtime.
pub struct LabReportRag {
    generator: Box<dyn LlmGenerate + Send + Sync>,
    index: Option<RetrievalIndex>,
}

impl LabReportRag {
    pub fn new(generator: Box<dyn LlmGenerate + Send + Sync>, index: Option<RetrievalIndex>) -> Self {
        Self { generator, index }
    }

    /// Connect to Ollama and open the reference index.
    ///
    /// A missing or empty index is not an error: retrieval then answers with
    /// a placeholder and generation still works.
    pub fn load(config: &AppConfig) -> Result<Self, RagError> {
        let generator = OllamaClient::with_preferred_model(
            &config.ollama_url,
            &config.model,
            &config.fallback_model,
            config.llm_timeout,
        )?;

        let index = match open_index(config) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Reference index unavailable");
                None
            }
        };

        Ok(Self::new(Box::new(generator), index))
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    fn generate_text(&self, prompt: &str) -> String {
        match self.generator.generate(prompt) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Generation failed");
                GENERATION_ERROR.to_string()
            }
        }
    }

    pub fn explain_result(&self, result: &LabResult) -> String {
        let query = format!("{} {} meaning causes treatment", result.test_name, result.status);
        let context = retrieve_context(self.index.as_ref(), &query, EXPLAIN_TOP_K);
        self.generate_text(&build_explain_prompt(result, &context))
    }

    /// Explanation per test name. A repeated name keeps the last explanation.
    pub fn explain_all_results(&self, results: &[LabResult]) -> BTreeMap<String, String> {
        let mut explanations = BTreeMap::new();
        for result in results {
            tracing::info!(test = %result.test_name, "Explaining result");
            explanations.insert(result.test_name.clone(), self.explain_result(result));
        }
        explanations
    }

    pub fn answer_followup_question(&self, question: &str, results: &[LabResult]) -> String {
        let context = retrieve_context(self.index.as_ref(), question, EXPLAIN_TOP_K);
        self.generate_text(&build_followup_prompt(question, results, &context))
    }

    pub fn generate_summary(&self, results: &[LabResult]) -> String {
        let abnormal: Vec<&LabResult> = results.iter().filter(|r| r.status.is_abnormal()).collect();
        if abnormal.is_empty() {
            return ALL_NORMAL_SUMMARY.to_string();
        }

        let normal_count = results.iter().filter(|r| r.status == LabStatus::Normal).count();
        let query = abnormal
            .iter()
            .map(|r| format!("{} {}", r.test_name, r.status))
            .collect::<Vec<_>>()
            .join(" ");
        let context = retrieve_context(self.index.as_ref(), &query, SUMMARY_TOP_K);

        self.generate_text(&build_summary_prompt(normal_count, &abnormal, &context))
    }
}

fn open_index(config: &AppConfig) -> Result<Option<RetrievalIndex>, RagError> {
    if !config.index_exists() {
        tracing::warn!(
            path = %config.index_path.display(),
            "No reference index found; run `lab-decoder build-index`"
        );
        return Ok(None);
    }

    let store = SqliteVectorStore::open(&config.index_path)?;
    let chunks = store.count()?;
    if chunks == 0 {
        tracing::warn!(path = %config.index_path.display(), "Reference index is empty");
        return Ok(None);
    }

    let embedder = embedder_for(config)?;
    if let Some(built_with) = store.meta(META_MODEL)? {
        if built_with != embedder.model_name() {
            tracing::warn!(
                index_model = %built_with,
                query_model = embedder.model_name(),
                "Index was built with a different embedding model; rebuild for accurate retrieval"
            );
        }
    }

    tracing::info!(chunks, "Reference index loaded");
    Ok(Some(RetrievalIndex::new(embedder, Box::new(store))))
}
