//! Ask command: the full pipeline against the configured LLM service

use super::load_catalog;
use crate::app::{AskArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use menusift_core::{
    Config, ConstraintExtractor, CorpusHandle, EmbeddingIndex, HttpLLMClient, LLMClient,
    LlmConstraintSource, LlmEmbedder, LlmResponseGenerator, MenuAssistant,
};
use std::sync::Arc;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let (schema, corpus, report) = load_catalog(config)?;
    if !report.is_clean() {
        tracing::warn!(
            "{} catalog attributes were flagged; run `menusift check` for details",
            report.flagged.len()
        );
    }
    let query = args.query.join(" ");

    let llm = &config.llm_service;
    let client = Arc::new(HttpLLMClient::new(llm.clone())?);
    let shared: Arc<dyn LLMClient> = client.clone();

    let source = LlmConstraintSource::new(shared.clone(), &schema, llm.extraction_temperature);
    let extractor = ConstraintExtractor::new(Arc::new(source), schema, llm.timeout());
    let generator = LlmResponseGenerator::new(
        shared.clone(),
        llm.generation_temperature,
        config.selection.presentation_cap,
    );

    let index = if args.semantic {
        let embedder = Arc::new(LlmEmbedder::new(shared.clone()));
        Some(Arc::new(EmbeddingIndex::build(embedder, &corpus).await?))
    } else {
        None
    };

    let mut assistant = MenuAssistant::new(
        config.clone(),
        CorpusHandle::new(corpus),
        extractor,
        Arc::new(generator),
    )?;
    if let Some(index) = index {
        assistant = assistant.with_semantic_search(index);
    }

    let rendered = if args.no_answer {
        let rec = assistant.recommend(&query).await?;
        output::format_recommendation(&rec, None, &[], format)
    } else {
        let answer = assistant.answer(&query).await?;
        output::format_recommendation(&answer.recommendation, Some(&answer.text), &[], format)
    };
    print!("{}", rendered);

    let stats = client.stats();
    tracing::debug!(
        "LLM requests: {} ({} errors, {} cache hits, {:.0} ms avg)",
        stats.requests,
        stats.errors,
        stats.cache_hits,
        stats.avg_latency_ms
    );
    Ok(())
}
