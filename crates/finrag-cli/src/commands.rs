//! Subcommand handlers. Each builds only the clients it needs, so `build`,
//! `search` and `status` work without a Gemini key.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use finrag_answer::{Evaluator, GeminiClient, RagPipeline, SentimentTally};
use finrag_core::{AppConfig, SentimentLabel};
use finrag_retrieval::{QdrantClient, Retriever, TeiClient};

type CliRetriever = Retriever<TeiClient, QdrantClient>;

fn build_retriever(config: &AppConfig) -> anyhow::Result<CliRetriever> {
    let embedder = Arc::new(TeiClient::new(
        &config.tei_url,
        config.embed_dim,
        config.request_timeout_secs,
    )?);
    let store = Arc::new(QdrantClient::new(
        &config.qdrant_url,
        config.qdrant_api_key.as_deref(),
        config.request_timeout_secs,
    )?);
    Ok(Retriever::new(
        embedder,
        store,
        config.collection_name.clone(),
    ))
}

/// One aligned `label count (pct%)` line per label, in display order.
pub(crate) fn distribution_lines(tally: &SentimentTally) -> Vec<String> {
    SentimentLabel::ALL
        .iter()
        .map(|&label| {
            format!(
                "{:<10}{:>5}  ({:>5.1}%)",
                label.as_str(),
                tally.count(label),
                tally.percentage(label)
            )
        })
        .collect()
}

fn print_distribution(title: &str, tally: &SentimentTally) {
    println!("{title} ({} total)", tally.total());
    for line in distribution_lines(tally) {
        println!("  {line}");
    }
}

/// Rebuild the collection from `path`.
///
/// # Errors
///
/// Returns an error if the corpus cannot be loaded, embedded or uploaded.
pub(crate) async fn run_build(config: &AppConfig, path: &Path, json: bool) -> anyhow::Result<()> {
    let retriever = build_retriever(config)?;
    let report = retriever
        .build_index(path)
        .await
        .with_context(|| format!("index rebuild from {} failed", path.display()))?;
    let tally = SentimentTally::from_counts(&report.distribution);

    if json {
        let labels: serde_json::Map<String, serde_json::Value> = SentimentLabel::ALL
            .iter()
            .map(|&l| (l.to_string(), tally.count(l).into()))
            .collect();
        let out = serde_json::json!({
            "collection": report.collection,
            "records": report.records,
            "uploaded": report.uploaded,
            "auto_labeled": report.auto_labeled(),
            "labels": labels,
            "unexpected_labels": report.unexpected_labels,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "indexed {} of {} sentences into '{}'",
        report.uploaded, report.records, report.collection
    );
    if report.auto_labeled() {
        println!("no sentiment column found; labels were derived from the lexicon scorer");
    }
    print_distribution("sentiment distribution", &tally);
    if !report.unexpected_labels.is_empty() {
        println!(
            "warning: stored labels outside positive/negative/neutral: {}",
            report.unexpected_labels.join(", ")
        );
    }
    Ok(())
}

/// Print the `top_k` nearest sentences to `query`.
///
/// # Errors
///
/// Returns an error if the query cannot be embedded.
pub(crate) async fn run_search(
    config: &AppConfig,
    query: &str,
    top_k: usize,
    json: bool,
) -> anyhow::Result<()> {
    let retriever = build_retriever(config)?;
    let hits = retriever.search(query, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("no results; run `finrag build` first");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{:>3}. [{:<8}] {}", i + 1, hit.sentiment.as_str(), hit.sentence);
    }
    Ok(())
}

/// Answer `question` and optionally score it.
///
/// # Errors
///
/// Returns an error if the store is unreachable at startup, `GOOGLE_API_KEY`
/// is missing, or evaluation embedding fails. Query failures are reported in
/// the answer text.
pub(crate) async fn run_query(
    config: &AppConfig,
    question: &str,
    evaluate: bool,
    json: bool,
) -> anyhow::Result<()> {
    let retriever = build_retriever(config)?;
    retriever
        .init()
        .await
        .context("vector store is not reachable")?;
    let evaluator = Evaluator::new(Arc::clone(retriever.embedder()));
    let generator = Arc::new(GeminiClient::from_config(config)?);
    let pipeline = RagPipeline::new(retriever, generator);

    let result = pipeline.query(question).await;
    let evaluation = if evaluate {
        Some(
            evaluator
                .evaluate(question, &result.context, &result.answer)
                .await?,
        )
    } else {
        None
    };

    if json {
        let mut out = serde_json::to_value(&result)?;
        if let (Some(eval), Some(obj)) = (evaluation, out.as_object_mut()) {
            obj.insert("evaluation".to_string(), serde_json::to_value(eval)?);
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Answer:\n{}\n", result.answer);
    if let Some(summary) = &result.sentiment_summary {
        println!("{summary}\n");
    }
    if !result.context.is_empty() {
        println!("Retrieved context:");
        for item in &result.context {
            println!("  - {} ({})", item.sentence, item.sentiment);
        }
        println!();
        print_distribution(
            "context sentiment",
            &SentimentTally::from_context(&result.context),
        );
    }
    if let Some(eval) = evaluation {
        println!(
            "\nretrieval score: {:.3}\nanswer quality:  {:.3}",
            eval.retrieval_score, eval.answer_quality
        );
    }
    Ok(())
}

/// Print store reachability, collections and point count.
///
/// # Errors
///
/// Returns an error if the vector store cannot be reached.
pub(crate) async fn run_status(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let retriever = build_retriever(config)?;
    let status = retriever
        .status()
        .await
        .with_context(|| format!("Qdrant offline at {}", config.qdrant_url))?;

    if json {
        let out = serde_json::json!({
            "qdrant_url": config.qdrant_url,
            "collection": retriever.collection(),
            "collection_exists": status.collection_exists,
            "points": status.points,
            "collections": status.collections,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Qdrant connected at {} ({} collections)",
        config.qdrant_url,
        status.collections.len()
    );
    match status.points {
        Some(points) => println!("collection '{}': {points} points", retriever.collection()),
        None => println!(
            "collection '{}' does not exist; run `finrag build`",
            retriever.collection()
        ),
    }
    Ok(())
}
