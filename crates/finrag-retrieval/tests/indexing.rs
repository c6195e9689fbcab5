//! Rebuild and search behavior against the in-memory index.

mod common;

use std::sync::Arc;

use common::{embed_one, write_csv, write_csv_bytes, FailingEmbedder, HashEmbedder, DIM};
use finrag_core::SentimentLabel;
use finrag_retrieval::{
    load_corpus, CorpusLayout, MemoryIndex, RetrievalError, Retriever, VectorIndex,
};

const COLLECTION: &str = "finrag_test";

fn retriever() -> (Retriever<HashEmbedder, MemoryIndex>, Arc<MemoryIndex>) {
    let store = Arc::new(MemoryIndex::new());
    let retriever = Retriever::new(
        Arc::new(HashEmbedder::default()),
        Arc::clone(&store),
        COLLECTION,
    );
    (retriever, store)
}

const PHRASEBANK: &str = "\
sentence,label
positive,Operating profit rose to EUR 13.1 mn from EUR 8.7 mn
negative,The company reported a net loss for the third quarter
neutral,The annual general meeting will be held in Helsinki
Positive!!,Net sales grew strongly across all regions
";

#[tokio::test]
async fn rebuild_then_search_returns_the_indexed_sentence() {
    let (retriever, store) = retriever();
    let csv = write_csv(PHRASEBANK);

    let report = retriever.build_index(csv.path()).await.unwrap();
    assert_eq!(report.records, 4);
    assert_eq!(report.uploaded, 4);
    assert_eq!(report.layout, CorpusLayout::SwappedSentenceLabel);
    assert!(!report.auto_labeled());
    assert!(report.unexpected_labels.is_empty());

    let sentence = "The company reported a net loss for the third quarter";
    let hits = retriever.search(sentence, 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].sentence, sentence);
    assert_eq!(hits[0].sentiment, SentimentLabel::Negative);

    let scored = store
        .search(COLLECTION, &embed_one(sentence), 1)
        .await
        .unwrap();
    assert!(scored[0].score >= 0.99, "score was {}", scored[0].score);
}

#[tokio::test]
async fn swapped_columns_keep_text_and_label_apart() {
    let (retriever, store) = retriever();
    let csv = write_csv(PHRASEBANK);
    retriever.build_index(csv.path()).await.unwrap();

    let stored = store.sample_payloads(COLLECTION, 100).await.unwrap();
    let grew = stored
        .iter()
        .find(|p| p.sentence.starts_with("Net sales grew"))
        .unwrap();
    assert_eq!(grew.sentiment, SentimentLabel::Positive);
    assert!(stored
        .iter()
        .all(|p| !["positive", "negative", "neutral"].contains(&p.sentence.as_str())));
}

#[tokio::test]
async fn second_rebuild_leaves_only_the_new_corpus() {
    let (retriever, store) = retriever();
    let first = write_csv("text,sentiment\nAlpha shares surged,positive\nBeta bonds fell,negative\n");
    let second = write_csv("text,sentiment\nGamma guidance unchanged,neutral\n");

    retriever.build_index(first.path()).await.unwrap();
    assert_eq!(store.count(COLLECTION).await.unwrap(), 2);

    retriever.build_index(second.path()).await.unwrap();
    assert_eq!(store.count(COLLECTION).await.unwrap(), 1);

    let stored = store.sample_payloads(COLLECTION, 100).await.unwrap();
    let sentences: Vec<&str> = stored.iter().map(|p| p.sentence.as_str()).collect();
    assert_eq!(sentences, vec!["Gamma guidance unchanged"]);
}

#[tokio::test]
async fn search_before_any_build_is_empty() {
    let (retriever, _store) = retriever();
    assert!(retriever.search("profit warning", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_on_initialized_empty_collection_is_empty() {
    let (retriever, _store) = retriever();
    retriever.init().await.unwrap();
    assert!(retriever.search("profit warning", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn init_rejects_collection_with_another_dimension() {
    let (retriever, store) = retriever();
    store.ensure_collection(COLLECTION, 3).await.unwrap();

    let err = retriever.init().await.unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::DimensionMismatch {
            expected: 3,
            got: DIM
        }
    ));
}

#[tokio::test]
async fn init_accepts_collection_with_matching_dimension() {
    let (retriever, store) = retriever();
    store.ensure_collection(COLLECTION, DIM).await.unwrap();
    retriever.init().await.unwrap();
}

#[test]
fn bom_header_and_latin1_cells_still_load() {
    let csv = write_csv_bytes(b"\xef\xbb\xbfSentence , Label\npositive,Caf\xe9 sales rose\n");
    let corpus = load_corpus(csv.path()).unwrap();

    assert_eq!(corpus.layout, CorpusLayout::SwappedSentenceLabel);
    assert_eq!(corpus.text_column, "label");
    assert_eq!(corpus.records.len(), 1);
    assert_eq!(corpus.records[0].label, SentimentLabel::Positive);
    assert!(corpus.records[0].text.contains('\u{fffd}'));
    assert!(corpus.records[0].text.ends_with(" sales rose"));
}

#[tokio::test]
async fn corpus_without_label_column_is_auto_labeled() {
    let (retriever, store) = retriever();
    let csv = write_csv(
        "headline_text\n\
         Quarterly profit rose to a record high\n\
         Recession fears and layoffs weigh on the shares\n\
         The board met on Tuesday\n",
    );

    let report = retriever.build_index(csv.path()).await.unwrap();
    assert!(report.auto_labeled());

    let stored = store.sample_payloads(COLLECTION, 100).await.unwrap();
    let label_of = |prefix: &str| {
        stored
            .iter()
            .find(|p| p.sentence.starts_with(prefix))
            .map(|p| p.sentiment)
            .unwrap()
    };
    assert_eq!(label_of("Quarterly"), SentimentLabel::Positive);
    assert_eq!(label_of("Recession"), SentimentLabel::Negative);
    assert_eq!(label_of("The board"), SentimentLabel::Neutral);
}

#[tokio::test]
async fn noisy_labels_are_normalized_before_upload() {
    let (retriever, store) = retriever();
    let csv = write_csv(
        "id,news_text,sentiment_label\n\
         1,Shares rallied,POSITIVE\n\
         2,Costs increased sharply,Negative.\n\
         3,Results were in line,\n\
         4,Output was steady,unknown\n",
    );

    let report = retriever.build_index(csv.path()).await.unwrap();
    assert_eq!(report.layout, CorpusLayout::Detected);
    assert_eq!(
        report.distribution,
        vec![
            (SentimentLabel::Positive, 1),
            (SentimentLabel::Neutral, 2),
            (SentimentLabel::Negative, 1),
        ]
    );
    assert_eq!(store.count(COLLECTION).await.unwrap(), 4);
}

#[tokio::test]
async fn blank_text_rows_are_skipped() {
    let (retriever, store) = retriever();
    let csv = write_csv("text,label\nSales rose,positive\n   ,negative\n,neutral\n");

    let report = retriever.build_index(csv.path()).await.unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(store.count(COLLECTION).await.unwrap(), 1);
}

#[tokio::test]
async fn missing_text_column_is_fatal() {
    let (retriever, _store) = retriever();
    let csv = write_csv("id,sentiment\n1,positive\n");

    let err = retriever.build_index(csv.path()).await.unwrap_err();
    match err {
        RetrievalError::NoTextColumn { columns, .. } => {
            assert_eq!(columns, vec!["id".to_string(), "sentiment".to_string()]);
        }
        other => panic!("expected NoTextColumn, got {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_corpus_is_fatal() {
    let (retriever, _store) = retriever();
    let err = retriever
        .build_index(std::path::Path::new("/nonexistent/finrag/corpus.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Corpus { .. }));
}

#[tokio::test]
async fn embedding_failure_aborts_the_rebuild() {
    let store = Arc::new(MemoryIndex::new());
    let retriever = Retriever::new(Arc::new(FailingEmbedder), Arc::clone(&store), COLLECTION);
    let csv = write_csv(PHRASEBANK);

    let err = retriever.build_index(csv.path()).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Tei(_)));
}

#[tokio::test]
async fn query_embedding_failure_is_an_error_not_an_empty_result() {
    let store = Arc::new(MemoryIndex::new());
    let retriever = Retriever::new(Arc::new(FailingEmbedder), store, COLLECTION);
    assert!(retriever.search("anything", 3).await.is_err());
}

#[tokio::test]
async fn status_reports_collection_and_points() {
    let (retriever, _store) = retriever();
    let before = retriever.status().await.unwrap();
    assert!(!before.collection_exists);
    assert_eq!(before.points, None);

    let csv = write_csv(PHRASEBANK);
    retriever.build_index(csv.path()).await.unwrap();

    let after = retriever.status().await.unwrap();
    assert!(after.collection_exists);
    assert_eq!(after.collections, vec![COLLECTION.to_string()]);
    assert_eq!(after.points, Some(4));
}
