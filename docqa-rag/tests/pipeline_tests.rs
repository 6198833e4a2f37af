//! End-to-end pipeline tests against deterministic in-process services.

use std::sync::Arc;
use std::time::Duration;

use docqa_rag::testing::{
    BagOfWordsEmbedder, FailingEmbedder, FailingInference, GroundedInference, RecordingInference,
};
use docqa_rag::{
    Document, ErrorKind, IndexStatus, NO_CONTEXT_ANSWER, QaPipeline, RagConfig, RagError, Stage,
};

const CAPITALS: &str = "Paris is the capital of France.\nBerlin is the capital of Germany.";

fn config() -> RagConfig {
    RagConfig::builder().chunk_size(40).chunk_overlap(0).top_k(1).build().unwrap()
}

fn pipeline(embedder: Arc<BagOfWordsEmbedder>, llm: Arc<GroundedInference>) -> Arc<QaPipeline> {
    Arc::new(
        QaPipeline::builder()
            .config(config())
            .embedding_provider(embedder)
            .answer_inference(llm)
            .summary_inference(Arc::new(RecordingInference::replying("Two capitals.")))
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn answers_from_the_most_relevant_segment() {
    let llm = Arc::new(GroundedInference::new());
    let pipeline = pipeline(Arc::new(BagOfWordsEmbedder::new(128)), llm.clone());
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();

    let answer = session.ask("What is the capital of France?", None).await.unwrap();

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].segment.offset, 0);
    assert!(answer.sources[0].segment.text.starts_with("Paris"));
    assert!(answer.text.contains("Paris"), "answer: {}", answer.text);
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn empty_document_answers_without_calling_the_model() {
    let embedder = Arc::new(BagOfWordsEmbedder::new(16));
    let llm = Arc::new(GroundedInference::new());
    let pipeline = pipeline(embedder.clone(), llm.clone());
    let session = pipeline.open(Document::new("")).unwrap();

    let answer = session.ask("Anything?", None).await.unwrap();

    assert_eq!(answer.text, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(embedder.calls(), 0);
    assert_eq!(llm.calls(), 0);
    assert_eq!(session.index_status(), IndexStatus::Ready { segments: 0, dimensions: 0 });
}

#[tokio::test]
async fn top_k_larger_than_index_is_clamped() {
    let pipeline = pipeline(Arc::new(BagOfWordsEmbedder::new(64)), Arc::new(GroundedInference::new()));
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();
    let answer = session.ask("capital", Some(10)).await.unwrap();
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn summary_runs_alongside_the_index_build() {
    let embedder = Arc::new(BagOfWordsEmbedder::new(32).with_delay(Duration::from_millis(200)));
    let pipeline = pipeline(embedder.clone(), Arc::new(GroundedInference::new()));
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();

    let (summary, index) = session.summarize_and_index().await;

    assert_eq!(summary.unwrap(), "Two capitals.");
    assert_eq!(index.unwrap().len(), 2);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn summary_does_not_build_the_index() {
    let embedder = Arc::new(BagOfWordsEmbedder::new(32));
    let pipeline = pipeline(embedder.clone(), Arc::new(GroundedInference::new()));
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();

    session.summarize().await.unwrap();

    assert_eq!(embedder.calls(), 0);
    assert_eq!(session.index_status(), IndexStatus::Unbuilt);
}

#[tokio::test]
async fn embedding_outage_is_a_retryable_service_error() {
    let pipeline = Arc::new(
        QaPipeline::builder()
            .config(config())
            .embedding_provider(Arc::new(FailingEmbedder::unreachable()))
            .answer_inference(Arc::new(GroundedInference::new()))
            .build()
            .unwrap(),
    );
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();

    let err = session.ask("What is the capital of France?", None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EmbeddingService);
    assert_eq!(err.stage(), Some(Stage::Embed));
    assert!(err.is_retryable());
    assert!(matches!(session.index_status(), IndexStatus::Failed(_)));
}

#[tokio::test]
async fn inconsistent_embeddings_fail_the_build() {
    let pipeline = Arc::new(
        QaPipeline::builder()
            .config(config())
            .embedding_provider(Arc::new(FailingEmbedder::short_batches()))
            .answer_inference(Arc::new(GroundedInference::new()))
            .build()
            .unwrap(),
    );
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();
    let err = session.build_index().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Embed));
}

#[tokio::test]
async fn inference_failure_surfaces_at_synthesis() {
    let pipeline = Arc::new(
        QaPipeline::builder()
            .config(config())
            .embedding_provider(Arc::new(BagOfWordsEmbedder::new(32)))
            .answer_inference(Arc::new(FailingInference::new()))
            .build()
            .unwrap(),
    );
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();

    let err = session.ask("What is the capital of Germany?", None).await.unwrap_err();

    assert!(matches!(err, RagError::InferenceService { stage: Stage::Synthesize, .. }));
    // The index itself was fine and stays usable.
    assert!(matches!(session.index_status(), IndexStatus::Ready { .. }));
}

#[tokio::test]
async fn oversized_question_is_rejected() {
    let pipeline = Arc::new(
        QaPipeline::builder()
            .config(RagConfig::builder().max_question_chars(10).build().unwrap())
            .embedding_provider(Arc::new(BagOfWordsEmbedder::new(8)))
            .answer_inference(Arc::new(GroundedInference::new()))
            .build()
            .unwrap(),
    );
    let session = pipeline.open(Document::new(CAPITALS)).unwrap();
    let err = session.ask("a question that is far too long", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn paragraph_larger_than_the_context_limit_still_grounds_the_answer() {
    let llm = Arc::new(GroundedInference::new());
    let pipeline = Arc::new(
        QaPipeline::builder()
            .config(
                RagConfig::builder()
                    .chunk_size(100)
                    .chunk_overlap(0)
                    .max_context_chars(500)
                    .build()
                    .unwrap(),
            )
            .embedding_provider(Arc::new(BagOfWordsEmbedder::new(64)))
            .answer_inference(llm.clone())
            .build()
            .unwrap(),
    );
    let session = pipeline.open(Document::new("tide ".repeat(260))).unwrap();

    let answer = session.ask("When is the tide?", None).await.unwrap();

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].segment.offset, 0);
    assert!(answer.sources[0].segment.text.chars().count() < 500);
    assert!(answer.text.starts_with("According to the document: tide"), "answer: {}", answer.text);
    assert_eq!(llm.calls(), 1);
}
