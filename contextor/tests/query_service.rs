use std::{sync::Arc, time::Duration};

use ai_llm_service::testing::{Script, ScriptedEngine};
use contextor::{
    ContextorConfig, ContextorError, GenerateRequest, QueryService, RagRequest, StreamEvent,
};
use rag_store::testing::{HashingEmbedder, InMemoryVectorStore};
use rag_store::{Document, RagConfig, RagStore, batch_progress_bar};
use tokio_util::sync::CancellationToken;

const DIM: usize = 256;

struct Fixture {
    mem: Arc<InMemoryVectorStore>,
    embedder: Arc<HashingEmbedder>,
    engine: Arc<ScriptedEngine>,
    service: QueryService,
}

async fn fixture(script: Script) -> Fixture {
    let mut cfg = RagConfig::new_default("http://localhost:6334", "knowledge_base");
    cfg.embedding_dim = DIM;
    let mem = Arc::new(InMemoryVectorStore::new());
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let store = RagStore::with_store(cfg, mem.clone(), embedder.clone()).expect("store");

    let docs = vec![
        Document::new(
            "Quantum computing uses qubits and quantum mechanics",
            "technology",
            "quantum_primer",
        ),
        Document::new(
            "Headphones with noise cancellation block ambient sound",
            "electronics",
            "audio_guide",
        ),
        Document::new(
            "Laptops with long battery life suit frequent travel",
            "electronics",
            "laptop_guide",
        ),
    ];
    store
        .rebuild(&docs, &batch_progress_bar(1, false))
        .await
        .expect("rebuild");

    let engine = Arc::new(ScriptedEngine::new(script));
    let service =
        QueryService::new(store, engine.clone(), ContextorConfig::default()).expect("service");
    Fixture {
        mem,
        embedder,
        engine,
        service,
    }
}

fn rag_request(query: &str, top_k: u64, include_context: bool) -> RagRequest {
    RagRequest {
        generation: GenerateRequest::new(query),
        top_k: Some(top_k),
        include_context,
    }
}

async fn wait_for_abort(engine: &ScriptedEngine) -> Vec<String> {
    for _ in 0..100 {
        let aborted = engine.aborted();
        if !aborted.is_empty() {
            return aborted;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    engine.aborted()
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_upstream_call() {
    let f = fixture(Script::Fragments(vec!["x".into()])).await;
    let embeds_before = f.embedder.calls();

    let res = f.service.retrieve("   ", Some(3)).await;
    assert!(matches!(res, Err(ContextorError::InvalidRequest(_))));
    let res = f.service.rag(rag_request("", 3, false)).await;
    assert!(matches!(res, Err(ContextorError::InvalidRequest(_))));

    assert_eq!(f.embedder.calls(), embeds_before);
    assert_eq!(f.mem.searches(), 0);
    assert!(f.engine.calls().is_empty());
}

#[tokio::test]
async fn retrieve_echoes_query_and_orders_by_score() {
    let f = fixture(Script::Fragments(vec!["x".into()])).await;
    let answer = f.service.retrieve("quantum", None).await.expect("retrieve");

    assert_eq!(answer.query, "quantum");
    assert_eq!(answer.results.len(), 3);
    assert_eq!(answer.results[0].source, "quantum_primer");
    assert!(
        answer
            .results
            .windows(2)
            .all(|w| w[0].score >= w[1].score)
    );
}

#[tokio::test]
async fn top_k_outside_bounds_is_invalid() {
    let f = fixture(Script::Fragments(vec!["x".into()])).await;
    assert!(matches!(
        f.service.retrieve("quantum", Some(0)).await,
        Err(ContextorError::InvalidRequest(_))
    ));
    assert!(matches!(
        f.service.retrieve("quantum", Some(51)).await,
        Err(ContextorError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn buffered_answer_collapses_long_hyphen_runs() {
    let dashes = "-".repeat(15);
    let f = fixture(Script::Fragments(vec![
        "Title\n".into(),
        dashes,
        "\nBody text".into(),
    ]))
    .await;

    let answer = f
        .service
        .generate(GenerateRequest::new("Explain"))
        .await
        .expect("answer");

    assert_eq!(answer.answer, format!("Title\n{}\nBody text", "-".repeat(10)));
    assert_eq!(answer.model, "scripted-model");
    assert_eq!(answer.query, "Explain");

    let calls = f.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].prompt,
        "You are a helpful AI assistant.\n\nUser: Explain\n\nAssistant:"
    );
    assert!(calls[0].request_id.starts_with("req-"));
}

#[tokio::test]
async fn invalid_sampling_is_rejected() {
    let f = fixture(Script::Fragments(vec!["x".into()])).await;
    let mut req = GenerateRequest::new("hi");
    req.sampling.temperature = 3.5;
    assert!(matches!(
        f.service.generate(req).await,
        Err(ContextorError::InvalidRequest(_))
    ));
    assert!(f.engine.calls().is_empty());
}

#[tokio::test]
async fn rag_omits_contexts_unless_requested() {
    let f = fixture(Script::Fragments(vec!["ok".into()])).await;

    let without = f
        .service
        .rag(rag_request("quantum", 2, false))
        .await
        .expect("rag");
    assert!(without.contexts.is_none());
    assert!(without.used_context);
    assert_eq!(without.context_count, 2);
    let json = serde_json::to_value(&without).expect("json");
    assert!(json.get("contexts").is_none());

    let with = f
        .service
        .rag(rag_request("quantum", 2, true))
        .await
        .expect("rag");
    let contexts = with.contexts.expect("contexts");
    assert_eq!(contexts.len(), 2);
    assert_eq!(with.context_count, 2);

    let prompt = &f.engine.calls()[1].prompt;
    assert!(prompt.contains("Source: quantum_primer\nQuantum computing"));
    assert!(prompt.contains("User: quantum"));
}

#[tokio::test]
async fn retrieval_failure_surfaces_without_generation() {
    let cfg = RagConfig::new_default("http://localhost:6334", "knowledge_base");
    let store = RagStore::with_store(
        cfg,
        Arc::new(InMemoryVectorStore::failing_search()),
        Arc::new(HashingEmbedder::new(384)),
    )
    .expect("store");
    let engine = Arc::new(ScriptedEngine::replying(&["never"]));
    let service =
        QueryService::new(store, engine.clone(), ContextorConfig::default()).expect("service");

    let res = service.rag(rag_request("quantum", 3, false)).await;
    assert!(matches!(res, Err(ContextorError::Rag(_))));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn cancelled_generation_aborts_engine_and_reports_client_closed() {
    let f = fixture(Script::Hang).await;
    let cancel = CancellationToken::new();

    let task = {
        let service = f.service.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            service
                .generate_with_cancel(GenerateRequest::new("long answer"), cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    let res = task.await.expect("join");
    assert!(matches!(res, Err(ContextorError::ClientClosed)));

    let calls = f.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(f.engine.aborted(), vec![calls[0].request_id.clone()]);
    assert_eq!(f.engine.in_flight(), 0);
}

#[tokio::test]
async fn cancelled_rag_reports_client_closed_after_retrieval() {
    let f = fixture(Script::Hang).await;
    let cancel = CancellationToken::new();

    let task = {
        let service = f.service.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            service
                .rag_with_cancel(rag_request("quantum", 2, true), cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    let res = task.await.expect("join");
    assert!(matches!(res, Err(ContextorError::ClientClosed)));
    assert_eq!(f.mem.searches(), 1);

    let calls = f.engine.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("Source: quantum_primer"));
    assert_eq!(f.engine.aborted(), vec![calls[0].request_id.clone()]);
    assert_eq!(f.engine.in_flight(), 0);
}

#[tokio::test]
async fn dropping_buffered_request_aborts_engine() {
    let f = fixture(Script::Hang).await;

    let task = {
        let service = f.service.clone();
        tokio::spawn(async move { service.generate(GenerateRequest::new("slow")).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    task.abort();

    let aborted = wait_for_abort(&f.engine).await;
    assert_eq!(aborted, vec![f.engine.calls()[0].request_id.clone()]);
}

#[tokio::test]
async fn streamed_rag_delivers_fragments_in_order() {
    let f = fixture(Script::Fragments(vec!["Qubits ".into(), "are ".into(), "neat".into()])).await;
    let mut rx = f
        .service
        .rag_stream(rag_request("quantum", 1, false))
        .await
        .expect("stream");

    let mut text = String::new();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Fragment(s) => text.push_str(&s),
            StreamEvent::Failed(e) => panic!("unexpected failure: {e}"),
        }
    }
    assert_eq!(text, "Qubits are neat");
}

#[tokio::test]
async fn stream_start_failure_is_returned_before_streaming() {
    let f = fixture(Script::FailToStart("no capacity".into())).await;
    let res = f.service.generate_stream(GenerateRequest::new("hi")).await;
    assert!(matches!(res, Err(ContextorError::Generation(_))));
}

#[tokio::test]
async fn health_reports_vector_store_count() {
    let f = fixture(Script::Hang).await;
    let report = f.service.health().await;
    assert!(report.ok);
    assert_eq!(report.components.len(), 1);
    assert_eq!(report.components[0].component, "vector-store");
    assert!(report.components[0].message.contains("3 points"));
}
