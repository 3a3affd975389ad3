use std::{sync::Arc, time::Duration};

use ai_llm_service::testing::{Script, ScriptedEngine};
use api::{AppState, router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use contextor::{ContextorConfig, QueryService};
use rag_store::testing::{HashingEmbedder, InMemoryVectorStore};
use rag_store::{RagConfig, RagStore, batch_progress_bar, parse_ndjson};
use serde_json::{Value, json};
use tower::ServiceExt;

const DIM: usize = 256;

const DATASET: &str = r#"{"text": "Quantum computing uses qubits and quantum mechanics", "category": "technology", "source": "quantum_primer"}
{"text": "Noise cancelling headphones block ambient sound", "category": "electronics", "source": "audio_guide"}
{"text": "Smartwatches track heart rate and sleep", "category": "electronics", "source": "wearables_review"}
"#;

struct Harness {
    app: Router,
    mem: Arc<InMemoryVectorStore>,
    engine: Arc<ScriptedEngine>,
}

async fn harness_with(store: Arc<InMemoryVectorStore>, script: Script) -> Harness {
    let mut cfg = RagConfig::new_default("http://localhost:6334", "knowledge_base");
    cfg.embedding_dim = DIM;
    let rag = RagStore::with_store(cfg, store.clone(), Arc::new(HashingEmbedder::new(DIM)))
        .expect("store");
    let docs = parse_ndjson(DATASET.as_bytes()).documents;
    rag.rebuild(&docs, &batch_progress_bar(1, false))
        .await
        .expect("rebuild");

    let engine = Arc::new(ScriptedEngine::new(script));
    let service =
        QueryService::new(rag, engine.clone(), ContextorConfig::default()).expect("service");
    Harness {
        app: router(AppState::new(service, "RAG API")),
        mem: store,
        engine,
    }
}

async fn harness(script: Script) -> Harness {
    harness_with(Arc::new(InMemoryVectorStore::new()), script).await
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn root_lists_three_endpoints() {
    let h = harness(Script::Hang).await;
    let res = h
        .app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["name"], "RAG API");
    assert_eq!(v["endpoints"].as_array().map(Vec::len), Some(3));
    assert_eq!(v["endpoints"][0]["method"], "POST");
    assert!(v["version"].is_string());
}

#[tokio::test]
async fn retrieve_ranks_quantum_record_first() {
    let h = harness(Script::Hang).await;
    let res = h
        .app
        .oneshot(post_json("/retrieve", json!({"query": "quantum"})))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["query"], "quantum");
    let results = v["results"].as_array().expect("results");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["source"], "quantum_primer");
    let top = results[0]["score"].as_f64().expect("score");
    assert!(results.iter().all(|r| r["score"].as_f64().unwrap_or(f64::MAX) <= top));
}

#[tokio::test]
async fn empty_query_is_400_without_search() {
    let h = harness(Script::Hang).await;
    let res = h
        .app
        .oneshot(post_json("/retrieve", json!({"query": ""})))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert_eq!(v["code"], "BAD_REQUEST");
    assert!(v["error"].is_string());
    assert_eq!(h.mem.searches(), 0);
}

#[tokio::test]
async fn missing_query_and_invalid_json_are_400() {
    let h = harness(Script::Hang).await;

    let res = h
        .app
        .clone()
        .oneshot(post_json("/generate", json!({"max_tokens": 10})))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let bad = Request::post("/rag")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let res = h.app.oneshot(bad).await.expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn generate_collapses_hyphen_runs() {
    let h = harness(Script::Fragments(vec![
        "Result:\n".into(),
        "-".repeat(15),
        "\ndone".into(),
    ]))
    .await;
    let res = h
        .app
        .oneshot(post_json("/generate", json!({"query": "table please", "stream": false})))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["answer"], format!("Result:\n{}\ndone", "-".repeat(10)));
    assert_eq!(v["model"], "scripted-model");
    assert_eq!(v["query"], "table please");
}

#[tokio::test]
async fn generate_stream_emits_ndjson_fragments() {
    let h = harness(Script::Fragments(vec!["Hello".into(), ", ".into(), "world".into()])).await;
    let res = h
        .app
        .oneshot(post_json("/generate", json!({"query": "greet", "stream": true})))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/x-ndjson")
    );
    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let lines: Vec<Value> = std::str::from_utf8(&bytes)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("line json"))
        .collect();
    assert_eq!(
        lines,
        vec![
            json!({"text": "Hello"}),
            json!({"text": ", "}),
            json!({"text": "world"})
        ]
    );
}

#[tokio::test]
async fn stream_failure_ends_with_error_line() {
    let h = harness(Script::FailMidway(vec!["partial".into()], "engine crashed".into())).await;
    let res = h
        .app
        .oneshot(post_json("/generate", json!({"query": "q", "stream": true})))
        .await
        .expect("response");

    let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
    let text = String::from_utf8_lossy(&bytes);
    let last: Value = serde_json::from_str(text.lines().last().expect("line")).expect("json");
    assert!(last["error"].as_str().unwrap_or_default().contains("engine crashed"));
}

#[tokio::test]
async fn rag_contexts_follow_include_context() {
    let h = harness(Script::Fragments(vec!["Qubits.".into()])).await;

    let res = h
        .app
        .clone()
        .oneshot(post_json("/rag", json!({"query": "quantum", "top_k": 2})))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert!(v.get("contexts").is_none());
    assert_eq!(v["used_context"], true);
    assert_eq!(v["context_count"], 2);

    let res = h
        .app
        .oneshot(post_json(
            "/rag",
            json!({"query": "quantum", "top_k": 2, "include_context": true}),
        ))
        .await
        .expect("response");
    let v = body_json(res).await;
    assert_eq!(v["contexts"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["context_count"], 2);
    assert_eq!(v["contexts"][0]["source"], "quantum_primer");
}

#[tokio::test]
async fn rag_search_failure_is_500() {
    let h = harness_with(Arc::new(InMemoryVectorStore::failing_search()), Script::Hang).await;
    let res = h
        .app
        .oneshot(post_json("/rag", json!({"query": "quantum"})))
        .await
        .expect("response");

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let v = body_json(res).await;
    assert_eq!(v["code"], "RETRIEVAL_FAILED");
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn client_disconnect_aborts_generation() {
    let h = harness(Script::Hang).await;
    let app = h.app.clone();
    let task = tokio::spawn(async move {
        app.oneshot(post_json("/generate", json!({"query": "slow", "stream": false})))
            .await
    });

    for _ in 0..100 {
        if !h.engine.calls().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    task.abort();

    let mut aborted = Vec::new();
    for _ in 0..100 {
        aborted = h.engine.aborted();
        if !aborted.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let calls = h.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(aborted, vec![calls[0].request_id.clone()]);
    assert!(task.await.is_err_and(|e| e.is_cancelled()));
}

#[tokio::test]
async fn dropped_stream_body_aborts_generation() {
    let h = harness(Script::Hang).await;
    let res = h
        .app
        .clone()
        .oneshot(post_json("/generate", json!({"query": "slow", "stream": true})))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    drop(res);

    let mut aborted = Vec::new();
    for _ in 0..100 {
        aborted = h.engine.aborted();
        if !aborted.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let calls = h.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(aborted, vec![calls[0].request_id.clone()]);
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let h = harness(Script::Hang).await;

    let req = Request::get("/")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .expect("request");
    let res = h.app.clone().oneshot(req).await.expect("response");
    assert_eq!(
        res.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );

    let res = h
        .app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(id.starts_with("req-"));
}

#[tokio::test]
async fn health_is_ok_with_reachable_store() {
    let h = harness(Script::Hang).await;
    let res = h
        .app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["ok"], true);
}
