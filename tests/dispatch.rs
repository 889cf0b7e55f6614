//! Fan-out / fan-in behavior of the dispatcher against scripted clients.
//!
//! All tests run on a paused clock, so simulated latency costs no wall time.

use async_trait::async_trait;
use prompt_fanout::batch::{run_batch, BatchGenerator, DispatchConfig, Dispatcher, Prompts};
use prompt_fanout::client::{ClientError, EmulatedClient, PromptClient};
use prompt_fanout::types::{Record, RequestId, SequentialIdGenerator};
use prompt_fanout::Error;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Per-prompt script: how long to take and whether to fail.
#[derive(Clone, Copy)]
enum Step {
    Reply(u64),
    Fail(u64),
    Panic,
}

/// Echoes the prompt back, following a script keyed by prompt text.
struct ScriptedClient {
    script: HashMap<String, Step>,
    calls: AtomicUsize,
    finished: AtomicUsize,
}

impl ScriptedClient {
    fn new(script: &[(&str, Step)]) -> Self {
        Self {
            script: script.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PromptClient for ScriptedClient {
    async fn send_request(&self, id: RequestId, text: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.get(text).copied().unwrap_or(Step::Reply(0));
        let outcome = match step {
            Step::Reply(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(format!("echo:{text}"))
            }
            Step::Fail(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Err(ClientError::transport(id, format!("backend rejected {text}")))
            }
            Step::Panic => panic!("scripted panic for {text}"),
        };
        self.finished.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn prompts(texts: &[&str]) -> (Prompts, HashMap<String, RequestId>) {
    let records: Vec<Record> = texts.iter().map(|t| Record::new().with("t", *t)).collect();
    let requests = BatchGenerator::with_id_generator(Arc::new(SequentialIdGenerator::new()))
        .render_requests("{{t}}", &records)
        .unwrap();
    let by_text = requests.iter().map(|r| (r.prompt.clone(), r.id)).collect();
    let prompts = requests.into_iter().map(|r| (r.id, r.prompt)).collect();
    (prompts, by_text)
}

#[tokio::test(start_paused = true)]
async fn test_responses_pair_with_their_request_ids() {
    // Later prompts finish first.
    let (requests, _) = prompts(&["slow", "medium", "fast"]);
    let client = Arc::new(ScriptedClient::new(&[
        ("slow", Step::Reply(300)),
        ("medium", Step::Reply(200)),
        ("fast", Step::Reply(100)),
    ]));

    let responses = assert_ok!(Dispatcher::new().dispatch(&requests, client.clone()).await);

    let sent: HashSet<_> = requests.keys().collect();
    let got: HashSet<_> = responses.keys().collect();
    assert_eq!(sent, got);
    for (id, text) in &requests {
        assert_eq!(responses[id], format!("echo:{text}"));
    }
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_requests_run_concurrently() {
    let texts: Vec<String> = (0..50).map(|i| format!("p{i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let (requests, _) = prompts(&refs);
    let script: Vec<(&str, Step)> = refs.iter().map(|t| (*t, Step::Reply(500))).collect();
    let client = Arc::new(ScriptedClient::new(&script));

    let start = tokio::time::Instant::now();
    let responses = assert_ok!(Dispatcher::new().dispatch(&requests, client).await);
    let elapsed = start.elapsed();

    assert_eq!(responses.len(), 50);
    // Sequential execution would take 25s.
    assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_starts_nothing() {
    let client = Arc::new(ScriptedClient::new(&[]));
    let responses = assert_ok!(Dispatcher::new().dispatch(&Prompts::new(), client.clone()).await);
    assert!(responses.is_empty());

    let settled = Dispatcher::new()
        .dispatch_settled(&Prompts::new(), client.clone())
        .await;
    assert!(settled.is_empty());
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_cancels_outstanding_requests() {
    let (requests, ids) = prompts(&["quick", "broken", "straggler"]);
    let client = Arc::new(ScriptedClient::new(&[
        ("quick", Step::Reply(10)),
        ("broken", Step::Fail(50)),
        ("straggler", Step::Reply(5_000)),
    ]));

    let err = assert_err!(Dispatcher::new().dispatch(&requests, client.clone()).await);

    assert_eq!(err.failed, ids["broken"]);
    assert!(matches!(err.source, ClientError::Transport { .. }));
    assert_eq!(err.completed, vec![ids["quick"]]);
    assert_eq!(err.cancelled, vec![ids["straggler"]]);
    assert!(err.also_failed.is_empty());
    assert_eq!(err.total(), requests.len());

    // The straggler was aborted mid-sleep and never finished.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.finished.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_reports_simultaneous_failures() {
    let (requests, ids) = prompts(&["a", "b"]);
    let client = Arc::new(ScriptedClient::new(&[("a", Step::Fail(20)), ("b", Step::Fail(20))]));

    let err = assert_err!(Dispatcher::new().dispatch(&requests, client).await);

    let mut seen = vec![err.failed];
    seen.extend(err.also_failed.iter().copied());
    seen.extend(err.cancelled.iter().copied());
    seen.sort();
    let mut expected = vec![ids["a"], ids["b"]];
    expected.sort();
    assert_eq!(seen, expected);
    assert!(err.completed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_settled_reports_every_outcome() {
    let (requests, ids) = prompts(&["ok", "bad", "late"]);
    let client = Arc::new(ScriptedClient::new(&[
        ("ok", Step::Reply(10)),
        ("bad", Step::Fail(5)),
        ("late", Step::Reply(2_000)),
    ]));

    let settled = Dispatcher::new().dispatch_settled(&requests, client.clone()).await;

    assert_eq!(settled.len(), 3);
    assert_eq!(settled[&ids["ok"]].as_deref().ok(), Some("echo:ok"));
    assert_eq!(settled[&ids["late"]].as_deref().ok(), Some("echo:late"));
    let failure = settled[&ids["bad"]].as_ref().unwrap_err();
    assert_eq!(failure.id(), ids["bad"]);
    assert_eq!(client.finished.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout() {
    let (requests, ids) = prompts(&["hangs", "snappy"]);
    let client = Arc::new(ScriptedClient::new(&[
        ("hangs", Step::Reply(10_000)),
        ("snappy", Step::Reply(10)),
    ]));
    let dispatcher = Dispatcher::with_config(
        DispatchConfig::new().with_request_timeout(Duration::from_millis(100)),
    );

    let settled = dispatcher.dispatch_settled(&requests, client.clone()).await;
    assert!(settled[&ids["snappy"]].is_ok());
    match &settled[&ids["hangs"]] {
        Err(ClientError::Timeout { id, after }) => {
            assert_eq!(*id, ids["hangs"]);
            assert_eq!(*after, Duration::from_millis(100));
        }
        other => panic!("expected timeout, got {other:?}"),
    }

    let err = assert_err!(dispatcher.dispatch(&requests, client).await);
    assert_eq!(err.failed, ids["hangs"]);
    assert!(matches!(err.source, ClientError::Timeout { .. }));
    assert_eq!(err.completed, vec![ids["snappy"]]);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_client_is_contained() {
    let (requests, ids) = prompts(&["explodes", "fine"]);
    let client = Arc::new(ScriptedClient::new(&[
        ("explodes", Step::Panic),
        ("fine", Step::Reply(10)),
    ]));

    let settled = Dispatcher::new().dispatch_settled(&requests, client).await;
    assert!(settled[&ids["fine"]].is_ok());
    match &settled[&ids["explodes"]] {
        Err(ClientError::Panicked { message, .. }) => {
            assert!(message.contains("scripted panic for explodes"))
        }
        other => panic!("expected panic outcome, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_through_trait_object() {
    let (requests, _) = prompts(&["x", "y"]);
    let client: Arc<dyn PromptClient> = Arc::new(ScriptedClient::new(&[]));
    let responses = assert_ok!(prompt_fanout::batch::dispatch(&requests, client).await);
    assert_eq!(responses.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_batch_with_emulated_client() {
    let records = vec![
        Record::new().with("name", "Alice"),
        Record::new().with("name", "Bob"),
        Record::new().with("name", "Charlie"),
    ];
    let client = Arc::new(EmulatedClient::with_seed(11));

    let results = assert_ok!(run_batch("Hi {{name}}", &records, client.clone()).await);

    let prompts: Vec<&str> = results.iter().map(|r| r.prompt.as_str()).collect();
    assert_eq!(prompts, vec!["Hi Alice", "Hi Bob", "Hi Charlie"]);
    assert!(results
        .iter()
        .all(|r| (50..=1000).contains(&r.response.len())));
    assert_eq!(client.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_surfaces_render_errors_before_dispatch() {
    let client = Arc::new(ScriptedClient::new(&[]));
    let generator = BatchGenerator::new().strict(true);
    let records = vec![Record::new()];

    let err = Dispatcher::new()
        .run(&generator, "{{missing}}", &records, client.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Render(_)));
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}
