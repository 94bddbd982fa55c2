use analytics_bindings::{
    ClientError, DryRunResponse, ExecutionEnvironment, LoadOptions, Metadata, Query, RemoteClient,
    ResultSet, SqlQuery,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// How a scripted call fails.
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub enum Failure {
    Message(String),
    Panic(String),
}

/// In-memory remote client with call counters and per-call gates.
///
/// `load` answers `{"call": n, "query": <query>}` where `n` is the 1-based call
/// number, so tests can tell which request a settled value came from.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockClient {
    loads: AtomicUsize,
    metas: AtomicUsize,
    sqls: AtomicUsize,
    dry_runs: AtomicUsize,
    meta: Mutex<Metadata>,
    load_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    load_failures: Mutex<VecDeque<Option<Failure>>>,
    failure: Mutex<Option<Failure>>,
}

#[allow(dead_code)]
impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_meta(meta: Metadata) -> Arc<Self> {
        let client = Self::default();
        *client.meta.lock() = meta;
        Arc::new(client)
    }

    pub fn as_remote(self: &Arc<Self>) -> Arc<dyn RemoteClient> {
        Arc::clone(self) as Arc<dyn RemoteClient>
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn metas(&self) -> usize {
        self.metas.load(Ordering::SeqCst)
    }

    pub fn sqls(&self) -> usize {
        self.sqls.load(Ordering::SeqCst)
    }

    pub fn dry_runs(&self) -> usize {
        self.dry_runs.load(Ordering::SeqCst)
    }

    /// Hold the next un-gated `load` call until the returned sender fires (or drops).
    pub fn gate_next_load(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.load_gates.lock().push_back(rx);
        tx
    }

    /// Script the outcome of upcoming `load` calls in order; `None` succeeds.
    pub fn script_loads(&self, outcomes: impl IntoIterator<Item = Option<Failure>>) {
        self.load_failures.lock().extend(outcomes);
    }

    /// Fail every call until cleared.
    pub fn fail_all(&self, failure: Option<Failure>) {
        *self.failure.lock() = failure;
    }

    fn outcome(&self, scripted: Option<Failure>) -> Result<(), ClientError> {
        match scripted.or_else(|| self.failure.lock().clone()) {
            None => Ok(()),
            Some(Failure::Message(msg)) => Err(msg.into()),
            Some(Failure::Panic(msg)) => panic!("{msg}"),
        }
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn load(&self, query: &Query, _options: &LoadOptions) -> Result<ResultSet, ClientError> {
        let call = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self.load_gates.lock().pop_front();
        let scripted = self.load_failures.lock().pop_front().flatten();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.outcome(scripted)?;
        Ok(ResultSet::new(json!({ "call": call, "query": query })))
    }

    async fn meta(&self) -> Result<Metadata, ClientError> {
        self.metas.fetch_add(1, Ordering::SeqCst);
        self.outcome(None)?;
        Ok(self.meta.lock().clone())
    }

    async fn sql(&self, query: &Query) -> Result<SqlQuery, ClientError> {
        self.sqls.fetch_add(1, Ordering::SeqCst);
        self.outcome(None)?;
        Ok(SqlQuery::new(
            format!("SELECT {}", query.members().join(", ")),
            Vec::new(),
        ))
    }

    async fn dry_run(&self, query: &Query) -> Result<DryRunResponse, ClientError> {
        self.dry_runs.fetch_add(1, Ordering::SeqCst);
        self.outcome(None)?;
        Ok(DryRunResponse {
            query_type: Some("regularQuery".into()),
            normalized_queries: vec![query.clone()],
            ..DryRunResponse::default()
        })
    }
}

/// Client-side environment, so auto-run gating does not depend on process env.
#[allow(dead_code)]
pub fn client_env() -> Arc<ExecutionEnvironment> {
    Arc::new(ExecutionEnvironment::Client)
}

#[allow(dead_code)]
pub fn orders_count() -> Query {
    Query::new().with_measures(["Orders.count"])
}

/// Yield to spawned tasks until `cond` holds. Panics after a bounded number of rounds.
#[allow(dead_code)]
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Let every runnable task make progress.
#[allow(dead_code)]
pub async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct EnvGuard {
    key: String,
    prev: Option<String>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn set(key: &str, val: impl AsRef<str>) -> Self {
        let prev = std::env::var(key).ok();
        unsafe { std::env::set_var(key, val.as_ref()) };
        Self {
            key: key.to_string(),
            prev,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => unsafe { std::env::set_var(&self.key, v) },
            None => unsafe { std::env::remove_var(&self.key) },
        }
    }
}
