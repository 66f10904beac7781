#![allow(dead_code)]

//! Shared controllers, caches and tracing setup for the integration tests.

use anyhow::{anyhow, Result};
use mvc_dispatch::cache::{Fingerprint, MemoryCache, ResponseCache};
use mvc_dispatch::controller::{ActionContext, ActionOutcome, Controller};
use mvc_dispatch::router::ParamVec;
use mvc_dispatch::{BackendError, HandlerRegistry, Request, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Route lifecycle and dispatcher log output through the test harness.
pub fn init_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("mvc_dispatch=debug"))
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Log output captured in memory, for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Capture this thread's `warn` and above events until the guard drops.
pub fn capture_warnings() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn record(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

/// `admin/users`: records every lifecycle step it goes through.
pub struct Users {
    log: EventLog,
}

impl Controller for Users {
    fn before(&mut self, cx: &mut ActionContext<'_>) -> Result<()> {
        record(&self.log, format!("before {}", cx.request().action));
        Ok(())
    }

    fn action(
        &mut self,
        action: &str,
        params: &[&str],
        cx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome> {
        match action {
            "list" => {
                record(&self.log, format!("action_list({})", params.join(",")));
                cx.response_mut().set_body("alice, bob");
            }
            "show" => {
                let id = params.first().copied().unwrap_or("none");
                record(&self.log, format!("action_show({id})"));
                cx.response_mut().set_body(format!("user {id}"));
            }
            "fail" => {
                record(&self.log, "action_fail");
                return Err(anyhow!("user store unavailable"));
            }
            "explode" => panic!("users controller exploded"),
            "json" => {
                cx.response_mut()
                    .set_header("content-type", "application/json".to_string());
                cx.response_mut().set_body("{\"users\":[]}");
            }
            "private" => {
                cx.response_mut()
                    .set_header("cache-control", "private".to_string());
                cx.response_mut().set_body("secret");
            }
            "forever" => {
                cx.response_mut().set_header(
                    "cache-control",
                    format!("public, max-age={}", u64::MAX),
                );
                cx.response_mut().set_body("immutable");
            }
            "embed_copy" => {
                let copy = cx.request().clone().routed(None, "widgets", "render");
                let widget = cx.execute(copy)?;
                let content_type = widget.get_header("content-type").unwrap_or("none");
                let body = format!("copy[{}] content-type={content_type}", widget.body);
                cx.response_mut().set_body(body);
            }
            "embed" => {
                let widget = cx.execute(Request::get("/widgets/render", "widgets", "render"))?;
                let body = format!("users[{}]", widget.body);
                cx.response_mut().set_body(body);
            }
            "embed_missing" => {
                cx.execute(Request::get("/ghost/index", "ghost", "index"))?;
            }
            "embed_failing" => {
                cx.execute(Request::get("/widgets/fail", "widgets", "fail"))?;
            }
            _ => return Ok(ActionOutcome::Missing),
        }
        Ok(ActionOutcome::Handled)
    }

    fn after(&mut self, cx: &mut ActionContext<'_>) -> Result<()> {
        record(&self.log, format!("after {}", cx.request().action));
        Ok(())
    }
}

/// `widgets`: reports what the request stack looks like from inside a
/// nested request.
pub struct Widgets {
    log: EventLog,
}

impl Controller for Widgets {
    fn action(
        &mut self,
        action: &str,
        _params: &[&str],
        cx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome> {
        let stack = cx.stack();
        let uri_of = |r: Option<&mvc_dispatch::stack::RequestRef>| {
            r.map_or_else(|| "-".to_string(), |r| r.uri.to_string())
        };
        record(
            &self.log,
            format!(
                "widgets current={} previous={} initial={} depth={}",
                uri_of(stack.current()),
                uri_of(stack.previous()),
                uri_of(stack.initial()),
                stack.depth()
            ),
        );
        match action {
            "render" => cx.response_mut().set_body("widget"),
            "fail" => return Err(anyhow!("widget renderer crashed")),
            _ => return Ok(ActionOutcome::Missing),
        }
        Ok(ActionOutcome::Handled)
    }
}

/// `dynamic`: implements no actions, handles everything through its
/// catch-all hook.
#[derive(Default)]
pub struct Dynamic;

impl Controller for Dynamic {
    fn action(
        &mut self,
        _action: &str,
        _params: &[&str],
        _cx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome> {
        Ok(ActionOutcome::Missing)
    }

    fn catch_all(
        &mut self,
        action: &str,
        params: &ParamVec,
        cx: &mut ActionContext<'_>,
    ) -> Option<Result<()>> {
        cx.response_mut()
            .set_body(format!("dynamic {action} with {} params", params.len()));
        Some(Ok(()))
    }
}

/// `bare`: no actions and no catch-all hook.
#[derive(Default)]
pub struct Bare;

impl Controller for Bare {
    fn action(
        &mut self,
        _action: &str,
        _params: &[&str],
        _cx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome> {
        Ok(ActionOutcome::Missing)
    }
}

/// `counter`: counts how many times its action actually ran.
pub struct Counter {
    runs: Arc<AtomicUsize>,
}

impl Controller for Counter {
    fn action(
        &mut self,
        _action: &str,
        _params: &[&str],
        cx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        cx.response_mut().set_body(format!("run {run}"));
        Ok(ActionOutcome::Handled)
    }
}

/// Registry with every test controller registered.
///
/// | identity                 | entry                          |
/// |--------------------------|--------------------------------|
/// | `controller_admin_users` | [`Users`]                      |
/// | `controller_widgets`     | [`Widgets`]                    |
/// | `controller_dynamic`     | [`Dynamic`]                    |
/// | `controller_bare`        | [`Bare`]                       |
/// | `controller_counter`     | [`Counter`] sharing `runs`     |
/// | `controller_broken`      | factory that always fails      |
/// | `controller_base`        | abstract                       |
pub fn registry(log: &EventLog, runs: &Arc<AtomicUsize>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    let users_log = Arc::clone(log);
    registry.register(Some("admin"), "users", move |_req| {
        Ok(Box::new(Users {
            log: Arc::clone(&users_log),
        }) as Box<dyn Controller>)
    });

    let widgets_log = Arc::clone(log);
    registry.register(None, "widgets", move |_req| {
        Ok(Box::new(Widgets {
            log: Arc::clone(&widgets_log),
        }) as Box<dyn Controller>)
    });

    registry.register_default::<Dynamic>(None, "dynamic");
    registry.register_default::<Bare>(None, "bare");

    let runs = Arc::clone(runs);
    registry.register(None, "counter", move |_req| {
        Ok(Box::new(Counter {
            runs: Arc::clone(&runs),
        }) as Box<dyn Controller>)
    });

    registry.register(None, "broken", |_req| Err(anyhow!("missing constructor argument")));
    registry.register_abstract(None, "base");
    registry
}

/// Routed request for `admin/users/<action>`.
pub fn users_request(action: &str) -> Request {
    Request::get(format!("/admin/users/{action}"), "users", action).routed(
        Some("admin"),
        "users",
        action,
    )
}

/// Cache wrapper that counts backend calls and can be switched to failing.
pub struct CountingCache {
    inner: MemoryCache,
    failing: bool,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl CountingCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(64),
            failing: false,
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> usize {
        self.inner.len()
    }
}

impl ResponseCache for CountingCache {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Response>, BackendError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(BackendError::Unavailable("cache host unreachable".to_string()));
        }
        self.inner.get(fingerprint)
    }

    fn put(
        &self,
        fingerprint: &Fingerprint,
        response: &Response,
        lifetime: Duration,
    ) -> Result<(), BackendError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(BackendError::Unavailable("cache host unreachable".to_string()));
        }
        self.inner.put(fingerprint, response, lifetime)
    }
}
