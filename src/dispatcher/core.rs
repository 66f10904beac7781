use http::Method;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{cache_lifetime, Fingerprint, ResponseCache};
use crate::controller::{ActionContext, ActionOutcome, Controller};
use crate::error::DispatchError;
use crate::model::ModelInvoker;
use crate::profiler::{OpenBenchmark, Profiler};
use crate::registry::{action_method, HandlerEntry, HandlerRegistry};
use crate::request::Request;
use crate::response::Response;
use crate::router::Resolver;
use crate::runtime_config::DispatchConfig;
use crate::stack::RequestStack;

/// Profiler group every request benchmark is filed under
pub const BENCHMARK_GROUP: &str = "Requests";

/// Executes routed requests against registered controllers.
///
/// A `Dispatcher` holds no per-request state and is shared across threads
/// behind an `Arc`; each thread brings its own [`RequestStack`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    config: DispatchConfig,
    cache: Option<Arc<dyn ResponseCache>>,
    profiler: Option<Arc<dyn Profiler>>,
    model: Option<Arc<dyn ModelInvoker>>,
}

impl Dispatcher {
    /// Create a dispatcher with default configuration and no cache,
    /// profiler or model fallback.
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            config: DispatchConfig::default(),
            cache: None,
            profiler: None,
            model: None,
        }
    }

    /// Replace the configuration.
    ///
    /// Handler identities are built by the registry, so `handler_prefix` only
    /// takes effect through [`HandlerRegistry::from_config`]; a mismatch with
    /// the registry's prefix is logged.
    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        if config.handler_prefix != self.registry.prefix() {
            warn!(
                config_prefix = %config.handler_prefix,
                registry_prefix = %self.registry.prefix(),
                "Configured handler prefix differs from the registry's - handlers resolve with the registry prefix"
            );
        }
        self.config = config;
        self
    }

    /// Enable read-through / write-through response caching.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a profiler. Benchmarks are only opened while
    /// [`DispatchConfig::profiling`] is enabled.
    #[must_use]
    pub fn with_profiler(mut self, profiler: Arc<dyn Profiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// Set the model fallback used when no controller action handles a request.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn ModelInvoker>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Resolve `uri` with `resolver` and execute the resulting request.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] when the resolver finds no route, otherwise
    /// whatever [`execute`](Self::execute) returns.
    pub fn execute_uri(
        &self,
        stack: &mut RequestStack,
        resolver: &dyn Resolver,
        method: Method,
        uri: &str,
    ) -> Result<Response, DispatchError> {
        let request = resolver
            .resolve(method, uri)
            .ok_or_else(|| DispatchError::NotFound {
                uri: uri.to_string(),
            })?;
        self.execute(stack, request)
    }

    /// Execute `request`: run its controller's `before`, action and `after`
    /// hooks and return the response they built.
    ///
    /// On a cache hit the cached response is returned without touching the
    /// stack or any controller. Otherwise `request` is current on `stack` for
    /// the duration of the call and the previous request is restored on every
    /// exit path.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NotFound`] (404) when no handler is registered for
    ///   the request's directory/controller, or the model fallback is needed
    ///   but none is configured
    /// - [`DispatchError::AbstractHandler`] (500) for abstract handlers
    /// - [`DispatchError::Handler`] / [`DispatchError::HandlerPanicked`] (500)
    ///   when a lifecycle hook fails
    /// - [`DispatchError::ModelFailed`] (500) when the model fallback fails
    pub fn execute(
        &self,
        stack: &mut RequestStack,
        request: Request,
    ) -> Result<Response, DispatchError> {
        let fingerprint = self
            .cache
            .as_ref()
            .map(|_| Fingerprint::for_request(&request, &self.config.cache_vary));

        if let Some(cached) = self.cached_response(fingerprint.as_ref(), &request) {
            return Ok(cached);
        }

        let identity = self.registry.identity_for(&request);

        // The first request executed on an empty stack is the root request.
        stack.set_initial(&request);
        let is_initial = stack.is_initial(&request);

        let benchmark = self.open_benchmark(stack, &request, is_initial);

        info!(
            request_id = %request.request_id,
            method = %request.method,
            uri = %request.uri,
            handler = %identity,
            action = %action_method(&request.action),
            depth = stack.depth(),
            "Request dispatched"
        );

        let started = Instant::now();
        let result = {
            let mut guard = stack.enter(&request);
            self.run(&mut guard, &request, &identity)
        };

        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                // Dropping the open benchmark deletes it.
                drop(benchmark);
                error!(
                    request_id = %request.request_id,
                    uri = %request.uri,
                    handler = %identity,
                    status = err.status().as_u16(),
                    error = %err,
                    "Request failed"
                );
                return Err(err);
            }
        };

        let elapsed = started.elapsed();
        response.elapsed = Some(elapsed);

        if is_initial && !response.has_header("content-type") {
            response.set_header("content-type", self.config.default_content_type());
        }

        if let Some(benchmark) = benchmark {
            benchmark.stop();
        }

        info!(
            request_id = %request.request_id,
            uri = %request.uri,
            handler = %identity,
            status = response.status,
            latency_ms = elapsed.as_millis() as u64,
            "Request complete"
        );

        self.store_response(fingerprint.as_ref(), &request, &response);
        Ok(response)
    }

    /// Cache lookup; backend errors count as a miss.
    fn cached_response(
        &self,
        fingerprint: Option<&Fingerprint>,
        request: &Request,
    ) -> Option<Response> {
        let (cache, fingerprint) = self.cache.as_ref().zip(fingerprint)?;
        match cache.get(fingerprint) {
            Ok(Some(response)) => {
                debug!(uri = %request.uri, fingerprint = %fingerprint, "Response cache hit");
                Some(response)
            }
            Ok(None) => {
                debug!(uri = %request.uri, fingerprint = %fingerprint, "Response cache miss");
                None
            }
            Err(err) => {
                warn!(
                    uri = %request.uri,
                    error = %err,
                    "Response cache lookup failed - treating as miss"
                );
                None
            }
        }
    }

    fn store_response(&self, fingerprint: Option<&Fingerprint>, request: &Request, response: &Response) {
        let Some((cache, fingerprint)) = self.cache.as_ref().zip(fingerprint) else {
            return;
        };
        let Some(lifetime) = cache_lifetime(request, response, self.config.cache_lifetime()) else {
            debug!(uri = %request.uri, "Response not cacheable");
            return;
        };
        if let Err(err) = cache.put(fingerprint, response, lifetime) {
            warn!(
                uri = %request.uri,
                error = %err,
                "Response cache store failed - response not cached"
            );
        }
    }

    fn open_benchmark(
        &self,
        stack: &RequestStack,
        request: &Request,
        is_initial: bool,
    ) -> Option<OpenBenchmark> {
        if !self.config.profiling {
            return None;
        }
        let profiler = self.profiler.as_ref()?;

        let mut label = format!("\"{}\"", request.uri);
        if let (false, Some(parent)) = (is_initial, stack.current()) {
            label.push_str(" « \"");
            label.push_str(&parent.uri);
            label.push('"');
        }
        Some(OpenBenchmark::start(Arc::clone(profiler), BENCHMARK_GROUP, &label))
    }

    /// Resolve the handler and run it. Called with `request` current on `stack`.
    fn run(
        &self,
        stack: &mut RequestStack,
        request: &Request,
        identity: &str,
    ) -> Result<Response, DispatchError> {
        let factory = match self.registry.lookup(identity) {
            None => {
                debug!(
                    handler = %identity,
                    available_handlers = self.registry.len(),
                    "Handler not found"
                );
                return Err(DispatchError::NotFound {
                    uri: request.uri.clone(),
                });
            }
            Some(HandlerEntry::Abstract) => {
                return Err(DispatchError::AbstractHandler {
                    handler: identity.to_string(),
                });
            }
            Some(HandlerEntry::Concrete(factory)) => factory,
        };

        let mut response = Response::new();

        let mut controller = match factory(request) {
            Ok(controller) => controller,
            Err(err) => {
                debug!(
                    handler = %identity,
                    error = %err,
                    "Controller construction failed - using model fallback"
                );
                response.set_body(self.invoke_model(request)?);
                return Ok(response);
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.lifecycle(controller.as_mut(), stack, request, &mut response, identity)
        }));

        match outcome {
            Ok(Ok(())) => Ok(response),
            Ok(Err(err)) => Err(err),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                error!(handler = %identity, panic_message = %message, "Controller panicked");
                Err(DispatchError::HandlerPanicked {
                    handler: identity.to_string(),
                    message,
                })
            }
        }
    }

    /// `before` → action (or catch-all, or model fallback) → `after`.
    fn lifecycle(
        &self,
        controller: &mut dyn Controller,
        stack: &mut RequestStack,
        request: &Request,
        response: &mut Response,
        identity: &str,
    ) -> Result<(), DispatchError> {
        let wrap = |source: anyhow::Error| DispatchError::Handler {
            handler: identity.to_string(),
            source,
        };

        let mut cx = ActionContext::new(request, response, self, stack);

        controller.before(&mut cx).map_err(wrap)?;

        // Positional parameter passing is kept for compatibility with
        // controllers written against it; new code should read cx.request().
        let params = request.positional_params();
        let outcome = controller
            .action(&request.action, &params, &mut cx)
            .map_err(wrap)?;

        if outcome == ActionOutcome::Missing {
            match controller.catch_all(&request.action, &request.params, &mut cx) {
                Some(result) => result.map_err(wrap)?,
                None => {
                    debug!(
                        handler = %identity,
                        action = %action_method(&request.action),
                        "Action not found - using model fallback"
                    );
                    let body = self.invoke_model(request)?;
                    cx.response_mut().set_body(body);
                }
            }
        }

        controller.after(&mut cx).map_err(wrap)
    }

    fn invoke_model(&self, request: &Request) -> Result<String, DispatchError> {
        let Some(model) = self.model.as_ref() else {
            return Err(DispatchError::NotFound {
                uri: request.uri.clone(),
            });
        };
        model
            .invoke(request, &request.query_params)
            .map_err(|source| DispatchError::ModelFailed {
                uri: request.uri.clone(),
                source,
            })
    }
}
