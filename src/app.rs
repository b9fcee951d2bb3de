//! Application lifecycle: wiring, validation, serve loop, shutdown.

use crate::dispatcher::Dispatcher;
use crate::registry::ServiceRegistry;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::websocket::Upgrader;
use anyhow::Context as _;
use std::any::Any;
use std::sync::Arc;
use tracing::info;

type Hook = Box<dyn Fn() + Send + Sync>;
type ErrorHook = Box<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Owns the router, registry, and lifecycle hooks, and runs the serve loop.
///
/// Construction order matters only for routes (first registered wins on
/// overlap); dependencies may be registered in any order before
/// [`start`](App::start), which validates every handler's dependencies
/// before the server binds.
pub struct App {
    router: Router,
    registry: ServiceRegistry,
    upgrader: Option<Arc<dyn Upgrader>>,
    on_start: Vec<Hook>,
    on_error: Vec<ErrorHook>,
    on_stop: Vec<Hook>,
}

impl App {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            registry: ServiceRegistry::new(),
            upgrader: None,
            on_start: Vec::new(),
            on_error: Vec::new(),
            on_stop: Vec::new(),
        }
    }

    /// Register a dependency available for handler injection.
    pub fn register<T: Any + Send + Sync>(&mut self, dep: T) {
        self.registry.add(dep);
    }

    /// Register an already-shared dependency.
    pub fn register_arc<T: Any + Send + Sync>(&mut self, dep: Arc<T>) {
        self.registry.add_arc(dep);
    }

    /// Install the WebSocket upgrade capability.
    pub fn set_upgrader(&mut self, upgrader: Arc<dyn Upgrader>) {
        self.upgrader = Some(upgrader);
    }

    /// Run after validation succeeds, before the server binds.
    pub fn on_start<F: Fn() + Send + Sync + 'static>(&mut self, hook: F) {
        self.on_start.push(Box::new(hook));
    }

    /// Run when the server fails to start.
    pub fn on_error<F: Fn(&anyhow::Error) + Send + Sync + 'static>(&mut self, hook: F) {
        self.on_error.push(Box::new(hook));
    }

    /// Run after the server has stopped.
    pub fn on_stop<F: Fn() + Send + Sync + 'static>(&mut self, hook: F) {
        self.on_stop.push(Box::new(hook));
    }

    /// Validate, bind, serve until SIGINT/SIGTERM, then stop.
    ///
    /// # Errors
    ///
    /// Fails eagerly when any handler declares a dependency the registry
    /// cannot resolve, or when the address cannot be bound.
    pub fn start(self, addr: &str) -> anyhow::Result<()> {
        let config = RuntimeConfig::from_env();
        may::config().set_stack_size(config.stack_size);

        let router = Arc::new(self.router);
        let registry = Arc::new(self.registry);
        let mut dispatcher = Dispatcher::new(Arc::clone(&router), registry);
        if let Some(upgrader) = self.upgrader {
            dispatcher.set_upgrader(upgrader);
        }
        dispatcher
            .validate()
            .context("dependency validation failed")?;

        for hook in &self.on_start {
            hook();
        }

        info!(
            addr,
            routes = router.routes().len(),
            stack_size = config.stack_size,
            "listening"
        );

        let service = AppService::new(Arc::new(dispatcher));
        let handle = match HttpServer(service).start(addr) {
            Ok(handle) => handle,
            Err(err) => {
                let err = anyhow::Error::new(err).context(format!("failed to bind {addr}"));
                for hook in &self.on_error {
                    hook(&err);
                }
                return Err(err);
            }
        };

        wait_for_shutdown(handle)?;

        for hook in &self.on_stop {
            hook();
        }
        info!("stopped");
        Ok(())
    }
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server terminated unexpectedly"))
}
