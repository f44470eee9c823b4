// Module lifecycle harness: start modules in order, stop them in reverse

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::RouterResult;

/// A subsystem with an explicit start and stop
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self) -> RouterResult<()>;

    /// Release resources. Callers do not learn whether cleanup succeeded.
    fn shutdown(&self);
}

pub struct Registry {
    modules: Vec<Arc<dyn Module>>,
    running: Mutex<Vec<Arc<dyn Module>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            modules: Vec::with_capacity(10),
            running: Mutex::new(Vec::with_capacity(10)),
        }
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        tracing::debug!("Registered module {}", module.name());
        self.modules.push(module);
    }

    /// Initialize every module in registration order.
    ///
    /// On the first failure the modules started so far are shut down and the
    /// error is returned.
    pub fn run(&self) -> RouterResult<()> {
        for module in &self.modules {
            if let Err(e) = module.init() {
                tracing::error!("Module {} failed to start: {}", module.name(), e);
                self.shutdown();
                return Err(e);
            }

            tracing::info!("Module {} started", module.name());
            self.running.lock().push(module.clone());
        }

        Ok(())
    }

    /// Shut down started modules, last started first
    pub fn shutdown(&self) {
        let running = std::mem::take(&mut *self.running.lock());
        for module in running.iter().rev() {
            module.shutdown();
            tracing::info!("Module {} stopped", module.name());
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
