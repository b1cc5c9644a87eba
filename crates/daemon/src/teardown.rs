type Hook = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Ordered shutdown callbacks owned by the composition root.
///
/// Hooks run in registration order, each exactly once; `run` consumes the list.
/// A failing hook is logged and the rest still run.
#[derive(Default)]
pub struct Teardown {
    hooks: Vec<(&'static str, Hook)>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &'static str, hook: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.hooks.push((name, Box::new(hook)));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Returns how many hooks succeeded.
    pub fn run(self) -> usize {
        let mut ok = 0;
        for (name, hook) in self.hooks {
            match hook() {
                Ok(()) => {
                    tracing::debug!(hook = name, "teardown hook done");
                    ok += 1;
                }
                Err(e) => tracing::warn!(hook = name, error = %e, "teardown hook failed"),
            }
        }
        ok
    }
}
