use std::collections::HashMap;

pub use crate::error::ExtensionError;

/// Dynamic value exchanged with plugins. Script values are marshaled to and
/// from this type at the bridge (see `convert`).
pub type HostValue = serde_json::Value;

/// Host-invokable handle back into a script-defined function. Handed to a
/// plugin for the duration of a `call`; the mutable borrow keeps callback
/// invocations serialized on the evaluating thread.
pub type Callback<'a> = &'a mut dyn FnMut(&[HostValue]) -> Result<Vec<HostValue>, ExtensionError>;

/// A host-provided extension package. Implementations expose named
/// functions through `eval` and callback-taking functions through `call`.
pub trait Plugin {
    fn package(&self) -> &str;
    fn version(&self) -> &str;
    fn description(&self) -> &str;

    fn eval(&self, function: &str, args: &[HostValue]) -> Result<Vec<HostValue>, ExtensionError>;

    fn call(
        &self,
        function: &str,
        callback: Callback<'_>,
        args: &[HostValue],
    ) -> Result<Vec<HostValue>, ExtensionError>;
}

/// Process-scoped plugin registry, injected into the evaluator once before
/// evaluation starts. Resolves a package name and forwards.
#[derive(Default)]
pub struct Registry {
    plugins: HashMap<String, Box<dyn Plugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin under its own package name. A later registration
    /// with the same package name wins.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.insert(plugin.package().to_string(), plugin);
    }

    pub fn eval(
        &self,
        package: &str,
        function: &str,
        args: &[HostValue],
    ) -> Result<Vec<HostValue>, ExtensionError> {
        let plugin = self
            .plugins
            .get(package)
            .ok_or_else(|| ExtensionError::unknown_package(package))?;
        plugin.eval(function, args)
    }

    pub fn call(
        &self,
        package: &str,
        function: &str,
        callback: Callback<'_>,
        args: &[HostValue],
    ) -> Result<Vec<HostValue>, ExtensionError> {
        let plugin = self
            .plugins
            .get(package)
            .ok_or_else(|| ExtensionError::unknown_package(package))?;
        plugin.call(function, callback, args)
    }
}
