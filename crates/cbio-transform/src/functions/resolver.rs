use std::path::PathBuf;

use cbio_model::{ImportError, Result};
use mlua::Function;
use tracing::debug;

use super::builtins::{self, BuiltinFn};
use super::plugin::Plugin;

/// Which plugin slot a lookup consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Transform,
    Filter,
    Aggregate,
}

impl FunctionKind {
    pub fn slot(self) -> &'static str {
        match self {
            Self::Transform => "transforms",
            Self::Filter => "filters",
            Self::Aggregate => "aggregates",
        }
    }
}

/// A function ready to be invoked through the run context.
#[derive(Debug, Clone)]
pub enum ResolvedFunction {
    Builtin { name: String, function: BuiltinFn },
    Plugin { name: String, function: Function },
}

impl ResolvedFunction {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin { name, .. } | Self::Plugin { name, .. } => name,
        }
    }
}

/// Resolves function names against built-ins and the lazily loaded plugin.
#[derive(Debug)]
pub struct Resolver {
    functions_file: Option<PathBuf>,
    seed: u64,
    plugin: Option<Plugin>,
}

impl Resolver {
    pub fn new(functions_file: Option<PathBuf>, seed: u64) -> Self {
        Self {
            functions_file,
            seed,
            plugin: None,
        }
    }

    /// The plugin, loaded on first use.
    pub fn plugin(&mut self) -> Result<&Plugin> {
        if self.plugin.is_none() {
            let path = self.functions_file.as_ref().ok_or_else(|| {
                ImportError::function_file_missing("No function definition file configured")
            })?;
            self.plugin = Some(Plugin::load(path, self.seed)?);
        }
        self.plugin
            .as_ref()
            .ok_or_else(|| ImportError::configuration("Function definition file not loaded"))
    }

    pub fn loaded_plugin(&self) -> Option<&Plugin> {
        self.plugin.as_ref()
    }

    /// Resolve `name` for use as a `kind` function.
    ///
    /// Dotted names address a built-in namespace (`uuid`, `text`) or a nested
    /// plugin table; bare names try the built-in registry before the plugin.
    pub fn resolve(&mut self, name: &str, kind: FunctionKind) -> Result<ResolvedFunction> {
        if let Some((namespace, symbol)) = name.rsplit_once('.') {
            if builtins::is_builtin_namespace(namespace) {
                let function = builtins::lookup_namespaced(namespace, symbol).ok_or_else(|| {
                    ImportError::resolution(format!("Unknown function {symbol} in {namespace}"))
                })?;
                return Ok(ResolvedFunction::Builtin {
                    name: name.to_string(),
                    function,
                });
            }
        } else if let Some(function) = builtins::lookup(name) {
            return Ok(ResolvedFunction::Builtin {
                name: name.to_string(),
                function,
            });
        }

        let function = self.plugin()?.lookup(kind, name)?.ok_or_else(|| {
            ImportError::resolution(format!(
                "Function {name} not found in {} of the function definition file",
                kind.slot()
            ))
        })?;
        debug!(function = name, slot = kind.slot(), "resolved plugin function");
        Ok(ResolvedFunction::Plugin {
            name: name.to_string(),
            function,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_without_plugin() {
        let mut resolver = Resolver::new(None, 42);
        let resolved = resolver
            .resolve("len", FunctionKind::Aggregate)
            .expect("len");
        assert_eq!(resolved.name(), "len");
        assert!(
            resolver
                .resolve("uuid.uuid4", FunctionKind::Transform)
                .is_ok()
        );
        assert!(matches!(
            resolver.resolve("uuid.uuid7", FunctionKind::Transform),
            Err(ImportError::Resolution(_))
        ));
        assert!(resolver.loaded_plugin().is_none());
    }

    #[test]
    fn unknown_name_without_plugin_is_missing_function_file() {
        let mut resolver = Resolver::new(None, 42);
        assert!(matches!(
            resolver.resolve("shout", FunctionKind::Transform),
            Err(ImportError::FunctionFileMissing(_))
        ));
    }

    #[test]
    fn broken_function_file_is_configuration_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.lua");
        std::fs::write(&path, "this is not lua ((((").expect("write script");
        let mut resolver = Resolver::new(Some(path), 42);
        let err = resolver
            .resolve("shout", FunctionKind::Transform)
            .unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
        assert!(!err.is_lookup_failure());
    }

    #[test]
    fn plugin_is_loaded_lazily_and_consulted_by_slot() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("functions.lua");
        std::fs::write(
            &path,
            "return { transforms = { shout = function(v) return v end }, filters = {} }",
        )
        .expect("write script");
        let mut resolver = Resolver::new(Some(path), 42);
        assert!(resolver.loaded_plugin().is_none());
        let resolved = resolver
            .resolve("shout", FunctionKind::Transform)
            .expect("shout");
        assert!(matches!(resolved, ResolvedFunction::Plugin { .. }));
        assert!(matches!(
            resolver.resolve("shout", FunctionKind::Filter),
            Err(ImportError::Resolution(_))
        ));
    }
}
