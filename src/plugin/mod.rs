//! Plugin loader
//!
//! Problem plugins (test generators, checkers, interactors) are Starlark
//! modules. Loading goes through explicit stages so callers can tell a file
//! that does not parse apart from one whose top-level code raised:
//!
//! - read and parse the source
//! - instantiate: bind the parsed unit to a fresh module and the kind's globals
//! - initialize: evaluate the top-level statements
//!
//! Capabilities are top-level functions looked up by name. Asking for an absent
//! capability is never an error. Every driver run loads its own module; no
//! state survives between runs.

pub mod convert;
pub mod error;
pub mod script;
pub mod stdlib;

pub use error::PluginError;
pub use stdlib::SolutionChannel;

use std::fs;
use std::path::{Path, PathBuf};

use starlark::environment::{Globals, GlobalsBuilder, LibraryExtension, Module};
use starlark::eval::Evaluator;
use starlark::syntax::{AstModule, Dialect};
use starlark::values::{Heap, Value};
use tracing::debug;

use stdlib::Diagnostics;

/// The three plugin contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Generator,
    Checker,
    Interactor,
}

impl PluginKind {
    /// Logical module name, bound as `__name__` inside the plugin
    pub fn module_name(self) -> &'static str {
        match self {
            PluginKind::Generator => "tests_generator",
            PluginKind::Checker => "checker",
            PluginKind::Interactor => "interactor",
        }
    }
}

/// Dialect for plugin sources.
///
/// `load()` parses so that the loader can reject it at instantiation with a
/// precise error.
fn plugin_dialect() -> Dialect {
    Dialect {
        enable_def: true,
        enable_lambda: true,
        enable_load: true,
        enable_top_level_stmt: true,
        ..Dialect::Standard
    }
}

fn plugin_globals(kind: PluginKind) -> Globals {
    let builder = GlobalsBuilder::extended_by(&[LibraryExtension::StructType, LibraryExtension::Print])
        .with(stdlib::register_file_functions)
        .with(stdlib::register_byte_functions);
    match kind {
        PluginKind::Interactor => builder.with(stdlib::register_interaction_functions).build(),
        PluginKind::Generator | PluginKind::Checker => builder.build(),
    }
}

/// A loaded plugin module
pub struct Plugin {
    kind: PluginKind,
    path: PathBuf,
    work_dir: PathBuf,
    module: Module,
    globals: Globals,
    diagnostics: Diagnostics,
}

impl Plugin {
    /// Load and initialize a plugin. `work_dir` is what the plugin's relative
    /// file reads resolve against, during initialization and every call.
    pub fn load(kind: PluginKind, path: &Path, work_dir: &Path) -> Result<Self, PluginError> {
        debug!("Loading {} plugin from {:?}", kind.module_name(), path);

        let source = fs::read_to_string(path).map_err(|source| PluginError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let ast = AstModule::parse(&path.to_string_lossy(), source, &plugin_dialect()).map_err(
            |e| PluginError::Syntax {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        )?;

        let plugin = Self::instantiate(kind, path, work_dir, &ast)?;
        plugin.initialize(ast)?;
        Ok(plugin)
    }

    fn instantiate(
        kind: PluginKind,
        path: &Path,
        work_dir: &Path,
        ast: &AstModule,
    ) -> Result<Self, PluginError> {
        let dependencies = ast.loads().len();
        if dependencies > 0 {
            return Err(PluginError::Instantiate {
                path: path.to_path_buf(),
                message: format!(
                    "plugins must be self-contained, found {} load() statement(s)",
                    dependencies
                ),
            });
        }

        let module = Module::new();
        let name = module.heap().alloc(kind.module_name());
        module.set("__name__", name);

        let diagnostics = match kind {
            PluginKind::Checker => Diagnostics::capture(),
            PluginKind::Generator | PluginKind::Interactor => Diagnostics::Stdout,
        };

        Ok(Self {
            kind,
            path: path.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            module,
            globals: plugin_globals(kind),
            diagnostics,
        })
    }

    /// Top-level prints never leak into the first call's diagnostic
    fn initialize(&self, ast: AstModule) -> Result<(), PluginError> {
        let mut eval = Evaluator::new(&self.module);
        eval.set_print_handler(&self.diagnostics);
        let (result, _) = stdlib::with_context(&self.work_dir, None, || {
            eval.eval_module(ast, &self.globals).map(|_| ())
        });
        let printed = self.diagnostics.take();

        match result {
            Ok(()) => {
                if let Some(printed) = printed {
                    debug!("{:?} printed while initializing: {}", self.path, printed);
                }
                Ok(())
            }
            Err(e) => Err(PluginError::Initialization {
                path: self.path.clone(),
                message: with_printed(printed, e.to_string()),
            }),
        }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Whether the module defines a callable with this name
    pub fn has_capability(&self, name: &str) -> bool {
        self.capability(name).is_some()
    }

    fn capability(&self, name: &str) -> Option<Value<'_>> {
        self.module
            .get(name)
            .filter(|value| matches!(value.get_type(), "function" | "native_function"))
    }

    /// Heap for allocating call arguments
    pub(crate) fn heap(&self) -> &Heap {
        self.module.heap()
    }

    /// Invoke a capability with positional arguments
    pub(crate) fn call<'v>(
        &'v self,
        capability: &str,
        args: &[Value<'v>],
    ) -> Result<Value<'v>, PluginError> {
        self.call_with_channel(capability, args, None)
            .map(|(value, _)| value)
    }

    /// Invoke a capability with file access resolved against `work_dir`
    pub(crate) fn call_in<'v>(
        &'v self,
        capability: &str,
        args: &[Value<'v>],
        work_dir: &Path,
    ) -> Result<Value<'v>, PluginError> {
        self.invoke(capability, args, work_dir, None)
            .map(|(value, _)| value)
    }

    /// Invoke a capability while the solution channel is attached
    pub(crate) fn call_with_channel<'v>(
        &'v self,
        capability: &str,
        args: &[Value<'v>],
        channel: Option<SolutionChannel>,
    ) -> Result<(Value<'v>, Option<SolutionChannel>), PluginError> {
        self.invoke(capability, args, &self.work_dir, channel)
    }

    fn invoke<'v>(
        &'v self,
        capability: &str,
        args: &[Value<'v>],
        work_dir: &Path,
        channel: Option<SolutionChannel>,
    ) -> Result<(Value<'v>, Option<SolutionChannel>), PluginError> {
        let function = self
            .capability(capability)
            .ok_or_else(|| PluginError::MissingCapability {
                capability: capability.to_string(),
            })?;

        debug!("Calling {}() of {:?}", capability, self.path);
        let mut eval = Evaluator::new(&self.module);
        eval.set_print_handler(&self.diagnostics);
        let (result, channel) = stdlib::with_context(work_dir, channel, || {
            eval.eval_function(function, args, &[])
        });

        result
            .map(|value| (value, channel))
            .map_err(|e| PluginError::Execution {
                capability: capability.to_string(),
                message: e.to_string(),
            })
    }

    /// Evaluate a harness-supplied expression in the plugin's module
    pub(crate) fn eval_snippet(&self, name: &str, source: &str) -> Result<Value<'_>, PluginError> {
        let ast = AstModule::parse(name, source.to_string(), &Dialect::Standard).map_err(|e| {
            PluginError::Instantiate {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;
        let mut eval = Evaluator::new(&self.module);
        eval.eval_module(ast, &self.globals)
            .map_err(|e| PluginError::Instantiate {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }

    /// Lines the plugin printed since the last call, for capturing kinds
    pub fn take_diagnostics(&self) -> Option<String> {
        self.diagnostics.take()
    }
}

/// Error text preceded by whatever the plugin printed before failing
pub(crate) fn with_printed(printed: Option<String>, message: String) -> String {
    match printed {
        Some(printed) => format!("{}\n{}", printed, message),
        None => message,
    }
}
