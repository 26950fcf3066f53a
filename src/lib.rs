//! minipack - a plugin-driven JavaScript module bundler.
//!
//! Given an entry source file, minipack discovers every statically- and
//! dynamically-referenced module, assembles a dependency graph with stable
//! integer ids, and emits a single self-executing bundle that resolves
//! relative specifiers through per-module remap tables at call time.
//!
//! The pipeline is driven through six tapable hooks (`before_run`,
//! `before_parse`, `after_parse`, `after_compile`, `emit`, `done`); plugins
//! attach direct, callback-style or promise-style taps to any of them.

pub mod bundle;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod plugins;
pub mod resolver;
pub mod toolkit;

pub use compiler::{BuildStats, Compiler, CompilerHooks};
pub use config::{BundlerConfig, OutputConfig};
pub use error::{CompileError, HookError};
pub use graph::{GraphBuilder, Module, ModuleGraph};
pub use hooks::{Hook, Interceptor, TapInfo, TapKind};
pub use plugins::Plugin;
pub use resolver::Resolver;
