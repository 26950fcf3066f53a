// Error types for the bundler pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for a compiler run
///
/// Every stage failure surfaces as one of these variants. All of them are
/// fatal: the orchestrator never retries a stage and never downgrades an
/// error to a warning. Individual error types are exposed through `From`
/// conversions.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("cannot resolve '{specifier}' from {base_dir}")]
    UnresolvedDependency { specifier: String, base_dir: PathBuf },

    #[error("syntax errors in {path}:\n{message}")]
    Syntax { path: PathBuf, message: String },

    #[error("hook failed: {0}")]
    Hook(#[from] HookError),

    #[error("failed to write asset '{filename}': {source}")]
    AssetWrite {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle synthesis failed: {0}")]
    Bundle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the hook engine
#[derive(Debug, Error)]
pub enum HookError {
    /// Tap names are unique per hook. The silent-duplicate behavior of
    /// classic tapable is rejected here so a plugin registered twice is
    /// caught at setup time instead of running twice per invocation.
    #[error("tap '{tap}' already registered on hook '{hook}'")]
    DuplicateTap { hook: &'static str, tap: String },

    #[error("tap '{tap}' on hook '{hook}' failed: {cause}")]
    Tap {
        hook: &'static str,
        tap: String,
        cause: anyhow::Error,
    },

    /// A synchronous invocation found a callback- or promise-style tap.
    #[error("hook '{hook}' has async tap '{tap}' but was invoked synchronously")]
    AsyncTap { hook: &'static str, tap: String },
}
