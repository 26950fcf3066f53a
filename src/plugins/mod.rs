// Plugin capability interface and the built-in plugins

use crate::compiler::{AstEvent, CompilerHooks, EmitEvent, GraphEvent, RunEvent};
use crate::error::CompileError;
use std::sync::Arc;
use std::time::Duration;

/// A compiler plugin.
///
/// `apply` is called exactly once, at compiler construction, in plugin-list
/// order; inside, the plugin registers taps on any of the six hooks.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register this plugin's taps.
    ///
    /// # Errors
    ///
    /// Propagates registration failures such as duplicate tap names.
    fn apply(&self, hooks: &mut CompilerHooks) -> Result<(), CompileError>;
}

/// Look up a built-in plugin by its config name.
pub fn builtin(name: &str) -> Option<Box<dyn Plugin>> {
    match name {
        "logger" => Some(Box::new(LoggerPlugin)),
        "banner" => Some(Box::new(BannerPlugin::default())),
        "analyzer" => Some(Box::new(AnalyzerPlugin)),
        _ => None,
    }
}

/// Logs the start and end of a build.
pub struct LoggerPlugin;

impl Plugin for LoggerPlugin {
    fn name(&self) -> &str {
        "logger"
    }

    fn apply(&self, hooks: &mut CompilerHooks) -> Result<(), CompileError> {
        hooks
            .before_run
            .tap_callback("logger", |event: Arc<RunEvent>, done| {
                tracing::info!(entry = %event.entry.display(), "starting build");
                done(Ok(None));
            })?;

        hooks.done.tap("logger", |stats| {
            tracing::info!(
                modules = stats.module_count,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "build finished"
            );
            Ok(None)
        })?;

        Ok(())
    }
}

/// Prepends a banner comment to every emitted asset and runs a short
/// post-compile pass over the finished graph.
pub struct BannerPlugin {
    banner: String,
}

impl Default for BannerPlugin {
    fn default() -> Self {
        Self {
            banner: "/* generated by minipack */".to_string(),
        }
    }
}

impl BannerPlugin {
    pub fn with_banner(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
        }
    }
}

impl Plugin for BannerPlugin {
    fn name(&self) -> &str {
        "banner"
    }

    fn apply(&self, hooks: &mut CompilerHooks) -> Result<(), CompileError> {
        hooks
            .after_compile
            .tap_promise("banner", |event: Arc<GraphEvent>| {
                Box::pin(async move {
                    // Yield once so promise taps visibly suspend the stage.
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    tracing::info!(modules = event.modules.len(), "post-compile pass complete");
                    Ok(None)
                })
            })?;

        let banner = self.banner.clone();
        hooks.emit.tap("banner", move |event: &EmitEvent| {
            let mut assets = event.assets.lock();
            for content in assets.values_mut() {
                *content = format!("{banner}\n{content}");
            }
            Ok(None)
        })?;

        Ok(())
    }
}

/// Logs per-file reference counts around the parse stage.
pub struct AnalyzerPlugin;

impl Plugin for AnalyzerPlugin {
    fn name(&self) -> &str {
        "analyzer"
    }

    fn apply(&self, hooks: &mut CompilerHooks) -> Result<(), CompileError> {
        hooks
            .before_parse
            .tap_promise("analyzer", |event: Arc<crate::compiler::ParseEvent>| {
                Box::pin(async move {
                    tracing::debug!(
                        path = %event.path.display(),
                        bytes = event.source.len(),
                        "about to parse"
                    );
                    Ok(None)
                })
            })?;

        hooks.after_parse.tap("analyzer", |event: &AstEvent| {
            tracing::info!(
                path = %event.path.display(),
                imports = event.stats.static_imports,
                requires = event.stats.dynamic_requires,
                "module references"
            );
            Ok(None)
        })?;

        Ok(())
    }
}
