// Compiler orchestrator - six extension points around an all-or-nothing build
//
// Stage order: before_run -> build graph -> after_compile -> synthesize ->
// emit -> write assets -> done. Any stage error is fatal; there is no
// partial-success or retry path.

use crate::bundle;
use crate::config::BundlerConfig;
use crate::error::CompileError;
use crate::graph::{GraphBuilder, ModuleGraph};
use crate::hooks::{Hook, Interceptor};
use crate::plugins::Plugin;
use crate::toolkit::AstStats;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Output filename -> serialized content.
pub type AssetMap = BTreeMap<String, String>;

/// Payload for `before_run`.
#[derive(Debug, Clone)]
pub struct RunEvent {
    pub entry: PathBuf,
}

/// Payload for `before_parse`: the raw text about to be parsed.
#[derive(Debug, Clone)]
pub struct ParseEvent {
    pub path: PathBuf,
    pub source: String,
}

/// Payload for `after_parse`: reference counts gathered from the AST.
#[derive(Debug, Clone)]
pub struct AstEvent {
    pub path: PathBuf,
    pub stats: AstStats,
}

/// One module as seen by `after_compile` taps.
#[derive(Debug, Clone)]
pub struct ModuleSummary {
    pub id: u32,
    pub path: PathBuf,
    pub dependencies: Vec<PathBuf>,
}

/// Payload for `after_compile`: the finished graph, in id order.
#[derive(Debug, Clone)]
pub struct GraphEvent {
    pub modules: Vec<ModuleSummary>,
}

impl GraphEvent {
    fn from_graph(graph: &ModuleGraph) -> Self {
        Self {
            modules: graph
                .modules()
                .map(|m| ModuleSummary {
                    id: m.id,
                    path: m.path.clone(),
                    dependencies: m.dependencies.clone(),
                })
                .collect(),
        }
    }
}

/// Payload for `emit`: the asset table, mutable so plugins can rewrite
/// content before anything reaches disk.
pub struct EmitEvent {
    pub assets: Mutex<AssetMap>,
}

/// Payload for `done`. Direct-style notification; a failing done tap is
/// logged and swallowed, it can never fail the build.
#[derive(Debug, Clone)]
pub struct BuildStats {
    pub elapsed: Duration,
    pub module_count: usize,
}

/// The six named extension points of a compiler run.
pub struct CompilerHooks {
    pub before_run: Hook<RunEvent>,
    pub before_parse: Hook<ParseEvent>,
    pub after_parse: Hook<AstEvent>,
    pub after_compile: Hook<GraphEvent>,
    pub emit: Hook<EmitEvent>,
    pub done: Hook<BuildStats>,
}

impl CompilerHooks {
    pub fn new() -> Self {
        Self {
            before_run: Hook::new("before_run"),
            before_parse: Hook::new("before_parse"),
            after_parse: Hook::new("after_parse"),
            after_compile: Hook::new("after_compile"),
            emit: Hook::new("emit"),
            done: Hook::new("done"),
        }
    }
}

impl Default for CompilerHooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level driver wiring resolver, graph builder and synthesizer together.
///
/// Constructed once per run; plugins register their taps at construction,
/// before any hook is invoked.
pub struct Compiler {
    config: BundlerConfig,
    pub hooks: CompilerHooks,
}

impl Compiler {
    /// Create a compiler and apply `plugins` in order.
    ///
    /// # Errors
    ///
    /// Propagates registration failures, e.g. duplicate tap names.
    pub fn new(
        config: BundlerConfig,
        plugins: &[Box<dyn Plugin>],
    ) -> Result<Self, CompileError> {
        let mut hooks = CompilerHooks::new();

        hooks.before_run.intercept(Interceptor {
            on_call: Some(Box::new(|event: &RunEvent| {
                tracing::debug!(entry = %event.entry.display(), "before_run invoked");
            })),
            on_tap: Some(Box::new(|info| {
                tracing::debug!(tap = %info.name, "tap registered on before_run");
            })),
        });

        for plugin in plugins {
            tracing::debug!(plugin = plugin.name(), "applying plugin");
            plugin.apply(&mut hooks)?;
        }

        Ok(Self { config, hooks })
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    /// Run the full pipeline and return the final build stats.
    pub async fn run(&self) -> Result<BuildStats, CompileError> {
        let started = Instant::now();

        self.hooks
            .before_run
            .call_promise(Arc::new(RunEvent {
                entry: self.config.entry.clone(),
            }))
            .await?;

        let builder = GraphBuilder::new(&self.hooks);
        let graph = builder.build(&self.config.entry).await?;

        self.hooks
            .after_compile
            .call_promise(Arc::new(GraphEvent::from_graph(&graph)))
            .await?;

        let bundle = bundle::synthesize(&graph)?;
        let mut assets = AssetMap::new();
        assets.insert(self.config.output.filename.clone(), bundle);

        let emit_event = Arc::new(EmitEvent {
            assets: Mutex::new(assets),
        });
        self.hooks
            .emit
            .call_promise(Arc::clone(&emit_event))
            .await?;

        let assets = std::mem::take(&mut *emit_event.assets.lock());
        self.write_assets(assets)?;

        let stats = BuildStats {
            elapsed: started.elapsed(),
            module_count: graph.len(),
        };
        if let Err(err) = self.hooks.done.call(&stats) {
            tracing::warn!(error = %err, "done tap failed");
        }

        Ok(stats)
    }

    /// Write all assets into the output directory.
    ///
    /// Each asset goes through a temporary file in the target directory and
    /// is atomically persisted into place, so an interrupted write never
    /// leaves a half-overwritten asset from a previous build.
    fn write_assets(&self, assets: AssetMap) -> Result<(), CompileError> {
        let out_dir = &self.config.output.path;
        std::fs::create_dir_all(out_dir).map_err(|source| CompileError::AssetWrite {
            filename: out_dir.display().to_string(),
            source,
        })?;

        for (filename, content) in assets {
            let target = out_dir.join(&filename);
            let write = || -> std::io::Result<()> {
                let mut tmp = tempfile::NamedTempFile::new_in(out_dir)?;
                tmp.write_all(content.as_bytes())?;
                tmp.persist(&target).map_err(|e| e.error)?;
                Ok(())
            };
            write().map_err(|source| CompileError::AssetWrite {
                filename: filename.clone(),
                source,
            })?;
            tracing::info!(asset = %target.display(), bytes = content.len(), "asset written");
        }
        Ok(())
    }
}
