// Module graph construction - worklist traversal with stable id assignment

use crate::compiler::{AstEvent, CompilerHooks, ParseEvent};
use crate::error::CompileError;
use crate::resolver::Resolver;
use crate::toolkit;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One bundled module.
///
/// Identity is the canonical absolute path; `id` is assigned exactly once,
/// at first discovery, and is stable for the whole build.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: u32,
    pub path: PathBuf,
    /// Resolved canonical paths of every dependency, in document order.
    pub dependencies: Vec<PathBuf>,
    /// The printed source, wrapped as an isolated executable unit.
    pub code: String,
}

/// Mapping from canonical path to module, tracking discovery order.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: HashMap<PathBuf, Module>,
    order: Vec<PathBuf>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Modules in discovery order, which is also ascending id order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|path| self.modules.get(path))
    }

    /// Insert a module, assigning the next monotonic id.
    ///
    /// At most one module may exist per canonical path; the builder tests
    /// membership before creating a module, so a second insert for the same
    /// path is a logic error.
    fn insert(&mut self, path: PathBuf, dependencies: Vec<PathBuf>, code: String) -> u32 {
        debug_assert!(!self.modules.contains_key(&path));
        let id = self.order.len() as u32;
        self.order.push(path.clone());
        self.modules.insert(
            path.clone(),
            Module {
                id,
                path,
                dependencies,
                code,
            },
        );
        id
    }
}

/// Wrap printed module code as an isolated execution unit taking the
/// conventional three module-wrapper parameters.
fn wrap_executable(code: &str) -> String {
    format!("function(require, module, exports) {{\n{code}\n}}")
}

/// Builds the dependency graph for one entry file.
///
/// Discovery is strictly sequential: one dependency is fully parsed,
/// resolved and graphed before the next begins, which makes id assignment a
/// deterministic function of source order.
pub struct GraphBuilder<'h> {
    resolver: Resolver,
    hooks: &'h CompilerHooks,
}

impl<'h> GraphBuilder<'h> {
    pub fn new(hooks: &'h CompilerHooks) -> Self {
        Self {
            resolver: Resolver::default(),
            hooks,
        }
    }

    pub fn with_resolver(hooks: &'h CompilerHooks, resolver: Resolver) -> Self {
        Self { resolver, hooks }
    }

    /// Build the full transitive graph seeded at `entry`.
    ///
    /// The entry module is discovered first and therefore always holds
    /// id 0. Cycles terminate because graph membership is tested before a
    /// module is created. Any dependency failure aborts the whole build.
    pub async fn build(&self, entry: &Path) -> Result<ModuleGraph, CompileError> {
        let entry = entry
            .canonicalize()
            .map_err(|_| CompileError::SourceNotFound {
                path: entry.to_path_buf(),
            })?;

        let mut graph = ModuleGraph::new();
        self.create_module(&mut graph, entry.clone()).await?;

        let mut queue = VecDeque::from([entry]);
        while let Some(path) = queue.pop_front() {
            let dependencies = graph
                .get(&path)
                .map(|module| module.dependencies.clone())
                .unwrap_or_default();
            for dep in dependencies {
                if !graph.contains(&dep) {
                    self.create_module(&mut graph, dep.clone()).await?;
                    queue.push_back(dep);
                }
            }
        }

        Ok(graph)
    }

    /// Parse one source file, resolve its references and insert it.
    async fn create_module(
        &self,
        graph: &mut ModuleGraph,
        path: PathBuf,
    ) -> Result<(), CompileError> {
        if !path.is_file() {
            return Err(CompileError::SourceNotFound { path });
        }

        tracing::debug!(path = %path.display(), "loading module");
        let source = tokio::fs::read_to_string(&path).await?;

        self.hooks
            .before_parse
            .call_promise(Arc::new(ParseEvent {
                path: path.clone(),
                source: source.clone(),
            }))
            .await?;

        let analyzed = toolkit::analyze(&source, &path)?;

        self.hooks
            .after_parse
            .call_promise(Arc::new(AstEvent {
                path: path.clone(),
                stats: analyzed.stats,
            }))
            .await?;

        // Canonical paths always have a parent directory.
        let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));
        let mut dependencies = Vec::new();
        for specifier in &analyzed.specifiers {
            match self.resolver.resolve(base_dir, specifier) {
                Ok(resolved) => {
                    if !dependencies.contains(&resolved) {
                        dependencies.push(resolved);
                    }
                }
                Err(err) => {
                    tracing::error!(
                        specifier = %specifier,
                        importer = %path.display(),
                        "dependency resolution failed"
                    );
                    return Err(err);
                }
            }
        }

        let code = wrap_executable(&analyzed.code);
        let id = graph.insert(path.clone(), dependencies, code);
        tracing::debug!(id, path = %path.display(), "module registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilerHooks;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    async fn build(entry: &Path) -> Result<ModuleGraph, CompileError> {
        let hooks = CompilerHooks::new();
        GraphBuilder::new(&hooks).build(entry).await
    }

    #[tokio::test]
    async fn entry_module_gets_id_zero() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", "export const x = 1;");

        let graph = build(&entry).await.unwrap();
        assert_eq!(graph.len(), 1);
        let module = graph.get(&entry.canonicalize().unwrap()).unwrap();
        assert_eq!(module.id, 0);
        assert!(module.code.starts_with("function(require, module, exports)"));
    }

    #[tokio::test]
    async fn shared_dependency_is_parsed_once() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            &dir,
            "index.js",
            r#"import "./a"; import "./b";"#,
        );
        write(&dir, "a.js", r#"import "./shared";"#);
        write(&dir, "b.js", r#"import "./shared";"#);
        write(&dir, "shared.js", "export const s = 1;");

        let graph = build(&entry).await.unwrap();
        assert_eq!(graph.len(), 4);

        let shared = dir.path().join("shared.js").canonicalize().unwrap();
        let holders: Vec<_> = graph
            .modules()
            .filter(|m| m.dependencies.contains(&shared))
            .collect();
        assert_eq!(holders.len(), 2);
    }

    #[tokio::test]
    async fn import_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "a.js", r#"import { b } from "./b"; export const a = 1;"#);
        write(&dir, "b.js", r#"import { a } from "./a"; export const b = 2;"#);

        let graph = build(&entry).await.unwrap();
        assert_eq!(graph.len(), 2);

        let a = dir.path().join("a.js").canonicalize().unwrap();
        let b = dir.path().join("b.js").canonicalize().unwrap();
        assert!(graph.get(&a).unwrap().dependencies.contains(&b));
        assert!(graph.get(&b).unwrap().dependencies.contains(&a));
    }

    #[tokio::test]
    async fn ids_follow_discovery_order() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            &dir,
            "index.js",
            r#"import "./first"; import "./second";"#,
        );
        write(&dir, "first.js", r#"import "./nested";"#);
        write(&dir, "second.js", "export const s = 2;");
        write(&dir, "nested.js", "export const n = 3;");

        let graph = build(&entry).await.unwrap();
        let ids: Vec<(u32, String)> = graph
            .modules()
            .map(|m| {
                (
                    m.id,
                    m.path.file_name().unwrap().to_string_lossy().to_string(),
                )
            })
            .collect();
        // Breadth-first: entry, its deps in document order, then nested.
        assert_eq!(
            ids,
            vec![
                (0, "index.js".to_string()),
                (1, "first.js".to_string()),
                (2, "second.js".to_string()),
                (3, "nested.js".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn id_assignment_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", r#"import "./a"; import "./b";"#);
        write(&dir, "a.js", "export const a = 1;");
        write(&dir, "b.js", "export const b = 2;");

        let first: Vec<(PathBuf, u32)> = build(&entry)
            .await
            .unwrap()
            .modules()
            .map(|m| (m.path.clone(), m.id))
            .collect();
        let second: Vec<(PathBuf, u32)> = build(&entry)
            .await
            .unwrap()
            .modules()
            .map(|m| (m.path.clone(), m.id))
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_entry_fails() {
        let dir = TempDir::new().unwrap();
        let err = build(&dir.path().join("absent.js")).await.unwrap_err();
        assert!(matches!(err, CompileError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn unresolvable_dependency_aborts_build() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", r#"import "./ghost";"#);

        let err = build(&entry).await.unwrap_err();
        match err {
            CompileError::UnresolvedDependency { specifier, .. } => {
                assert_eq!(specifier, "./ghost");
            }
            other => panic!("expected UnresolvedDependency, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_dependency_aborts_build() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", r#"import "./broken";"#);
        write(&dir, "broken.js", "const x = ");

        let err = build(&entry).await.unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }
}
