// Bundle synthesis - closed self-executing runtime over the module graph

use crate::error::CompileError;
use crate::graph::ModuleGraph;
use std::path::Path;

/// Emit the self-invoking runtime for a finished graph.
///
/// Every module becomes an entry `id: [executable unit, remap table]` where
/// the remap table maps the explicit relative form of each dependency path
/// (relative to the module's own directory, forward slashes) to the
/// dependency's integer id. The runtime resolves relative specifiers through
/// that table at call time and starts execution at `require(0)`, which is
/// always the entry module.
///
/// Exports are cached per id on first execution. The cache record is
/// installed before the unit runs, so modules in an import cycle observe
/// each other's partially-initialized exports instead of recursing forever.
pub fn synthesize(graph: &ModuleGraph) -> Result<String, CompileError> {
    let mut table = String::new();

    for module in graph.modules() {
        let base_dir = module.path.parent().unwrap_or_else(|| Path::new("/"));

        let mut remap = serde_json::Map::new();
        for dep in &module.dependencies {
            let target = graph.get(dep).ok_or_else(|| {
                CompileError::Bundle(format!(
                    "dependency {} of {} missing from graph",
                    dep.display(),
                    module.path.display()
                ))
            })?;
            remap.insert(
                relative_specifier(base_dir, dep),
                serde_json::Value::from(target.id),
            );
        }
        let remap_json = serde_json::Value::Object(remap).to_string();

        table.push_str(&format!(
            "{}: [\n{},\n{}\n],\n",
            module.id, module.code, remap_json
        ));
    }

    Ok(format!(
        r#"(function(modules) {{
  var installed = {{}};
  function require(id) {{
    if (installed[id]) {{
      return installed[id].exports;
    }}
    var unit = modules[id][0];
    var mapping = modules[id][1];
    function localRequire(specifier) {{
      return require(mapping[specifier]);
    }}
    var module = {{ exports: {{}} }};
    installed[id] = module;
    unit(localRequire, module, module.exports);
    return module.exports;
  }}
  require(0);
}})({{{table}}})"#
    ))
}

/// Express `to` relative to `from_dir` as an explicit relative specifier:
/// forward slashes, always `./`- or `../`-prefixed.
fn relative_specifier(from_dir: &Path, to: &Path) -> String {
    let rel = relative_path(from_dir, to);
    let mut spec = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if !spec.starts_with('.') {
        spec = format!("./{spec}");
    }
    spec
}

fn relative_path(from: &Path, to: &Path) -> std::path::PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = std::path::PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component.as_os_str());
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilerHooks;
    use crate::graph::GraphBuilder;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    async fn bundle_for(entry: &Path) -> String {
        let hooks = CompilerHooks::new();
        let graph = GraphBuilder::new(&hooks).build(entry).await.unwrap();
        synthesize(&graph).unwrap()
    }

    #[test]
    fn relative_specifier_forms() {
        let cases = [
            ("/proj/src", "/proj/src/a.js", "./a.js"),
            ("/proj/src", "/proj/src/lib/util.js", "./lib/util.js"),
            ("/proj/src/lib", "/proj/src/a.js", "../a.js"),
            ("/proj/src", "/other/b.js", "../../other/b.js"),
        ];
        for (from, to, expected) in cases {
            assert_eq!(
                relative_specifier(Path::new(from), Path::new(to)),
                expected,
                "{from} -> {to}"
            );
        }
    }

    #[tokio::test]
    async fn entry_is_module_zero() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", r#"import { x } from "./a";"#);
        write(&dir, "a.js", "export const x = 5;");

        let bundle = bundle_for(&entry).await;
        assert!(bundle.contains("require(0);"));
        assert!(bundle.starts_with("(function(modules)"));
    }

    #[tokio::test]
    async fn remap_tables_map_relative_paths_to_ids() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", r#"import { x } from "./a";"#);
        write(&dir, "a.js", r#"import { u } from "./lib/util"; export const x = u;"#);
        write(&dir, "lib/util.js", "export const u = 1;");

        let bundle = bundle_for(&entry).await;
        assert!(bundle.contains(r#"{"./a.js":1}"#));
        assert!(bundle.contains(r#"{"./lib/util.js":2}"#));
    }

    #[tokio::test]
    async fn cyclic_modules_reference_each_other() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "a.js", r#"import { b } from "./b"; export const a = 1;"#);
        write(&dir, "b.js", r#"import { a } from "./a"; export const b = 2;"#);

        let bundle = bundle_for(&entry).await;
        assert!(bundle.contains(r#"{"./b.js":1}"#));
        assert!(bundle.contains(r#"{"./a.js":0}"#));
    }

    #[tokio::test]
    async fn runtime_caches_exports() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", "export const x = 1;");

        let bundle = bundle_for(&entry).await;
        // Cache record is installed before the unit executes.
        assert!(bundle.contains("var installed = {};"));
        let install_pos = bundle.find("installed[id] = module;").unwrap();
        let exec_pos = bundle
            .find("unit(localRequire, module, module.exports);")
            .unwrap();
        assert!(install_pos < exec_pos);
    }

    #[tokio::test]
    async fn synthesis_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", r#"import "./a"; import "./b";"#);
        write(&dir, "a.js", "export const a = 1;");
        write(&dir, "b.js", "export const b = 2;");

        let first = bundle_for(&entry).await;
        let second = bundle_for(&entry).await;
        assert_eq!(first, second);
    }
}
