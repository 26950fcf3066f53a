// Specifier resolution - raw import string + base directory -> canonical path

use crate::error::CompileError;
use std::path::{Path, PathBuf};

/// Maps raw import specifiers to canonical module identities.
///
/// Resolution order, first match wins:
/// 1. `base_dir/specifier + ext` for each extension in `extensions`, in order
/// 2. `base_dir/specifier/index` + the primary (first) extension
/// 3. the literal joined path, if it is a file
///
/// Note that an extension candidate is tried even when the specifier already
/// carries an extension, so `./a.js` matches `a.js` through step 3. The
/// ordering means `x.js` always beats `x/index.js` for specifier `./x`.
///
/// Matches are canonicalized so the same file reached through different
/// relative spellings yields one module identity.
#[derive(Debug, Clone)]
pub struct Resolver {
    extensions: Vec<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string(), ".node".to_string()],
        }
    }
}

impl Resolver {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Resolve `specifier` relative to `base_dir`.
    ///
    /// # Errors
    ///
    /// `CompileError::UnresolvedDependency` if no candidate exists.
    pub fn resolve(&self, base_dir: &Path, specifier: &str) -> Result<PathBuf, CompileError> {
        for ext in &self.extensions {
            let candidate = base_dir.join(format!("{specifier}{ext}"));
            if candidate.is_file() {
                return canonical(candidate);
            }
        }

        if let Some(primary) = self.extensions.first() {
            let index = base_dir.join(specifier).join(format!("index{primary}"));
            if index.is_file() {
                return canonical(index);
            }
        }

        let literal = base_dir.join(specifier);
        if literal.is_file() {
            return canonical(literal);
        }

        Err(CompileError::UnresolvedDependency {
            specifier: specifier.to_string(),
            base_dir: base_dir.to_path_buf(),
        })
    }
}

fn canonical(path: PathBuf) -> Result<PathBuf, CompileError> {
    path.canonicalize().map_err(CompileError::from)
}
