//! File-system module resolution.
//!
//! Resolves `use project/path/to/file` imports against a project rooted at
//! an `ard.toml` manifest. Parsed-and-checked modules are cached by
//! canonical path behind a mutex so a cache shared between checkers
//! resolves each import exactly once; in-flight imports are tracked as a
//! chain and a repeated path reports the full cycle instead of overflowing
//! the stack.

use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::check::Checker;
use crate::modules::{Module, ModuleResolver, ResolveError};

/// The `ard.toml` project manifest. Only the project name is required.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,
}

impl Manifest {
    /// Parse manifest text.
    pub fn parse(text: &str) -> Result<Manifest, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Walk up from `dir` looking for an `ard.toml`. Returns the manifest
    /// and the directory containing it. Falls back to `dir` itself with its
    /// base name when no manifest exists.
    pub fn discover(dir: &Path) -> (Manifest, PathBuf) {
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let manifest_path = candidate.join("ard.toml");
            if manifest_path.is_file() {
                if let Ok(text) = std::fs::read_to_string(&manifest_path) {
                    if let Ok(manifest) = Manifest::parse(&text) {
                        return (manifest, candidate.to_path_buf());
                    }
                }
            }
            current = candidate.parent();
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string());
        (Manifest { name }, dir.to_path_buf())
    }
}

/// Resolves user modules from the project's source tree.
pub struct FileResolver {
    project_name: String,
    project_root: PathBuf,
    cache: Mutex<FxHashMap<PathBuf, Rc<Module>>>,
    /// Import paths currently being loaded, outermost first.
    loading: Mutex<Vec<String>>,
    /// Handle to ourselves, handed to the checkers we spawn so nested
    /// imports resolve through the same cache.
    self_handle: Weak<FileResolver>,
}

impl FileResolver {
    /// Create a resolver for the project containing `dir`.
    pub fn from_dir(dir: &Path) -> Rc<Self> {
        let (manifest, root) = Manifest::discover(dir);
        Rc::new_cyclic(|weak| FileResolver {
            project_name: manifest.name,
            project_root: root,
            cache: Mutex::new(FxHashMap::default()),
            loading: Mutex::new(Vec::new()),
            self_handle: weak.clone(),
        })
    }

    /// The project name imports must start with.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    fn module_file(&self, import_path: &str) -> Option<PathBuf> {
        let rest = import_path.strip_prefix(&self.project_name)?;
        let rest = rest.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        let mut file = self.project_root.clone();
        for segment in rest.split('/') {
            file.push(segment);
        }
        file.set_extension("ard");
        Some(file)
    }
}

impl ModuleResolver for FileResolver {
    fn resolve_import(&self, path: &str) -> Result<Rc<Module>, ResolveError> {
        let file = self
            .module_file(path)
            .ok_or_else(|| ResolveError::NotFound { path: path.to_string() })?;
        let canonical = file
            .canonicalize()
            .map_err(|_| ResolveError::NotFound { path: path.to_string() })?;

        if let Some(cached) = self.cache.lock().unwrap().get(&canonical) {
            return Ok(cached.clone());
        }

        {
            let mut loading = self.loading.lock().unwrap();
            if loading.iter().any(|p| p == path) {
                let mut chain = loading.clone();
                chain.push(path.to_string());
                return Err(ResolveError::Cycle { chain });
            }
            loading.push(path.to_string());
        }
        // Anything below must pop the loading entry before returning.
        let result = self.load(path, &canonical);
        self.loading.lock().unwrap().pop();

        let module = result?;
        let module = Rc::new(module);
        self.cache
            .lock()
            .unwrap()
            .insert(canonical, module.clone());
        Ok(module)
    }
}

impl FileResolver {
    fn load(&self, path: &str, file: &Path) -> Result<Module, ResolveError> {
        let source = std::fs::read_to_string(file).map_err(|e| ResolveError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let parse = ard_parser::parse(&source);
        if parse.has_errors() {
            return Err(ResolveError::Parse {
                path: path.to_string(),
                errors: parse.errors.len(),
            });
        }
        let resolver: Rc<dyn ModuleResolver> = self
            .self_handle
            .upgrade()
            .expect("resolver outlives the checkers it spawns");
        let mut checker = Checker::new(file, parse, Some(resolver));
        checker.check();
        if checker.has_errors() {
            let errors = checker
                .diagnostics()
                .iter()
                .filter(|d| d.kind == crate::error::Severity::Error)
                .count();
            return Err(ResolveError::Check { path: path.to_string(), errors });
        }
        Ok(checker.into_module())
    }
}
