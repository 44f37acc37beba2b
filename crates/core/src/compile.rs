//! Compile driver: runs the front-end passes over one file or a batch.
//!
//! Per file: lex -> parse -> build -> imports -> overlay -> variables.
//! Fatal errors abandon the file; soft ones are returned as warnings. The
//! import cache, import table and global variables live in the
//! [`Session`] and are shared by every file it compiles.

use crate::ast::{AbstractNode, Env};
use crate::builder::Builder;
use crate::error::{CompileError, ErrorKind};
use crate::ids::IdTable;
use crate::pass1_imports::{ImportContext, ImportResolver};
use crate::source::{FileSystemProvider, SourceProvider};
use crate::{lexer, parser, pass2_overlay, pass3_variables};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Lex, parse and build one script. Top-level `set`s are applied to
/// `globals`.
pub fn build_tree(
    text: &str,
    name: &str,
    ids: &IdTable,
    globals: &mut Env,
) -> Result<Vec<AbstractNode>, CompileError> {
    let tokens = lexer::lex(text, name)?;
    let cst = parser::parse(tokens)?;
    Builder::new(ids, globals).build(&cst)
}

/// Remove abstract objects at every depth. Variables inside them were never
/// expanded, and only top-level objects can serve as bases.
fn drop_abstract(nodes: &mut Vec<AbstractNode>) {
    nodes.retain(|n| !n.as_object().is_some_and(|o| o.is_abstract));
    for node in nodes.iter_mut() {
        if let Some(obj) = node.as_object_mut() {
            drop_abstract(&mut obj.children);
        }
    }
}

/// A resolved file, ready for an emitter.
#[derive(Debug, Clone, Serialize)]
pub struct CompileOutput {
    pub nodes: Vec<AbstractNode>,
    pub warnings: Vec<CompileError>,
}

#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: Result<CompileOutput, CompileError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }
}

pub struct Session {
    ids: IdTable,
    provider: Box<dyn SourceProvider>,
    globals: Env,
    imports: ImportResolver,
    keep_abstract: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    /// Built-in keyword table, files read from disk.
    pub fn new() -> Self {
        Session::with_provider(FileSystemProvider)
    }

    pub fn with_provider(provider: impl SourceProvider + 'static) -> Self {
        Session {
            ids: IdTable::builtin(),
            provider: Box::new(provider),
            globals: Env::new(),
            imports: ImportResolver::default(),
            keep_abstract: false,
        }
    }

    pub fn with_ids(mut self, ids: IdTable) -> Self {
        self.ids = ids;
        self
    }

    /// Keep abstract top-level objects in the output instead of dropping
    /// them.
    pub fn keep_abstract(mut self, keep: bool) -> Self {
        self.keep_abstract = keep;
        self
    }

    pub fn ids(&self) -> &IdTable {
        &self.ids
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn imports(&self) -> &ImportResolver {
        &self.imports
    }

    /// Compile script text. `name` is used in diagnostics; imports resolve
    /// against `base_dir`.
    #[tracing::instrument(skip_all, fields(file = name))]
    pub fn compile_source(
        &mut self,
        text: &str,
        name: &str,
        base_dir: &Path,
    ) -> Result<CompileOutput, CompileError> {
        let mut nodes = build_tree(text, name, &self.ids, &mut self.globals)?;
        let mut warnings = Vec::new();

        let mut ctx = ImportContext {
            ids: &self.ids,
            provider: self.provider.as_ref(),
            globals: &mut self.globals,
            warnings: &mut warnings,
        };
        self.imports.process(&mut nodes, base_dir, &mut ctx)?;

        pass2_overlay::process_objects(&mut nodes, self.imports.table(), &mut warnings);
        pass3_variables::process_variables(&mut nodes, &self.ids, &self.globals)?;

        if !self.keep_abstract {
            drop_abstract(&mut nodes);
        }
        tracing::debug!(nodes = nodes.len(), warnings = warnings.len(), "compiled");
        Ok(CompileOutput { nodes, warnings })
    }

    pub fn compile_file(&mut self, path: &Path) -> Result<CompileOutput, CompileError> {
        let name = path.display().to_string();
        let text = self.provider.read_source(path).map_err(|e| {
            CompileError::new(ErrorKind::FileNotFound, &name, &name, 0).with_detail(e.to_string())
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("")).to_owned();
        self.compile_source(&text, &name, &base_dir)
    }

    /// Compile files in order. A failing file is reported and skipped; the
    /// session state built by earlier files is kept.
    pub fn compile_batch<P: AsRef<Path>>(&mut self, paths: &[P]) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            let path = path.as_ref();
            let outcome = self.compile_file(path);
            if let Err(err) = &outcome {
                tracing::error!(file = %path.display(), %err, "compile failed");
            }
            report.files.push(FileResult {
                path: path.to_owned(),
                outcome,
            });
        }
        tracing::info!(
            "Build: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    fn session() -> Session {
        Session::with_provider(
            InMemoryProvider::default()
                .with_file("/s/base.material", "abstract material Base {\n lighting off\n}\n")
                .with_file("/s/a.material", "import * from base.material\nmaterial A : Base {\n}\n")
                .with_file("/s/broken.material", "material B {\n p $nope\n}\n"),
        )
    }

    #[test]
    fn abstract_objects_are_dropped_from_output() {
        let mut s = session();
        let out = s.compile_file(Path::new("/s/a.material")).unwrap();
        assert_eq!(out.nodes.len(), 1);
        let a = out.nodes[0].as_object().unwrap();
        assert_eq!(a.name(), Some("A"));
        assert!(a.property("lighting").is_some());

        let mut s = session().keep_abstract(true);
        let out = s
            .compile_source("abstract pass P {\n}\n", "inline", Path::new("/s"))
            .unwrap();
        assert_eq!(out.nodes.len(), 1);
    }

    #[test]
    fn unreadable_root_is_file_not_found() {
        let mut s = session();
        let err = s.compile_file(Path::new("/s/missing.material")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }

    #[test]
    fn batch_continues_past_failures() {
        let mut s = session();
        let report = s.compile_batch(&["/s/a.material", "/s/broken.material", "/s/base.material"]);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        let err = report.files[1].outcome.as_ref().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
        assert_eq!(err.file, "/s/broken.material");
    }

    #[test]
    fn globals_persist_across_files() {
        let mut s = session();
        s.compile_source("set $shared 7\n", "one", Path::new("/s")).unwrap();
        let out = s
            .compile_source("material M {\n p $shared\n}\n", "two", Path::new("/s"))
            .unwrap();
        let m = out.nodes[0].as_object().unwrap();
        assert_eq!(m.property("p").unwrap().texts(), vec!["7"]);
    }
}
