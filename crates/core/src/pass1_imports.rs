//! Pass 1: import resolution.
//!
//! Every `import <target> from <source>` at the top of a file is removed
//! and recorded as a request. Each source is parsed once per session, has
//! its own imports resolved and its objects overlaid, and is then cached.
//! Once a file's imports are recorded, the requests are served into the
//! session's import table, where the overlay pass looks up bases that the
//! file itself does not define.

use crate::ast::{AbstractNode, Env};
use crate::compile::build_tree;
use crate::error::{CompileError, ErrorKind};
use crate::ids::IdTable;
use crate::pass2_overlay;
use crate::source::SourceProvider;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Target that requests every top-level definition of a source.
pub const IMPORT_ALL: &str = "*";

/// Session-wide import state: the parse cache, outstanding requests and
/// the import table they feed.
#[derive(Debug, Default)]
pub struct ImportResolver {
    cache: HashMap<PathBuf, Vec<AbstractNode>>,
    /// Cache keys in load order.
    loaded: Vec<PathBuf>,
    requests: HashMap<PathBuf, Vec<String>>,
    table: Vec<AbstractNode>,
    spliced: HashSet<(PathBuf, String)>,
    /// Sources currently being loaded, outermost first.
    loading: Vec<PathBuf>,
    parses: usize,
}

/// Borrowed session pieces an import load needs.
pub struct ImportContext<'a> {
    pub ids: &'a IdTable,
    pub provider: &'a dyn SourceProvider,
    pub globals: &'a mut Env,
    pub warnings: &'a mut Vec<CompileError>,
}

impl ImportResolver {
    /// Definitions made available by imports so far.
    pub fn table(&self) -> &[AbstractNode] {
        &self.table
    }

    /// Number of import sources parsed this session.
    pub fn parse_count(&self) -> usize {
        self.parses
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.cache.contains_key(path)
    }

    /// Remove the `Import` nodes from `nodes`, loading each source (relative
    /// to `base_dir`) and serving the accumulated requests into the import
    /// table.
    #[tracing::instrument(skip_all, fields(base_dir = %base_dir.display()))]
    pub fn process(
        &mut self,
        nodes: &mut Vec<AbstractNode>,
        base_dir: &Path,
        ctx: &mut ImportContext<'_>,
    ) -> Result<(), CompileError> {
        let mut imports = Vec::new();
        nodes.retain(|n| match n {
            AbstractNode::Import(i) => {
                imports.push(i.clone());
                false
            }
            _ => true,
        });
        if imports.is_empty() {
            return Ok(());
        }

        for import in &imports {
            let path = ctx
                .provider
                .resolve_import(base_dir, &import.source)
                .and_then(|p| ctx.provider.canonicalize(&p))
                .map_err(|e| {
                    CompileError::new(
                        ErrorKind::ImportNotFound,
                        &import.source,
                        &import.file,
                        import.line,
                    )
                    .with_detail(e.to_string())
                })?;

            if self.loading.contains(&path) {
                let mut chain: Vec<String> =
                    self.loading.iter().map(|p| p.display().to_string()).collect();
                chain.push(path.display().to_string());
                return Err(CompileError::new(
                    ErrorKind::ImportCycle,
                    &import.source,
                    &import.file,
                    import.line,
                )
                .with_detail(chain.join(" -> ")));
            }

            if self.cache.contains_key(&path) {
                tracing::debug!(source = %path.display(), "import cache hit");
            } else {
                self.load(&path, import.file.as_str(), import.line, ctx)?;
            }

            self.request(path, &import.target);
        }

        self.serve_requests();
        Ok(())
    }

    fn load(
        &mut self,
        path: &Path,
        from_file: &str,
        from_line: u32,
        ctx: &mut ImportContext<'_>,
    ) -> Result<(), CompileError> {
        let name = path.display().to_string();
        let text = ctx.provider.read_source(path).map_err(|e| {
            CompileError::new(ErrorKind::ImportNotFound, &name, from_file, from_line)
                .with_detail(e.to_string())
        })?;
        self.parses += 1;
        tracing::debug!(source = %name, "loading import");

        let mut nodes = build_tree(&text, &name, ctx.ids, ctx.globals)?;
        let dir = path.parent().unwrap_or(Path::new("")).to_owned();

        // Nested imports converge before this source is reused.
        self.loading.push(path.to_owned());
        let nested = self.process(&mut nodes, &dir, ctx);
        self.loading.pop();
        nested?;

        pass2_overlay::process_objects(&mut nodes, &self.table, ctx.warnings);

        self.cache.insert(path.to_owned(), nodes);
        self.loaded.push(path.to_owned());
        Ok(())
    }

    /// Record a request. `*` supersedes every named request for the source.
    fn request(&mut self, path: PathBuf, target: &str) {
        let targets = self.requests.entry(path).or_default();
        if target == IMPORT_ALL {
            targets.clear();
            targets.push(IMPORT_ALL.to_owned());
        } else if targets.first().map(String::as_str) != Some(IMPORT_ALL)
            && !targets.iter().any(|t| t == target)
        {
            targets.push(target.to_owned());
        }
    }

    fn serve_requests(&mut self) {
        for path in &self.loaded {
            let (Some(targets), Some(nodes)) = (self.requests.get(path), self.cache.get(path))
            else {
                continue;
            };
            for target in targets {
                if !self.spliced.insert((path.clone(), target.clone())) {
                    continue;
                }
                if target == IMPORT_ALL {
                    self.table.extend(nodes.iter().cloned());
                    continue;
                }
                let found = nodes
                    .iter()
                    .find(|n| n.as_object().is_some_and(|o| o.name() == Some(target.as_str())));
                match found {
                    Some(n) => self.table.push(n.clone()),
                    None => tracing::warn!(
                        source = %path.display(),
                        target = %target,
                        "import target not found"
                    ),
                }
            }
        }
    }
}
