//! Module descriptors
//!
//! A descriptor is computed once, at discovery time: target path, resolved
//! dependencies, template list and a snapshot of every input's text. Nothing
//! on it is recomputed or re-read later in the run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use crate::context::BuildContext;
use crate::discovery::find_files;
use crate::error::JoinResult;
use crate::files::{modified, read_trimmed};
use crate::glob::GlobFilter;
use crate::resolve::{DependencyResolver, Resolution};
use crate::target::{PathRewriteRegistry, TargetMapper};

#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub source_file: PathBuf,
    pub is_aggregator: bool,
    pub target_file: PathBuf,
    /// File name without `.js`; names the bundle's templates module.
    pub name: String,
    pub raw_contents: String,
    /// Empty for the aggregator, whose references are rewritten, not inlined.
    pub resolution: Resolution,
    /// Sorted templates found relative to the module's directory.
    pub templates: Vec<PathBuf>,
}

impl ModuleDescriptor {
    pub fn discover(
        source_file: PathBuf,
        is_aggregator: bool,
        mapper: &TargetMapper,
        resolver: &DependencyResolver,
        template_filter: &GlobFilter,
        registry: &mut PathRewriteRegistry,
    ) -> JoinResult<Self> {
        let target_file = mapper.map_target(&source_file, registry);
        let name = module_name(&source_file);
        let raw_contents = read_trimmed(&source_file)?;
        let templates = match source_file.parent() {
            Some(dir) => find_files(dir, template_filter),
            None => Vec::new(),
        };
        let resolution = if is_aggregator {
            Resolution::default()
        } else {
            resolver.resolve(&source_file, &raw_contents)?
        };

        Ok(ModuleDescriptor {
            source_file,
            is_aggregator,
            target_file,
            name,
            raw_contents,
            resolution,
            templates,
        })
    }

    /// Latest modification time over the source, inlined files and templates.
    pub fn newest_input(&self) -> JoinResult<SystemTime> {
        let mut newest = modified(&self.source_file)?;
        for file in self.resolution.internal_deps.iter().chain(&self.templates) {
            newest = newest.max(modified(file)?);
        }
        Ok(newest)
    }

    /// Whether the target must be rebuilt. `scope_root` bounds the change
    /// feed consulted for the aggregator; template recency is already part
    /// of [`newest_input`](Self::newest_input).
    pub fn is_stale(&self, ctx: &dyn BuildContext, scope_root: &Path) -> JoinResult<bool> {
        if !ctx.is_incremental() {
            return Ok(true);
        }
        if !self.target_file.exists() {
            info!("Join:: detected missing target {}", self.target_file.display());
            return Ok(true);
        }
        if self.newest_input()? > modified(&self.target_file)? {
            return Ok(true);
        }
        if self.is_aggregator {
            return self.aggregator_needs_build(ctx, scope_root);
        }
        Ok(false)
    }

    fn aggregator_needs_build(&self, ctx: &dyn BuildContext, scope_root: &Path) -> JoinResult<bool> {
        let deleted = ctx.deleted_files(scope_root)?;
        for file in &deleted {
            info!("Join:: detected deleted file: {}", file.display());
        }
        let changed = ctx.changed_files(scope_root)?;
        for file in &changed {
            info!("Join:: detected new/changed file: {}", file.display());
        }
        Ok(!changed.is_empty() || !deleted.is_empty())
    }
}

fn module_name(file: &Path) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.strip_suffix(".js") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}
