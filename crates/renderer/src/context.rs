use std::path::Path;
use std::rc::Rc;

use anyhow::{Context as AnyhowContext, Result};
use cacheconfig::CacheConfig;
use tracing::info;

use crate::backend::GraphicsBackend;
use crate::cache::{ProgramCache, SharedProgram};
use crate::types::DrawState;

/// Renderer-wide state tied to one graphics context.
///
/// Owns the backend and the program cache for the lifetime of the context.
/// Everything here is `!Send`: native objects may only be created and
/// released on the thread the graphics context is current on, and `Rc`
/// keeps the cache and every program it hands out on that thread.
pub struct RenderContext<B: GraphicsBackend> {
    backend: Rc<B>,
    programs: ProgramCache<B>,
}

impl<B: GraphicsBackend + 'static> RenderContext<B> {
    pub fn new(backend: B, config: CacheConfig) -> Self {
        Self {
            backend: Rc::new(backend),
            programs: ProgramCache::with_config(config),
        }
    }

    /// Creates the context with cache settings read from a TOML file.
    pub fn from_config_file(backend: B, path: &Path) -> Result<Self> {
        let config = CacheConfig::from_path(path).with_context(|| {
            format!("failed to load program cache config from {}", path.display())
        })?;
        info!(path = %path.display(), "loaded program cache config");
        Ok(Self::new(backend, config))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn programs(&self) -> &ProgramCache<B> {
        &self.programs
    }

    /// Returns the linked program for the draw state's fragment and vertex
    /// programs, compiling it on first use.
    ///
    /// `None` means the draw should be skipped this frame.
    pub fn compile_program(&mut self, state: &DrawState<'_>) -> Option<SharedProgram<B::Program>> {
        debug_assert!(
            state.fragment_program.is_some() && state.vertex_program.is_some(),
            "draw state must select both a fragment and a vertex program"
        );
        let (Some(fragment), Some(vertex)) = (state.fragment_program, state.vertex_program) else {
            return None;
        };

        self.programs.get_or_compile(&self.backend, fragment, vertex)
    }

    /// Releases the cache's references. Called on renderer shutdown while the
    /// graphics context is still current.
    pub fn clear_programs(&mut self) {
        let released = self.programs.len();
        self.programs.clear();
        info!(released, "cleared program cache");
    }
}
