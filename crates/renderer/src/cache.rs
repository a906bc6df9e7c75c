//! Program cache keyed by exact source text.
//!
//! Compiling and linking a GLSL program costs milliseconds while a draw call
//! costs microseconds, so every distinct (fragment, vertex) source pair is
//! compiled at most once per cache lifetime. The hit path is a single map
//! probe with borrowed keys; nothing is logged or allocated.
//!
//! There is no eviction. The key space is bounded by the shader permutations
//! the content generates, which is fine for a renderer and wrong for an
//! open-ended key space. `entry_warning_threshold` exists to notice when
//! that assumption breaks.
//!
//! Failed requests are never cached: the next request for the same pair
//! compiles again.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use cacheconfig::CacheConfig;
use tracing::{debug, error, warn};

use crate::backend::{GraphicsBackend, StageKind};
use crate::compile::compile_glsl;
use crate::error::ProgramError;
use crate::link::{link_program, Program};
use crate::types::{FragmentProgram, PairKey, SourcePair, VertexProgram};
use crate::CRITICAL_TARGET;

/// Linked program shared between the cache and any number of draw calls.
pub type SharedProgram<H> = Rc<Program<H>>;

/// Request counters since the cache was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

pub struct ProgramCache<B: GraphicsBackend> {
    entries: HashMap<SourcePair, SharedProgram<B::Program>>,
    stats: CacheStats,
    config: CacheConfig,
    size_warning_issued: bool,
}

impl<B: GraphicsBackend + 'static> ProgramCache<B> {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::with_capacity(config.initial_capacity),
            stats: CacheStats::default(),
            config,
            size_warning_issued: false,
        }
    }

    /// Returns the program for this source pair, compiling it on first use.
    ///
    /// `None` means the program is unavailable for this draw; the reason has
    /// already been logged.
    pub fn get_or_compile(
        &mut self,
        backend: &Rc<B>,
        fragment: &FragmentProgram,
        vertex: &VertexProgram,
    ) -> Option<SharedProgram<B::Program>> {
        self.try_get_or_compile(backend, fragment, vertex).ok()
    }

    /// Like [`get_or_compile`](Self::get_or_compile), but reports why the
    /// request failed.
    pub fn try_get_or_compile(
        &mut self,
        backend: &Rc<B>,
        fragment: &FragmentProgram,
        vertex: &VertexProgram,
    ) -> Result<SharedProgram<B::Program>, ProgramError> {
        let probe = (fragment.glsl.as_str(), vertex.glsl.as_str());
        if let Some(program) = self.entries.get(&probe as &dyn PairKey) {
            self.stats.hits += 1;
            return Ok(Rc::clone(program));
        }

        self.stats.misses += 1;
        let started = Instant::now();
        let result = build_program(backend, fragment, vertex);
        self.warn_if_slow(started);

        match result {
            Ok(program) => {
                let program = Rc::new(program);
                self.entries.insert(
                    SourcePair::new(fragment.glsl.as_str(), vertex.glsl.as_str()),
                    Rc::clone(&program),
                );
                debug!(entries = self.entries.len(), "cached linked program");
                self.warn_if_large();
                Ok(program)
            }
            Err(err) => {
                self.stats.failures += 1;
                self.report_failure(err, fragment, vertex);
                Err(err)
            }
        }
    }

    /// Probes the cache without compiling.
    pub fn get(&self, fragment: &str, vertex: &str) -> Option<SharedProgram<B::Program>> {
        self.entries
            .get(&(fragment, vertex) as &dyn PairKey)
            .map(Rc::clone)
    }

    pub fn contains(&self, fragment: &str, vertex: &str) -> bool {
        self.entries.contains_key(&(fragment, vertex) as &dyn PairKey)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Drops every cached reference. Programs still held by callers live on
    /// until their last reference goes away.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size_warning_issued = false;
    }

    fn report_failure(
        &self,
        err: ProgramError,
        fragment: &FragmentProgram,
        vertex: &VertexProgram,
    ) {
        let sources = match err {
            ProgramError::StageCompile(StageKind::Fragment) => {
                vec![(StageKind::Fragment, fragment.glsl.as_str())]
            }
            ProgramError::StageCompile(StageKind::Vertex) => {
                vec![(StageKind::Vertex, vertex.glsl.as_str())]
            }
            ProgramError::Link => vec![
                (StageKind::Fragment, fragment.glsl.as_str()),
                (StageKind::Vertex, vertex.glsl.as_str()),
            ],
            ProgramError::StageAllocation(_) | ProgramError::ProgramAllocation => {
                debug!(error = %err, "program request aborted");
                return;
            }
        };

        for (kind, source) in sources {
            if self.config.log_failed_sources {
                error!(
                    target: CRITICAL_TARGET,
                    error = %err,
                    "Error in compiled {kind} shader:\n{source}"
                );
            } else {
                error!(
                    target: CRITICAL_TARGET,
                    error = %err,
                    "Error in compiled {kind} shader ({} bytes of source)",
                    source.len()
                );
            }
        }
    }

    fn warn_if_slow(&self, started: Instant) {
        let Some(limit) = self.config.slow_compile_warning else {
            return;
        };
        let elapsed = started.elapsed();
        if elapsed > limit {
            warn!(
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                limit_ms = limit.as_secs_f64() * 1000.0,
                "shader program compile exceeded time budget"
            );
        }
    }

    fn warn_if_large(&mut self) {
        let Some(threshold) = self.config.entry_warning_threshold else {
            return;
        };
        if !self.size_warning_issued && self.entries.len() >= threshold {
            self.size_warning_issued = true;
            warn!(
                entries = self.entries.len(),
                threshold, "program cache keeps growing; shader permutations may be unbounded"
            );
        }
    }
}

impl<B: GraphicsBackend + 'static> Default for ProgramCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fragment compile, then vertex compile, then link. The order is fixed:
/// when both stages are broken the fragment error is the one reported, and
/// the vertex stage is never compiled.
fn build_program<B>(
    backend: &Rc<B>,
    fragment: &FragmentProgram,
    vertex: &VertexProgram,
) -> Result<Program<B::Program>, ProgramError>
where
    B: GraphicsBackend + 'static,
{
    let _span = tracing::trace_span!("compile_program").entered();

    let fragment_shader = compile_glsl(backend, StageKind::Fragment, &fragment.glsl)?;
    let vertex_shader = compile_glsl(backend, StageKind::Vertex, &vertex.glsl)?;
    link_program(backend, &fragment_shader, &vertex_shader, vertex)
}
