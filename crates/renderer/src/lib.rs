//! GLSL program compilation and caching for the renderer.
//!
//! The shader translator hands the renderer one generated source string per
//! stage. Turning those into a usable program is slow, so each distinct pair
//! is compiled and linked once and reused for every draw after that:
//!
//! ```text
//!   draw call ──▶ RenderContext::compile_program(DrawState)
//!                        │
//!                        ▼
//!                 ProgramCache ──hit──▶ shared Program
//!                        │ miss
//!                        ▼
//!          compile fragment ─▶ compile vertex ─▶ bind attributes ─▶ link
//!                        │                                          │
//!                        └──── any failure: logged, nothing cached  └─▶ cache + return
//! ```
//!
//! All native calls go through [`GraphicsBackend`]. [`GlowBackend`] drives a
//! real OpenGL context; [`recording::RecordingBackend`] records calls and
//! simulates outcomes, so the pipeline can run without a GPU.
//!
//! Compiler and linker logs are reported with `tracing::error!`. When a
//! request fails, the offending source text is logged under
//! [`CRITICAL_TARGET`] so shader permutations can be diagnosed offline.

mod attributes;
mod backend;
mod cache;
mod compile;
mod context;
mod error;
#[cfg(feature = "glow")]
mod gl;
mod handle;
mod link;
pub mod recording;
mod types;

pub use attributes::{attribute_index, AttributeSlot};
pub use backend::{GraphicsBackend, StageKind};
pub use cache::{CacheStats, ProgramCache, SharedProgram};
pub use cacheconfig::{CacheConfig, ConfigError};
pub use context::RenderContext;
pub use error::ProgramError;
#[cfg(feature = "glow")]
pub use gl::GlowBackend;
pub use handle::GlObject;
pub use link::Program;
pub use types::{AttributeLocations, DrawState, FragmentProgram, SourcePair, VertexProgram};

/// Log target for failed compiles and links, carrying the full source text.
pub const CRITICAL_TARGET: &str = "renderer::critical";
