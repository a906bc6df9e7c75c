use crate::backend::StageKind;

/// Why a program request produced no program.
///
/// None of these are fatal to the renderer; the draw that asked for the
/// program is skipped for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("failed to allocate {0} shader object")]
    StageAllocation(StageKind),
    #[error("{0} shader failed to compile")]
    StageCompile(StageKind),
    #[error("failed to allocate program object")]
    ProgramAllocation,
    #[error("program failed to link")]
    Link,
}
