use std::rc::Rc;

use tracing::error;

use crate::backend::{GraphicsBackend, StageKind};
use crate::error::ProgramError;
use crate::handle::{self, GlObject};

/// Compiles one stage from GLSL source.
///
/// The stage object is owned by the returned handle from the moment it is
/// created, so every early return below releases it. The compiler's
/// diagnostic log is surfaced even when compilation succeeds, since warnings
/// are still worth a look when a shader permutation misbehaves.
pub(crate) fn compile_glsl<B>(
    backend: &Rc<B>,
    kind: StageKind,
    source: &str,
) -> Result<GlObject<B::Shader>, ProgramError>
where
    B: GraphicsBackend + 'static,
{
    let _span = tracing::trace_span!("compile_glsl", stage = %kind).entered();

    let shader =
        handle::create_shader(backend, kind).ok_or(ProgramError::StageAllocation(kind))?;

    backend.shader_source(shader.get(), source);
    backend.compile_shader(shader.get());

    let log = backend.shader_info_log(shader.get());
    if !log.is_empty() {
        error!(stage = %kind, "{}", log.trim_end());
    }

    if !backend.shader_compile_status(shader.get()) {
        return Err(ProgramError::StageCompile(kind));
    }

    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Call, RecordingBackend};

    #[test]
    fn compiles_valid_source() {
        let backend = Rc::new(RecordingBackend::new());
        let shader = compile_glsl(&backend, StageKind::Vertex, "void main(){}").unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::CreateShader {
                    kind: StageKind::Vertex,
                    shader: shader.get(),
                },
                Call::ShaderSource {
                    shader: shader.get(),
                    source: "void main(){}".into(),
                },
                Call::CompileShader(shader.get()),
            ]
        );
        assert_eq!(backend.live_shaders(), 1);
    }

    #[test]
    fn failed_compile_releases_the_stage() {
        let backend = Rc::new(RecordingBackend::new());
        backend.reject_source("syntax error");

        let err = compile_glsl(&backend, StageKind::Fragment, "syntax error").unwrap_err();
        assert_eq!(err, ProgramError::StageCompile(StageKind::Fragment));
        assert_eq!(backend.live_shaders(), 0);
        assert!(matches!(backend.calls().last(), Some(Call::DeleteShader(_))));
    }

    #[test]
    fn allocation_failure_issues_no_further_calls() {
        let backend = Rc::new(RecordingBackend::new());
        backend.fail_shader_allocation(true);

        let err = compile_glsl(&backend, StageKind::Vertex, "void main(){}").unwrap_err();
        assert_eq!(err, ProgramError::StageAllocation(StageKind::Vertex));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn warnings_do_not_fail_compilation() {
        let backend = Rc::new(RecordingBackend::new());
        backend.warn_on_source("highp", "WARNING: precision qualifier ignored");

        let shader = compile_glsl(&backend, StageKind::Fragment, "highp float x;");
        assert!(shader.is_ok());
    }
}
