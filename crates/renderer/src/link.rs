use std::rc::Rc;

use tracing::error;

use crate::attributes::{bind_attribute_locations, AttributeSlot};
use crate::backend::GraphicsBackend;
use crate::error::ProgramError;
use crate::handle::{self, GlObject};
use crate::types::VertexProgram;

/// A successfully linked program, ready for draw calls.
///
/// The stage objects it was built from are already detached; the program
/// only keeps the attribute slots that were fixed before linking.
#[derive(Debug)]
pub struct Program<H: Copy> {
    object: GlObject<H>,
    attribute_slots: Vec<AttributeSlot>,
}

impl<H: Copy> Program<H> {
    pub fn handle(&self) -> H {
        self.object.get()
    }

    pub fn attribute_slots(&self) -> &[AttributeSlot] {
        &self.attribute_slots
    }

    pub fn attribute_slot(&self, name: &str) -> Option<u32> {
        self.attribute_slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.index)
    }
}

/// Links a fragment and a vertex stage into a new program object.
///
/// Order of native calls: create, attach fragment, attach vertex, bind
/// attributes, link, read log, check status, detach both. On any failure the
/// program object is released by its handle and the stages stay owned by the
/// caller.
pub(crate) fn link_program<B>(
    backend: &Rc<B>,
    fragment: &GlObject<B::Shader>,
    vertex: &GlObject<B::Shader>,
    vertex_program: &VertexProgram,
) -> Result<Program<B::Program>, ProgramError>
where
    B: GraphicsBackend + 'static,
{
    let _span = tracing::trace_span!("link_program").entered();

    let program = handle::create_program(backend).ok_or(ProgramError::ProgramAllocation)?;

    backend.attach_shader(program.get(), fragment.get());
    backend.attach_shader(program.get(), vertex.get());

    let attribute_slots = bind_attribute_locations(&**backend, program.get(), vertex_program);

    backend.link_program(program.get());

    let log = backend.program_info_log(program.get());
    if !log.is_empty() {
        error!(stage = "program", "{}", log.trim_end());
    }

    if !backend.program_link_status(program.get()) {
        return Err(ProgramError::Link);
    }

    backend.detach_shader(program.get(), fragment.get());
    backend.detach_shader(program.get(), vertex.get());

    Ok(Program {
        object: program,
        attribute_slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StageKind;
    use crate::compile::compile_glsl;
    use crate::recording::{Call, RecordingBackend};

    fn stages(
        backend: &Rc<RecordingBackend>,
        fragment: &str,
        vertex: &str,
    ) -> (GlObject<u32>, GlObject<u32>) {
        (
            compile_glsl(backend, StageKind::Fragment, fragment).unwrap(),
            compile_glsl(backend, StageKind::Vertex, vertex).unwrap(),
        )
    }

    #[test]
    fn links_and_detaches_stages() {
        let backend = Rc::new(RecordingBackend::new());
        let (fragment, vertex) = stages(&backend, "frag", "vert");
        let descriptor = VertexProgram::new("vert").with_attribute(8, "color");

        let program = link_program(&backend, &fragment, &vertex, &descriptor).unwrap();
        let handle = program.handle();

        let calls = backend.calls();
        let tail = &calls[calls.len() - 7..];
        assert_eq!(
            tail,
            &[
                Call::CreateProgram(handle),
                Call::AttachShader {
                    program: handle,
                    shader: fragment.get(),
                },
                Call::AttachShader {
                    program: handle,
                    shader: vertex.get(),
                },
                Call::BindAttribLocation {
                    program: handle,
                    index: 2,
                    name: "color".into(),
                },
                Call::LinkProgram(handle),
                Call::DetachShader {
                    program: handle,
                    shader: fragment.get(),
                },
                Call::DetachShader {
                    program: handle,
                    shader: vertex.get(),
                },
            ]
        );
        assert!(backend.attached(handle).is_empty());
        assert_eq!(program.attribute_slot("color"), Some(2));
        assert_eq!(program.attribute_slot("missing"), None);
    }

    #[test]
    fn stages_can_be_released_after_link() {
        let backend = Rc::new(RecordingBackend::new());
        let (fragment, vertex) = stages(&backend, "frag", "vert");
        let program =
            link_program(&backend, &fragment, &vertex, &VertexProgram::new("vert")).unwrap();

        drop(fragment);
        drop(vertex);
        assert_eq!(backend.live_shaders(), 0);
        assert_eq!(backend.live_programs(), 1);

        drop(program);
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn link_failure_releases_program() {
        let backend = Rc::new(RecordingBackend::new());
        backend.fail_link_when("varying mismatch");
        let (fragment, vertex) = stages(&backend, "frag", "vert // varying mismatch");

        let err =
            link_program(&backend, &fragment, &vertex, &VertexProgram::new("vert")).unwrap_err();
        assert_eq!(err, ProgramError::Link);
        assert_eq!(backend.live_programs(), 0);
        assert!(!backend
            .calls()
            .iter()
            .any(|call| matches!(call, Call::DetachShader { .. })));
    }

    #[test]
    fn program_allocation_failure() {
        let backend = Rc::new(RecordingBackend::new());
        let (fragment, vertex) = stages(&backend, "frag", "vert");
        backend.fail_program_allocation(true);

        let err =
            link_program(&backend, &fragment, &vertex, &VertexProgram::new("vert")).unwrap_err();
        assert_eq!(err, ProgramError::ProgramAllocation);
        assert_eq!(backend.link_count(), 0);
    }
}
