//! OpenGL backend over `glow`.

use glow::HasContext;

use crate::backend::{GraphicsBackend, StageKind};

/// Issues program pipeline calls against a live OpenGL context.
pub struct GlowBackend {
    gl: glow::Context,
}

impl GlowBackend {
    /// # Safety
    ///
    /// `gl` must stay current on the calling thread for as long as this
    /// backend, or any object created through it, is alive.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn shader_type(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => glow::VERTEX_SHADER,
        StageKind::Fragment => glow::FRAGMENT_SHADER,
    }
}

// SAFETY (all blocks below): `GlowBackend::new` requires the context to be
// current for the backend's whole lifetime, and every handle passed in was
// created by this same context.
impl GraphicsBackend for GlowBackend {
    type Shader = <glow::Context as HasContext>::Shader;
    type Program = <glow::Context as HasContext>::Program;

    fn create_shader(&self, kind: StageKind) -> Option<Self::Shader> {
        unsafe { self.gl.create_shader(shader_type(kind)) }.ok()
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.delete_shader(shader) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn create_program(&self) -> Option<Self::Program> {
        unsafe { self.gl.create_program() }.ok()
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str) {
        unsafe { self.gl.bind_attrib_location(program, index, name) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.gl.get_program_info_log(program) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_stage_kinds_to_gl_enums() {
        assert_eq!(shader_type(StageKind::Vertex), glow::VERTEX_SHADER);
        assert_eq!(shader_type(StageKind::Fragment), glow::FRAGMENT_SHADER);
    }
}
