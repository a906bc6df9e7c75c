use std::fmt;

/// Pipeline point a shader stage is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Native graphics API surface the program pipeline is expressed through.
///
/// Every method maps onto one call of a GL-style API and is issued from the
/// thread that owns the current context. Implementations use interior state
/// (the native driver, or a recorder in tests), so all calls take `&self`.
///
/// Handles are plain copyable names; ownership and release are layered on
/// top by [`GlObject`](crate::GlObject).
pub trait GraphicsBackend {
    type Shader: Copy + fmt::Debug + 'static;
    type Program: Copy + fmt::Debug + 'static;

    /// Allocates a shader stage object, or `None` when the driver refuses.
    fn create_shader(&self, kind: StageKind) -> Option<Self::Shader>;
    fn delete_shader(&self, shader: Self::Shader);
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    /// Diagnostic log of the last compile; empty when the compiler had nothing to say.
    fn shader_info_log(&self, shader: Self::Shader) -> String;

    /// Allocates an empty program object, or `None` when the driver refuses.
    fn create_program(&self) -> Option<Self::Program>;
    fn delete_program(&self, program: Self::Program);
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    /// Diagnostic log of the last link; empty when the linker had nothing to say.
    fn program_info_log(&self, program: Self::Program) -> String;
}
