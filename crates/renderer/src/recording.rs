//! Headless [`GraphicsBackend`] that records native calls instead of
//! issuing them.
//!
//! Compilation and linking always succeed unless a rule says otherwise:
//!
//! - [`RecordingBackend::reject_source`] fails compilation of any stage whose
//!   source contains the pattern, with a compiler-style log.
//! - [`RecordingBackend::warn_on_source`] lets such a stage compile but
//!   leaves a diagnostic log behind.
//! - [`RecordingBackend::fail_link_when`] fails linking of any program with an
//!   attached stage whose source contains the pattern.
//! - [`RecordingBackend::fail_shader_allocation`] and
//!   [`RecordingBackend::fail_program_allocation`] make object creation fail.
//!
//! Only calls that change native state are recorded; status and log queries
//! are not. This keeps call-order assertions readable.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::backend::{GraphicsBackend, StageKind};

/// One recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateShader { kind: StageKind, shader: u32 },
    DeleteShader(u32),
    ShaderSource { shader: u32, source: String },
    CompileShader(u32),
    CreateProgram(u32),
    DeleteProgram(u32),
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    BindAttribLocation { program: u32, index: u32, name: String },
    LinkProgram(u32),
}

#[derive(Debug, Default)]
struct ShaderRecord {
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    attached: Vec<u32>,
    bindings: BTreeMap<u32, String>,
    linked: bool,
    log: String,
}

#[derive(Debug, Default)]
struct State {
    next_name: u32,
    calls: Vec<Call>,
    shaders: BTreeMap<u32, ShaderRecord>,
    programs: BTreeMap<u32, ProgramRecord>,
    live: BTreeSet<u32>,
    rejected: Vec<String>,
    warnings: Vec<(String, String)>,
    link_failures: Vec<String>,
    fail_shader_allocation: bool,
    fail_program_allocation: bool,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_name += 1;
        self.live.insert(self.next_name);
        self.next_name
    }
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    state: RefCell<State>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_source(&self, pattern: impl Into<String>) {
        self.state.borrow_mut().rejected.push(pattern.into());
    }

    pub fn warn_on_source(&self, pattern: impl Into<String>, log: impl Into<String>) {
        self.state
            .borrow_mut()
            .warnings
            .push((pattern.into(), log.into()));
    }

    pub fn fail_link_when(&self, pattern: impl Into<String>) {
        self.state.borrow_mut().link_failures.push(pattern.into());
    }

    pub fn fail_shader_allocation(&self, fail: bool) {
        self.state.borrow_mut().fail_shader_allocation = fail;
    }

    pub fn fail_program_allocation(&self, fail: bool) {
        self.state.borrow_mut().fail_program_allocation = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of `compile_shader` calls issued so far.
    pub fn compile_count(&self) -> usize {
        self.count(|call| matches!(call, Call::CompileShader(_)))
    }

    /// Number of `link_program` calls issued so far.
    pub fn link_count(&self) -> usize {
        self.count(|call| matches!(call, Call::LinkProgram(_)))
    }

    /// Sources handed to `shader_source`, in call order.
    pub fn compiled_sources(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::ShaderSource { source, .. } => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    /// Shader objects created and not yet deleted.
    pub fn live_shaders(&self) -> usize {
        let state = self.state.borrow();
        state
            .live
            .iter()
            .filter(|name| state.shaders.contains_key(*name))
            .count()
    }

    /// Program objects created and not yet deleted.
    pub fn live_programs(&self) -> usize {
        let state = self.state.borrow();
        state
            .live
            .iter()
            .filter(|name| state.programs.contains_key(*name))
            .count()
    }

    /// Attribute locations bound on `program`, as `(index, name)` in index order.
    pub fn attribute_bindings(&self, program: u32) -> Vec<(u32, String)> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|record| {
                record
                    .bindings
                    .iter()
                    .map(|(index, name)| (*index, name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stages currently attached to `program`.
    pub fn attached(&self, program: u32) -> Vec<u32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|record| record.attached.clone())
            .unwrap_or_default()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }
}

impl GraphicsBackend for RecordingBackend {
    type Shader = u32;
    type Program = u32;

    fn create_shader(&self, kind: StageKind) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        if state.fail_shader_allocation {
            return None;
        }
        let shader = state.allocate();
        state.shaders.insert(shader, ShaderRecord::default());
        state.calls.push(Call::CreateShader { kind, shader });
        Some(shader)
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.live.remove(&shader);
        state.calls.push(Call::DeleteShader(shader));
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
        state.calls.push(Call::ShaderSource {
            shader,
            source: source.to_string(),
        });
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        let State {
            shaders,
            rejected,
            warnings,
            calls,
            ..
        } = &mut *state;
        if let Some(record) = shaders.get_mut(&shader) {
            let rejection = rejected
                .iter()
                .find(|pattern| record.source.contains(pattern.as_str()));
            match rejection {
                Some(pattern) => {
                    record.compiled = false;
                    record.log = format!("ERROR: 0:1: '{pattern}' : compilation rejected\n");
                }
                None => {
                    record.compiled = true;
                    record.log = warnings
                        .iter()
                        .find(|(pattern, _)| record.source.contains(pattern.as_str()))
                        .map(|(_, log)| log.clone())
                        .unwrap_or_default();
                }
            }
        }
        calls.push(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|record| record.compiled)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|record| record.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        if state.fail_program_allocation {
            return None;
        }
        let program = state.allocate();
        state.programs.insert(program, ProgramRecord::default());
        state.calls.push(Call::CreateProgram(program));
        Some(program)
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.live.remove(&program);
        state.calls.push(Call::DeleteProgram(program));
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.programs.get_mut(&program) {
            record.attached.push(shader);
        }
        state.calls.push(Call::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.programs.get_mut(&program) {
            record.attached.retain(|attached| *attached != shader);
        }
        state.calls.push(Call::DetachShader { program, shader });
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.programs.get_mut(&program) {
            record.bindings.insert(index, name.to_string());
        }
        state.calls.push(Call::BindAttribLocation {
            program,
            index,
            name: name.to_string(),
        });
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        let State {
            shaders,
            programs,
            link_failures,
            calls,
            ..
        } = &mut *state;
        if let Some(record) = programs.get_mut(&program) {
            let stages: Vec<&ShaderRecord> = record
                .attached
                .iter()
                .filter_map(|shader| shaders.get(shader))
                .collect();
            let uncompiled = stages.iter().any(|stage| !stage.compiled);
            let failure = link_failures.iter().find(|pattern| {
                stages
                    .iter()
                    .any(|stage| stage.source.contains(pattern.as_str()))
            });
            match (uncompiled, failure) {
                (true, _) => {
                    record.linked = false;
                    record.log = "error: attached shader was not compiled\n".to_string();
                }
                (false, Some(pattern)) => {
                    record.linked = false;
                    record.log = format!("error: link rejected: '{pattern}'\n");
                }
                (false, None) => {
                    record.linked = true;
                    record.log.clear();
                }
            }
        }
        calls.push(Call::LinkProgram(program));
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|record| record.linked)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|record| record.log.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_across_object_kinds() {
        let backend = RecordingBackend::new();
        let shader = backend.create_shader(StageKind::Vertex).unwrap();
        let program = backend.create_program().unwrap();
        assert_ne!(shader, program);
        assert_eq!(backend.live_shaders(), 1);
        assert_eq!(backend.live_programs(), 1);
    }

    #[test]
    fn rejected_source_reports_log_and_status() {
        let backend = RecordingBackend::new();
        backend.reject_source("syntax error");
        let shader = backend.create_shader(StageKind::Fragment).unwrap();
        backend.shader_source(shader, "syntax error");
        backend.compile_shader(shader);

        assert!(!backend.shader_compile_status(shader));
        assert!(backend.shader_info_log(shader).contains("syntax error"));
    }

    #[test]
    fn linking_uncompiled_stage_fails() {
        let backend = RecordingBackend::new();
        let shader = backend.create_shader(StageKind::Vertex).unwrap();
        let program = backend.create_program().unwrap();
        backend.attach_shader(program, shader);
        backend.link_program(program);

        assert!(!backend.program_link_status(program));
        assert!(!backend.program_info_log(program).is_empty());
    }
}
