use std::mem::size_of;

use crate::backend::GraphicsBackend;
use crate::types::VertexProgram;

/// Input slot an attribute was bound to before linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    pub index: u32,
    pub name: String,
}

/// Slot for an attribute read at `byte_offset`: one slot per 32-bit word.
///
/// Offsets are word aligned by whoever produced the vertex layout; nothing
/// is checked here.
pub fn attribute_index(byte_offset: u32) -> u32 {
    byte_offset / size_of::<u32>() as u32
}

/// Binds every declared attribute of `vertex_program` on the unlinked `program`.
///
/// Locations are only fixed at link time if they are bound beforehand, so
/// this runs between attaching the stages and linking. Returns the bindings
/// that were issued, in offset order.
pub(crate) fn bind_attribute_locations<B>(
    backend: &B,
    program: B::Program,
    vertex_program: &VertexProgram,
) -> Vec<AttributeSlot>
where
    B: GraphicsBackend + ?Sized,
{
    let _span = tracing::trace_span!("bind_attribute_locations").entered();

    vertex_program
        .attribute_locations
        .iter()
        .map(|(&offset, name)| {
            let index = attribute_index(offset);
            backend.bind_attrib_location(program, index, name);
            AttributeSlot {
                index,
                name: name.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    #[test]
    fn offsets_map_to_word_slots() {
        assert_eq!(attribute_index(0), 0);
        assert_eq!(attribute_index(4), 1);
        assert_eq!(attribute_index(16), 4);
    }

    #[test]
    fn binds_every_declared_attribute() {
        let backend = RecordingBackend::new();
        let program = backend.create_program().unwrap();
        let vertex = VertexProgram::new("void main(){}")
            .with_attribute(0, "position")
            .with_attribute(12, "normal")
            .with_attribute(24, "uv");

        let slots = bind_attribute_locations(&backend, program, &vertex);

        assert_eq!(
            slots,
            vec![
                AttributeSlot {
                    index: 0,
                    name: "position".into()
                },
                AttributeSlot {
                    index: 3,
                    name: "normal".into()
                },
                AttributeSlot {
                    index: 6,
                    name: "uv".into()
                },
            ]
        );
        assert_eq!(
            backend.attribute_bindings(program),
            vec![
                (0, "position".to_string()),
                (3, "normal".to_string()),
                (6, "uv".to_string()),
            ]
        );
    }

    #[test]
    fn no_attributes_issue_no_calls() {
        let backend = RecordingBackend::new();
        let program = backend.create_program().unwrap();
        let slots = bind_attribute_locations(&backend, program, &VertexProgram::new("x"));
        assert!(slots.is_empty());
        assert!(backend.attribute_bindings(program).is_empty());
    }
}
