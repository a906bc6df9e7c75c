use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Vertex-buffer byte offset mapped to the attribute name read at that offset.
pub type AttributeLocations = BTreeMap<u32, String>;

/// Generated fragment stage, as handed over by the shader translator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentProgram {
    pub glsl: String,
}

impl FragmentProgram {
    pub fn new(glsl: impl Into<String>) -> Self {
        Self { glsl: glsl.into() }
    }
}

/// Generated vertex stage plus the attribute layout the draw call feeds it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexProgram {
    pub glsl: String,
    pub attribute_locations: AttributeLocations,
}

impl VertexProgram {
    pub fn new(glsl: impl Into<String>) -> Self {
        Self {
            glsl: glsl.into(),
            attribute_locations: AttributeLocations::new(),
        }
    }

    /// Declares the attribute read at `byte_offset` of each vertex.
    pub fn with_attribute(mut self, byte_offset: u32, name: impl Into<String>) -> Self {
        self.attribute_locations.insert(byte_offset, name.into());
        self
    }
}

/// Programs selected by the current draw state.
///
/// Both are expected to be set by the time a draw reaches the renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawState<'a> {
    pub fragment_program: Option<&'a FragmentProgram>,
    pub vertex_program: Option<&'a VertexProgram>,
}

impl<'a> DrawState<'a> {
    pub fn new(fragment: &'a FragmentProgram, vertex: &'a VertexProgram) -> Self {
        Self {
            fragment_program: Some(fragment),
            vertex_program: Some(vertex),
        }
    }
}

/// Cache key: the exact fragment and vertex source text of a program.
///
/// Comparison is byte-for-byte. Sources that differ only in whitespace are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    fragment: String,
    vertex: String,
}

impl SourcePair {
    pub fn new(fragment: impl Into<String>, vertex: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            vertex: vertex.into(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn vertex(&self) -> &str {
        &self.vertex
    }
}

/// Borrowed view of a source pair, so the map can be probed with two `&str`
/// without building an owned [`SourcePair`].
pub trait PairKey {
    fn fragment(&self) -> &str;
    fn vertex(&self) -> &str;
}

impl PairKey for SourcePair {
    fn fragment(&self) -> &str {
        &self.fragment
    }

    fn vertex(&self) -> &str {
        &self.vertex
    }
}

impl PairKey for (&str, &str) {
    fn fragment(&self) -> &str {
        self.0
    }

    fn vertex(&self) -> &str {
        self.1
    }
}

// `Hash` for `SourcePair` and `dyn PairKey` must feed the hasher identically.
impl Hash for SourcePair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        PairKey::fragment(self).hash(state);
        PairKey::vertex(self).hash(state);
    }
}

impl Hash for dyn PairKey + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fragment().hash(state);
        self.vertex().hash(state);
    }
}

impl PartialEq for dyn PairKey + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.fragment() == other.fragment() && self.vertex() == other.vertex()
    }
}

impl Eq for dyn PairKey + '_ {}

impl<'a> Borrow<dyn PairKey + 'a> for SourcePair {
    fn borrow(&self) -> &(dyn PairKey + 'a) {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashMap;

    use super::*;

    fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn borrowed_key_hashes_like_owned_key() {
        let owned = SourcePair::new("frag", "vert");
        let borrowed = ("frag", "vert");
        assert_eq!(hash_of(&owned), hash_of(&borrowed as &dyn PairKey));
    }

    #[test]
    fn map_lookup_by_borrowed_pair() {
        let mut map = HashMap::new();
        map.insert(SourcePair::new("frag", "vert"), 1);

        assert_eq!(map.get(&("frag", "vert") as &dyn PairKey), Some(&1));
        assert_eq!(map.get(&("vert", "frag") as &dyn PairKey), None);
    }

    #[test]
    fn keys_are_not_normalized() {
        let a = SourcePair::new("void main(){}", "void main(){}");
        let b = SourcePair::new("void main() {}", "void main(){}");
        assert_ne!(a, b);
    }

    #[test]
    fn vertex_program_collects_attributes() {
        let program = VertexProgram::new("void main(){}")
            .with_attribute(0, "position")
            .with_attribute(12, "uv");
        assert_eq!(program.attribute_locations.len(), 2);
        assert_eq!(program.attribute_locations[&12], "uv");
    }
}
