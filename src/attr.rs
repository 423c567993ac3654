//! Named per-element attributes and the schema that describes them.
//!
//! Every attribute is keyed by `"<element>_<property>"` (e.g.
//! `vertex_nx` or `face_label`), has a value kind (float or integer) and a
//! fixed arity (number of scalars per element). Values are stored in one flat
//! buffer per attribute, element-major.

use std::fmt;

use derive_more::From;
use fxhash::FxHashMap;

use crate::io::{Error, error};


// ===========================================================================
// ===== Element kinds
// ===========================================================================

/// The kind of element an attribute is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Face,
    Voxel,

    /// One value per (face, corner) pair, face-major.
    Corner,

    /// Any other element name found in a PLY header.
    Other(String),
}

impl ElementKind {
    /// Maps an element name as used in files and attribute keys to the
    /// element kind. Unknown names are kept as [`ElementKind::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "vertex" => ElementKind::Vertex,
            "face" => ElementKind::Face,
            "voxel" => ElementKind::Voxel,
            "corner" => ElementKind::Corner,
            other => ElementKind::Other(other.to_string()),
        }
    }

    /// The name used as prefix of attribute keys.
    pub fn name(&self) -> &str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Face => "face",
            ElementKind::Voxel => "voxel",
            ElementKind::Corner => "corner",
            ElementKind::Other(name) => name,
        }
    }

    /// Returns the attribute key for the property `prop` of this element.
    pub fn attribute_name(&self, prop: &str) -> String {
        format!("{}_{}", self.name(), prop)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}


// ===========================================================================
// ===== Value kinds and declared types
// ===========================================================================

/// Whether an attribute stores floating point or integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Float,
    Int,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            AttrKind::Float => "float",
            AttrKind::Int => "int",
        })
    }
}

/// The declared type of a structured OBJ attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    FloatScalar,
    IntScalar,

    /// Fixed length float vector with the given number of components.
    FloatVec(u8),
}

/// Type keywords accepted in `# attribute` declarations.
const TYPE_KEYWORDS: &[(&str, AttrType)] = &[
    ("real", AttrType::FloatScalar),
    ("float", AttrType::FloatScalar),
    ("double", AttrType::FloatScalar),
    ("integer", AttrType::IntScalar),
    ("boolean", AttrType::IntScalar),
    ("int", AttrType::IntScalar),
    ("bool", AttrType::IntScalar),
    ("vec2", AttrType::FloatVec(2)),
    ("vec3", AttrType::FloatVec(3)),
    ("vec4", AttrType::FloatVec(4)),
    ("Color", AttrType::FloatVec(4)),
];

impl AttrType {
    /// Looks up a type keyword. Returns `None` for unknown keywords.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        TYPE_KEYWORDS.iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, ty)| *ty)
    }

    pub fn kind(&self) -> AttrKind {
        match self {
            AttrType::IntScalar => AttrKind::Int,
            AttrType::FloatScalar | AttrType::FloatVec(_) => AttrKind::Float,
        }
    }

    /// Number of scalars per element.
    pub fn arity(&self) -> usize {
        match *self {
            AttrType::FloatScalar | AttrType::IntScalar => 1,
            AttrType::FloatVec(n) => n as usize,
        }
    }
}


// ===========================================================================
// ===== Values
// ===========================================================================

/// The flat value buffer of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    Float(Vec<f64>),
    Int(Vec<i32>),
}

impl AttributeValues {
    /// Creates an empty buffer of the given kind.
    pub fn new(kind: AttrKind) -> Self {
        match kind {
            AttrKind::Float => AttributeValues::Float(Vec::new()),
            AttrKind::Int => AttributeValues::Int(Vec::new()),
        }
    }

    pub fn kind(&self) -> AttrKind {
        match self {
            AttributeValues::Float(_) => AttrKind::Float,
            AttributeValues::Int(_) => AttrKind::Int,
        }
    }

    /// Total number of scalars (not elements!).
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Float(v) => v.len(),
            AttributeValues::Int(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            AttributeValues::Float(v) => Some(v),
            AttributeValues::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<&[i32]> {
        match self {
            AttributeValues::Int(v) => Some(v),
            AttributeValues::Float(_) => None,
        }
    }

    /// Returns the scalar at `idx` as `f64`, regardless of the kind. Panics
    /// if `idx` is out of bounds.
    pub fn value_as_f64(&self, idx: usize) -> f64 {
        match self {
            AttributeValues::Float(v) => v[idx],
            AttributeValues::Int(v) => v[idx].into(),
        }
    }
}


// ===========================================================================
// ===== The registry
// ===========================================================================

/// Index of a declared attribute inside an [`AttributeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From)]
pub struct AttrId(usize);

impl AttrId {
    fn idx(self) -> usize {
        self.0
    }
}

/// The schema entry of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    /// Full key, `"<element>_<property>"` for declared attributes.
    pub name: String,
    pub element: ElementKind,
    pub kind: AttrKind,

    /// Number of scalars per element.
    pub arity: usize,
}

/// Attribute schema plus value buffers of one parse session.
///
/// Names are unique; declaring a name twice is an error. All queries that
/// return several attributes do so in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    defs: Vec<AttributeDef>,
    values: Vec<AttributeValues>,
    ids: FxHashMap<String, AttrId>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the property `prop` of `element` under the key
    /// `"<element>_<prop>"` with an empty value buffer.
    pub fn declare(
        &mut self,
        element: ElementKind,
        prop: &str,
        kind: AttrKind,
        arity: usize,
    ) -> Result<AttrId, Error> {
        let name = element.attribute_name(prop);
        if self.ids.contains_key(&name) {
            return Err(error::duplicate_attribute(&element, prop));
        }

        Ok(self.push_def(AttributeDef { name, element, kind, arity }, AttributeValues::new(kind)))
    }

    /// Adds an attribute with an already complete value buffer under exactly
    /// the given name (no element prefix is added).
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        element: ElementKind,
        arity: usize,
        values: AttributeValues,
    ) -> Result<AttrId, Error> {
        let name = name.into();
        if self.ids.contains_key(&name) {
            return Err(error::duplicate_attribute(&element, &name));
        }

        let kind = values.kind();
        Ok(self.push_def(AttributeDef { name, element, kind, arity }, values))
    }

    fn push_def(&mut self, def: AttributeDef, values: AttributeValues) -> AttrId {
        let id = AttrId(self.defs.len());
        self.ids.insert(def.name.clone(), id);
        self.defs.push(def);
        self.values.push(values);
        id
    }

    pub fn id(&self, name: &str) -> Option<AttrId> {
        self.ids.get(name).copied()
    }

    pub fn def(&self, id: AttrId) -> &AttributeDef {
        &self.defs[id.idx()]
    }

    pub fn values(&self, id: AttrId) -> &AttributeValues {
        &self.values[id.idx()]
    }

    /// Appends a float value. It is truncated if the attribute is int-typed.
    pub fn push_float(&mut self, id: AttrId, value: f64) {
        match &mut self.values[id.idx()] {
            AttributeValues::Float(v) => v.push(value),
            AttributeValues::Int(v) => v.push(value as i32),
        }
    }

    /// Appends an integer value. It is converted if the attribute is
    /// float-typed.
    pub fn push_int(&mut self, id: AttrId, value: i32) {
        match &mut self.values[id.idx()] {
            AttributeValues::Float(v) => v.push(value.into()),
            AttributeValues::Int(v) => v.push(value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValues> {
        self.id(name).map(|id| self.values(id))
    }

    /// Total number of scalars stored for the given attribute.
    pub fn size_of(&self, name: &str) -> Option<usize> {
        self.get(name).map(|v| v.len())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// All attributes attached to `element`, in declaration order.
    pub fn of_element<'a>(
        &'a self,
        element: &'a ElementKind,
    ) -> impl Iterator<Item = (AttrId, &'a AttributeDef)> + 'a {
        self.iter().filter(move |(_, def)| def.element == *element)
    }

    /// All attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (AttrId, &AttributeDef)> + '_ {
        self.defs.iter().enumerate().map(|(i, def)| (AttrId(i), def))
    }

    /// Names of all float attributes in declaration order.
    pub fn float_names(&self) -> Vec<&str> {
        self.names_of_kind(AttrKind::Float)
    }

    /// Names of all integer attributes in declaration order.
    pub fn int_names(&self) -> Vec<&str> {
        self.names_of_kind(AttrKind::Int)
    }

    fn names_of_kind(&self, kind: AttrKind) -> Vec<&str> {
        self.defs.iter()
            .filter(|def| def.kind == kind)
            .map(|def| def.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
