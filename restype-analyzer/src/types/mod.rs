pub mod reference;



use std::{collections::HashSet, fmt::Display, sync::Arc};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub use self::reference::{InvalidReferenceFormatError, ResourceTypeReference};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
  Any,
  Null,
  Bool,
  Int,
  String,
  Object,
  Array,
  ResourceRef,
}

impl Display for PrimitiveType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}",
      match self {
        Self::Any => "any",
        Self::Null => "null",
        Self::Bool => "bool",
        Self::Int => "int",
        Self::String => "string",
        Self::Object => "object",
        Self::Array => "array",
        Self::ResourceRef => "resourceRef",
      }
    )
  }
}

pub static ANY: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::Any);
pub static NULL: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::Null);
pub static BOOL: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::Bool);
pub static INT: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::Int);
pub static STRING: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::String);
pub static OBJECT: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::Object);
pub static ARRAY: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::Array);
pub static RESOURCE_REF: TypeSymbol = TypeSymbol::Primitive(PrimitiveType::ResourceRef);

impl PrimitiveType {
  /// The canonical symbol for this primitive. Every lookup of the same
  /// primitive returns the same address.
  pub fn symbol(self) -> &'static TypeSymbol {
    match self {
      Self::Any => &ANY,
      Self::Null => &NULL,
      Self::Bool => &BOOL,
      Self::Int => &INT,
      Self::String => &STRING,
      Self::Object => &OBJECT,
      Self::Array => &ARRAY,
      Self::ResourceRef => &RESOURCE_REF,
    }
  }
}

/// Position of a symbol inside a `TypeArena`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeIndex(pub usize);

impl Display for TypeIndex {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A link to another symbol. Links are resolved against an arena at
/// access time, which is what makes self and forward references work.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
  Primitive(PrimitiveType),
  Index(TypeIndex),
}

impl From<PrimitiveType> for TypeRef {
  fn from(that: PrimitiveType) -> Self {
    Self::Primitive(that)
  }
}

impl From<TypeIndex> for TypeRef {
  fn from(that: TypeIndex) -> Self {
    Self::Index(that)
  }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TypePropertyFlag {
  Required,
  ReadOnly,
  WriteOnly,
  DeployTimeConstant,
}

pub trait TypePropertyFlagList {
  fn is_required(&self) -> bool;
  fn is_read_only(&self) -> bool;
  fn is_write_only(&self) -> bool;
  fn is_deploy_time_constant(&self) -> bool;
}

impl TypePropertyFlagList for &[TypePropertyFlag] {
  fn is_required(&self) -> bool {
    self.contains(&TypePropertyFlag::Required)
  }

  fn is_read_only(&self) -> bool {
    self.contains(&TypePropertyFlag::ReadOnly)
  }

  fn is_write_only(&self) -> bool {
    self.contains(&TypePropertyFlag::WriteOnly)
  }

  fn is_deploy_time_constant(&self) -> bool {
    self.contains(&TypePropertyFlag::DeployTimeConstant)
  }
}

impl Display for TypePropertyFlag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Required => write!(f, "required"),
      Self::ReadOnly => write!(f, "readonly"),
      Self::WriteOnly => write!(f, "writeonly"),
      Self::DeployTimeConstant => write!(f, "deploytimeconstant"),
    }
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TypeProperty {
  pub name: Arc<str>,
  pub ty: TypeRef,
  pub flags: Vec<TypePropertyFlag>,
}

impl TypeProperty {
  pub fn new(name: impl Into<Arc<str>>, ty: impl Into<TypeRef>) -> Self {
    Self {
      name: name.into(),
      ty: ty.into(),
      flags: vec![],
    }
  }

  pub fn with_flags(mut self, flags: &[TypePropertyFlag]) -> Self {
    self.flags = flags.to_vec();
    self
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamedObjectType {
  pub name: Arc<str>,
  pub properties: Vec<TypeProperty>,
  pub additional_properties: Option<TypeRef>,
}

impl NamedObjectType {
  pub fn property(&self, name: &str) -> Option<&TypeProperty> {
    self.properties.iter().find(|x| &*x.name == name)
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TypedArrayType {
  pub item_type: TypeRef,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
  pub name: Arc<str>,
  pub properties: Arc<[TypeProperty]>,
  pub additional_properties: Option<TypeRef>,
  pub reference: ResourceTypeReference,
}

impl ResourceType {
  pub fn property(&self, name: &str) -> Option<&TypeProperty> {
    self.properties.iter().find(|x| &*x.name == name)
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
  pub members: Vec<TypeRef>,
}

impl UnionType {
  /// Builds a union from already-flattened members. Duplicate members are
  /// dropped keeping the first occurrence, and a union that admits `any`
  /// collapses to `any` alone.
  pub fn create(members: impl IntoIterator<Item = TypeRef>) -> Self {
    let mut seen = HashSet::new();
    let mut out = vec![];
    for m in members {
      if m == TypeRef::Primitive(PrimitiveType::Any) {
        return Self {
          members: vec![TypeRef::Primitive(PrimitiveType::Any)],
        };
      }
      if seen.insert(m) {
        out.push(m);
      }
    }
    Self { members: out }
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StringLiteralType {
  pub value: Arc<str>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatedObjectType {
  pub name: Arc<str>,
  pub discriminator: Arc<str>,

  /// Discriminator value -> arm, with the base properties already merged in.
  pub variants: IndexMap<Arc<str>, NamedObjectType>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TypeSymbol {
  Primitive(PrimitiveType),
  NamedObject(NamedObjectType),
  TypedArray(TypedArrayType),
  Resource(ResourceType),
  Union(UnionType),
  StringLiteral(StringLiteralType),
  DiscriminatedObject(DiscriminatedObjectType),
}

impl TypeSymbol {
  pub fn as_resource(&self) -> Option<&ResourceType> {
    match self {
      Self::Resource(x) => Some(x),
      _ => None,
    }
  }

  pub fn as_object(&self) -> Option<&NamedObjectType> {
    match self {
      Self::NamedObject(x) => Some(x),
      _ => None,
    }
  }
}

/// Nesting shown by `TypeArena::type_name` before the rest is elided.
pub const MAX_TYPE_NAME_DEPTH: usize = 16;

/// Flat storage for the symbols produced from one schema batch.
/// `symbols[i]` is the symbol for input node `i`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TypeArena {
  symbols: Vec<TypeSymbol>,
}

impl TypeArena {
  pub(crate) fn from_symbols(symbols: Vec<TypeSymbol>) -> Self {
    Self { symbols }
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn get(&self, index: TypeIndex) -> Option<&TypeSymbol> {
    self.symbols.get(index.0).map(canonicalize)
  }

  pub fn resolve(&self, ty: &TypeRef) -> Option<&TypeSymbol> {
    match ty {
      TypeRef::Primitive(x) => Some(x.symbol()),
      TypeRef::Index(x) => self.get(*x),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (TypeIndex, &TypeSymbol)> {
    self
      .symbols
      .iter()
      .enumerate()
      .map(|(i, x)| (TypeIndex(i), canonicalize(x)))
  }

  pub fn resources(&self) -> impl Iterator<Item = (TypeIndex, &ResourceType)> {
    self
      .symbols
      .iter()
      .enumerate()
      .filter_map(|(i, x)| x.as_resource().map(|x| (TypeIndex(i), x)))
  }

  /// Readable name of a type, as a checker would print it in a hover or a
  /// diagnostic.
  pub fn type_name(&self, ty: &TypeRef) -> String {
    let mut visiting = HashSet::new();
    self.type_name_inner(ty, &mut visiting)
  }

  fn type_name_inner(&self, ty: &TypeRef, visiting: &mut HashSet<TypeIndex>) -> String {
    if visiting.len() >= MAX_TYPE_NAME_DEPTH {
      return "...".to_string();
    }
    if let TypeRef::Index(index) = ty {
      // Anonymous shapes that loop back onto themselves.
      if !visiting.insert(*index) {
        return format!("{}", index);
      }
    }

    let name = match self.resolve(ty) {
      None => format!("<unresolved {}>", DisplayRef(ty)),
      Some(TypeSymbol::Primitive(x)) => x.to_string(),
      Some(TypeSymbol::NamedObject(x)) => x.name.to_string(),
      Some(TypeSymbol::Resource(x)) => x.name.to_string(),
      Some(TypeSymbol::DiscriminatedObject(x)) => x.name.to_string(),
      Some(TypeSymbol::StringLiteral(x)) => format!("'{}'", x.value),
      Some(TypeSymbol::TypedArray(x)) => {
        let item = self.type_name_inner(&x.item_type, visiting);
        match self.resolve(&x.item_type) {
          Some(TypeSymbol::Union(_)) => format!("({})[]", item),
          _ => format!("{}[]", item),
        }
      }
      Some(TypeSymbol::Union(x)) => x
        .members
        .iter()
        .map(|m| self.type_name_inner(m, visiting))
        .collect::<Vec<_>>()
        .join(" | "),
    };

    if let TypeRef::Index(index) = ty {
      visiting.remove(index);
    }
    name
  }
}

fn canonicalize(symbol: &TypeSymbol) -> &TypeSymbol {
  match symbol {
    TypeSymbol::Primitive(x) => x.symbol(),
    _ => symbol,
  }
}

struct DisplayRef<'a>(&'a TypeRef);

impl<'a> Display for DisplayRef<'a> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.0 {
      TypeRef::Primitive(x) => write!(f, "{}", x),
      TypeRef::Index(x) => write!(f, "{}", x),
    }
  }
}

/// Properties every resource has, whatever its provider. Unknown resource
/// types are typed with exactly this set.
pub static TOP_LEVEL_RESOURCE_PROPERTIES: Lazy<Arc<[TypeProperty]>> = Lazy::new(|| {
  use TypePropertyFlag::*;
  Arc::from(vec![
    TypeProperty::new("id", PrimitiveType::String).with_flags(&[ReadOnly]),
    TypeProperty::new("name", PrimitiveType::String).with_flags(&[Required, DeployTimeConstant]),
    TypeProperty::new("type", PrimitiveType::String).with_flags(&[ReadOnly]),
    TypeProperty::new("apiVersion", PrimitiveType::String).with_flags(&[ReadOnly]),
    TypeProperty::new("location", PrimitiveType::String),
    TypeProperty::new("tags", PrimitiveType::Object),
    TypeProperty::new("properties", PrimitiveType::Object),
    TypeProperty::new("dependsOn", PrimitiveType::Array).with_flags(&[WriteOnly]),
  ])
});
