use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{PrimitiveType, TypeIndex};

/// One node of a provider schema batch, as produced by the schema tooling.
///
/// Every field is optional here; the generator decides what a node must
/// carry and reports the rest as malformed input.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SerializedType {
  BuiltIn(SerializedBuiltIn),
  Object(SerializedObject),
  Array(SerializedArray),
  Resource(SerializedResource),
  Union(SerializedUnion),
  StringLiteral(SerializedStringLiteral),
  DiscriminatedObject(SerializedDiscriminatedObject),
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBuiltIn {
  pub kind: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedObject {
  pub name: Option<String>,
  pub properties: Option<IndexMap<String, TypeIndex>>,
  pub additional_properties: Option<TypeIndex>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedArray {
  pub name: Option<String>,
  pub item_type: Option<TypeIndex>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedResource {
  pub name: Option<String>,
  pub body: Option<TypeIndex>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedUnion {
  pub name: Option<String>,
  pub elements: Option<Vec<TypeIndex>>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStringLiteral {
  pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDiscriminatedObject {
  pub name: Option<String>,
  pub discriminator: Option<String>,
  pub base_properties: Option<IndexMap<String, TypeIndex>>,
  pub elements: Option<IndexMap<String, TypeIndex>>,
}

static BUILT_IN_KINDS: phf::Map<&'static str, PrimitiveType> = phf::phf_map! {
  "any" => PrimitiveType::Any,
  "null" => PrimitiveType::Null,
  "bool" => PrimitiveType::Bool,
  "int" => PrimitiveType::Int,
  "string" => PrimitiveType::String,
  "object" => PrimitiveType::Object,
  "array" => PrimitiveType::Array,
  "resourceref" => PrimitiveType::ResourceRef,
};

impl SerializedBuiltIn {
  pub fn new(kind: PrimitiveType) -> Self {
    Self {
      kind: Some(kind.to_string().to_ascii_lowercase()),
    }
  }

  /// Built-in kind names are matched case-insensitively.
  pub fn primitive(&self) -> Option<PrimitiveType> {
    let kind = self.kind.as_deref()?.to_ascii_lowercase();
    BUILT_IN_KINDS.get(kind.as_str()).copied()
  }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeKind {
  BuiltIn,
  Object,
  Array,
  Resource,
  Union,
  StringLiteral,
  DiscriminatedObject,
}

impl Display for NodeKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{}",
      match self {
        Self::BuiltIn => "built-in",
        Self::Object => "object",
        Self::Array => "array",
        Self::Resource => "resource",
        Self::Union => "union",
        Self::StringLiteral => "string literal",
        Self::DiscriminatedObject => "discriminated object",
      }
    )
  }
}

impl SerializedType {
  pub fn kind(&self) -> NodeKind {
    match self {
      Self::BuiltIn(_) => NodeKind::BuiltIn,
      Self::Object(_) => NodeKind::Object,
      Self::Array(_) => NodeKind::Array,
      Self::Resource(_) => NodeKind::Resource,
      Self::Union(_) => NodeKind::Union,
      Self::StringLiteral(_) => NodeKind::StringLiteral,
      Self::DiscriminatedObject(_) => NodeKind::DiscriminatedObject,
    }
  }
}
