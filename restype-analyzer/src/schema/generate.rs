use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use anyhow::Result;
use indexmap::IndexMap;
use thiserror::Error;

use super::serialized::{NodeKind, SerializedObject, SerializedType};
use crate::types::{
  DiscriminatedObjectType, NamedObjectType, ResourceType, ResourceTypeReference,
  StringLiteralType, TypeArena, TypeIndex, TypeProperty, TypeRef, TypeSymbol, TypedArrayType,
  UnionType,
};

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("malformed {kind} node at index {index}: {reason}")]
pub struct MalformedSchemaError {
  pub index: usize,
  pub kind: NodeKind,
  pub reason: MalformedReason,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum MalformedReason {
  #[error("missing required field `{0}`")]
  MissingField(String),

  #[error("unknown built-in kind `{0}`")]
  UnknownBuiltInKind(String),

  #[error("`{field}` references index {target}, which is outside of the batch")]
  DanglingReference { field: String, target: usize },

  #[error("`{field}` must reference an object node, got a {found} node at index {target}")]
  ExpectingObject {
    field: String,
    target: usize,
    found: NodeKind,
  },

  #[error("`{0}` is not a valid resource type reference")]
  InvalidResourceName(String),
}

fn missing(field: &str) -> MalformedReason {
  MalformedReason::MissingField(field.to_string())
}

/// Converts a schema batch into type symbols. `output[i]` is built from
/// `nodes[i]`; links between nodes stay indices into the output.
///
/// `api_version` is the version the batch was loaded under and is used to
/// build the reference of every resource in it. Any malformed node fails
/// the whole batch.
pub fn generate(nodes: &[SerializedType], api_version: &str) -> Result<TypeArena> {
  let mut generator = TypeGenerator::new(nodes, api_version);
  let symbols = nodes
    .iter()
    .enumerate()
    .map(|(index, node)| {
      generator
        .to_type_symbol(index, node)
        .map_err(|reason| MalformedSchemaError {
          index,
          kind: node.kind(),
          reason,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

  log::debug!(
    "generated {} type symbol(s) for api version {}",
    symbols.len(),
    api_version
  );
  Ok(TypeArena::from_symbols(symbols))
}

struct TypeGenerator<'a> {
  nodes: &'a [SerializedType],
  api_version: &'a str,

  /// First index of every string literal value in the batch.
  literals: HashMap<&'a str, TypeIndex>,

  /// Flattened members of the union nodes converted so far.
  unions: Vec<Option<Arc<[TypeRef]>>>,
}

/// One union node on the flattening path.
struct UnionFrame<'a> {
  node: usize,
  elements: &'a [TypeIndex],
  next: usize,
  low: usize,
  members: Vec<TypeRef>,
}

enum FlattenStep {
  Descend(usize),
  Finish,
}

impl<'a> TypeGenerator<'a> {
  fn new(nodes: &'a [SerializedType], api_version: &'a str) -> Self {
    let mut literals = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
      if let SerializedType::StringLiteral(x) = node {
        if let Some(value) = x.value.as_deref() {
          literals.entry(value).or_insert(TypeIndex(i));
        }
      }
    }
    Self {
      nodes,
      api_version,
      literals,
      unions: vec![None; nodes.len()],
    }
  }

  fn to_type_symbol(
    &mut self,
    index: usize,
    node: &'a SerializedType,
  ) -> Result<TypeSymbol, MalformedReason> {
    match node {
      SerializedType::BuiltIn(x) => {
        let kind = x.kind.as_deref().ok_or_else(|| missing("kind"))?;
        let primitive = x
          .primitive()
          .ok_or_else(|| MalformedReason::UnknownBuiltInKind(kind.to_string()))?;
        Ok(TypeSymbol::Primitive(primitive))
      }
      SerializedType::Object(x) => Ok(TypeSymbol::NamedObject(self.to_object(x)?)),
      SerializedType::Array(x) => {
        x.name.as_ref().ok_or_else(|| missing("name"))?;
        let item_type = x.item_type.ok_or_else(|| missing("itemType"))?;
        Ok(TypeSymbol::TypedArray(TypedArrayType {
          item_type: self.link("itemType", item_type)?,
        }))
      }
      SerializedType::Resource(x) => {
        let name = x.name.as_deref().ok_or_else(|| missing("name"))?;
        let body = x.body.ok_or_else(|| missing("body"))?;
        let body = self.to_object(self.object_at("body", body)?)?;

        let reference = format!("{}@{}", name, self.api_version);
        let reference = ResourceTypeReference::parse(&reference)
          .map_err(|_| MalformedReason::InvalidResourceName(reference))?;

        Ok(TypeSymbol::Resource(ResourceType {
          name: Arc::from(name),
          properties: Arc::from(body.properties),
          additional_properties: body.additional_properties,
          reference,
        }))
      }
      SerializedType::Union(x) => {
        x.elements.as_ref().ok_or_else(|| missing("elements"))?;
        let members = self.flatten_union(index)?;
        Ok(TypeSymbol::Union(UnionType::create(members.iter().copied())))
      }
      SerializedType::StringLiteral(x) => {
        let value = x.value.as_deref().ok_or_else(|| missing("value"))?;
        Ok(TypeSymbol::StringLiteral(StringLiteralType {
          value: Arc::from(value),
        }))
      }
      SerializedType::DiscriminatedObject(x) => {
        let name = x.name.as_deref().ok_or_else(|| missing("name"))?;
        let discriminator = x
          .discriminator
          .as_deref()
          .ok_or_else(|| missing("discriminator"))?;
        let elements = x.elements.as_ref().ok_or_else(|| missing("elements"))?;
        let base_properties = x
          .base_properties
          .as_ref()
          .ok_or_else(|| missing("baseProperties"))?;
        let base_properties = self.to_properties("baseProperties", base_properties)?;

        let mut variants = IndexMap::new();
        for (value, &element) in elements {
          let field = format!("elements.{}", value);
          let mut arm = self.to_object(self.object_at(&field, element)?)?;

          // The arm specializes the base: its own properties win.
          for base in &base_properties {
            if arm.property(&base.name).is_none() {
              arm.properties.push(base.clone());
            }
          }
          variants.insert(Arc::from(value.as_str()), arm);
        }

        Ok(TypeSymbol::DiscriminatedObject(DiscriminatedObjectType {
          name: Arc::from(name),
          discriminator: Arc::from(discriminator),
          variants,
        }))
      }
    }
  }

  fn to_object(&self, x: &SerializedObject) -> Result<NamedObjectType, MalformedReason> {
    let name = x.name.as_deref().ok_or_else(|| missing("name"))?;
    let properties = x.properties.as_ref().ok_or_else(|| missing("properties"))?;
    let additional_properties = x
      .additional_properties
      .map(|target| self.link("additionalProperties", target))
      .transpose()?;

    Ok(NamedObjectType {
      name: Arc::from(name),
      properties: self.to_properties("properties", properties)?,
      additional_properties,
    })
  }

  fn to_properties(
    &self,
    field: &str,
    properties: &IndexMap<String, TypeIndex>,
  ) -> Result<Vec<TypeProperty>, MalformedReason> {
    properties
      .iter()
      .map(|(name, &target)| -> Result<TypeProperty, MalformedReason> {
        let ty = self.link(&format!("{}.{}", field, name), target)?;
        Ok(TypeProperty::new(name.as_str(), ty))
      })
      .collect()
  }

  /// Checks that `target` lands inside the batch. The target symbol itself
  /// is only looked at when the link is resolved.
  fn link(&self, field: &str, target: TypeIndex) -> Result<TypeRef, MalformedReason> {
    if target.0 >= self.nodes.len() {
      return Err(MalformedReason::DanglingReference {
        field: field.to_string(),
        target: target.0,
      });
    }
    Ok(TypeRef::Index(target))
  }

  fn object_at(&self, field: &str, target: TypeIndex) -> Result<&'a SerializedObject, MalformedReason> {
    self.link(field, target)?;
    match &self.nodes[target.0] {
      SerializedType::Object(x) => Ok(x),
      other => Err(MalformedReason::ExpectingObject {
        field: field.to_string(),
        target: target.0,
        found: other.kind(),
      }),
    }
  }

  /// Collects the members of the union at `root`, absorbing nested unions
  /// and mapping built-ins and string literals onto one canonical link each.
  ///
  /// Nested unions are walked with an explicit stack. Unions that reach each
  /// other form one component and share one member list, which is kept for
  /// every later union that nests them.
  fn flatten_union(&mut self, root: usize) -> Result<Arc<[TypeRef]>, MalformedReason> {
    if let Some(x) = &self.unions[root] {
      return Ok(x.clone());
    }

    let mut order: HashMap<usize, usize> = HashMap::new();
    let mut component: Vec<usize> = vec![];
    let mut on_component: HashSet<usize> = HashSet::new();
    let mut path: Vec<UnionFrame<'a>> = vec![];

    order.insert(root, 0);
    component.push(root);
    on_component.insert(root);
    path.push(UnionFrame {
      node: root,
      elements: self.union_elements(root),
      next: 0,
      low: 0,
      members: vec![],
    });

    while let Some(frame) = path.last_mut() {
      let step = if frame.next < frame.elements.len() {
        let element = frame.elements[frame.next];
        frame.next += 1;
        self.link("elements", element)?;
        match &self.nodes[element.0] {
          SerializedType::Union(_) => {
            if let Some(done) = &self.unions[element.0] {
              frame.members.extend(done.iter().copied());
              continue;
            }
            match order.get(&element.0) {
              Some(&n) => {
                if on_component.contains(&element.0) {
                  frame.low = frame.low.min(n);
                }
                continue;
              }
              None => FlattenStep::Descend(element.0),
            }
          }
          _ => {
            frame.members.push(self.member_ref(element));
            continue;
          }
        }
      } else {
        FlattenStep::Finish
      };

      match step {
        FlattenStep::Descend(node) => {
          let n = order.len();
          order.insert(node, n);
          component.push(node);
          on_component.insert(node);
          path.push(UnionFrame {
            node,
            elements: self.union_elements(node),
            next: 0,
            low: n,
            members: vec![],
          });
        }
        FlattenStep::Finish => {
          let frame = match path.pop() {
            Some(x) => x,
            None => break,
          };
          let is_component_root = order.get(&frame.node) == Some(&frame.low);
          if is_component_root {
            let members: Arc<[TypeRef]> = Arc::from(UnionType::create(frame.members).members);
            while let Some(n) = component.pop() {
              on_component.remove(&n);
              self.unions[n] = Some(members.clone());
              if n == frame.node {
                break;
              }
            }
            match path.last_mut() {
              Some(parent) => parent.members.extend(members.iter().copied()),
              None => return Ok(members),
            }
          } else if let Some(parent) = path.last_mut() {
            parent.low = parent.low.min(frame.low);
            parent.members.extend(frame.members);
          }
        }
      }
    }

    Ok(
      self.unions[root]
        .clone()
        .unwrap_or_else(|| Arc::from(Vec::new())),
    )
  }

  /// Elements of a union node. A nested union without elements is reported
  /// at its own index, so it contributes nothing here.
  fn union_elements(&self, index: usize) -> &'a [TypeIndex] {
    match &self.nodes[index] {
      SerializedType::Union(x) => x.elements.as_deref().unwrap_or(&[]),
      _ => &[],
    }
  }

  fn member_ref(&self, element: TypeIndex) -> TypeRef {
    match &self.nodes[element.0] {
      SerializedType::BuiltIn(x) => match x.primitive() {
        Some(p) => TypeRef::Primitive(p),
        None => TypeRef::Index(element),
      },
      SerializedType::StringLiteral(x) => {
        let canonical = x
          .value
          .as_deref()
          .and_then(|value| self.literals.get(value))
          .copied()
          .unwrap_or(element);
        TypeRef::Index(canonical)
      }
      _ => TypeRef::Index(element),
    }
  }
}
