use serde_json::{json, Value};

use super::{
  generate::{generate, MalformedReason, MalformedSchemaError},
  serialized::NodeKind,
};
use crate::{
  test_util::{nodes, sample_batch},
  types::{
    PrimitiveType, ResourceTypeReference, TypeArena, TypeIndex, TypeRef, TypeSymbol,
    MAX_TYPE_NAME_DEPTH, STRING,
  },
};

fn malformed(batch: serde_json::Value) -> MalformedSchemaError {
  let err = generate(&nodes(batch), "2020-01-01").unwrap_err();
  err
    .downcast_ref::<MalformedSchemaError>()
    .cloned()
    .unwrap_or_else(|| panic!("expecting a malformed schema error, got {:?}", err))
}

#[test]
fn end_to_end() {
  let _ = pretty_env_logger::try_init();
  let types = generate(
    &nodes(json!([
      { "BuiltIn": { "kind": "String" } },
      { "Object": { "name": "Foo", "properties": { "x": 0 } } },
      { "Resource": { "name": "Ns/foo", "body": 1 } }
    ])),
    "2020-01-01",
  )
  .unwrap();
  assert_eq!(types.len(), 3);

  let resource = types.get(TypeIndex(2)).unwrap().as_resource().unwrap();
  assert_eq!(&*resource.name, "Ns/foo");
  assert_eq!(
    resource.reference,
    ResourceTypeReference::parse("Ns/foo@2020-01-01").unwrap()
  );
  assert_eq!(resource.reference.to_string(), "Ns/foo@2020-01-01");
  assert_eq!(resource.properties.len(), 1);
  assert_eq!(&*resource.properties[0].name, "x");
  assert!(resource.properties[0].flags.is_empty());
  assert!(std::ptr::eq(
    types.resolve(&resource.properties[0].ty).unwrap(),
    &STRING
  ));
  assert!(resource.additional_properties.is_none());
}

#[test]
fn index_fidelity() {
  let batch = nodes(sample_batch());
  let types = generate(&batch, "2019-06-01").unwrap();
  assert_eq!(types.len(), batch.len());

  let kinds = types
    .iter()
    .map(|(_, x)| match x {
      TypeSymbol::Primitive(_) => "primitive",
      TypeSymbol::NamedObject(_) => "object",
      TypeSymbol::TypedArray(_) => "array",
      TypeSymbol::Resource(_) => "resource",
      TypeSymbol::Union(_) => "union",
      TypeSymbol::StringLiteral(_) => "literal",
      TypeSymbol::DiscriminatedObject(_) => "discriminated",
    })
    .collect::<Vec<_>>();
  assert_eq!(
    kinds,
    vec![
      "primitive",
      "primitive",
      "literal",
      "literal",
      "literal",
      "union",
      "object",
      "object",
      "array",
      "object",
      "resource"
    ]
  );

  let resource = types.get(TypeIndex(10)).unwrap().as_resource().unwrap();
  assert_eq!(
    resource.reference.to_string(),
    "Microsoft.Storage/storageAccounts@2019-06-01"
  );
  assert_eq!(resource.additional_properties, Some(TypeRef::Index(TypeIndex(0))));
  assert_eq!(types.type_name(&TypeRef::Index(TypeIndex(8))), "Folder[]");
  assert_eq!(
    types.type_name(&TypeRef::Index(TypeIndex(5))),
    "'Standard_LRS' | 'Premium_LRS'"
  );
}

#[test]
fn primitives_are_canonical() {
  let types = generate(&nodes(sample_batch()), "2019-06-01").unwrap();
  assert!(std::ptr::eq(types.get(TypeIndex(0)).unwrap(), &STRING));
  assert!(std::ptr::eq(
    types.get(TypeIndex(1)).unwrap(),
    PrimitiveType::Int.symbol()
  ));
}

#[test]
fn recursive_types() {
  let types = generate(
    &nodes(json!([
      { "Object": { "name": "Node", "properties": { "next": 0, "children": 1 } } },
      { "Array": { "name": "Node[]", "itemType": 0 } },
      { "Array": { "name": "Self[]", "itemType": 2 } }
    ])),
    "2020-01-01",
  )
  .unwrap();

  let node = types.get(TypeIndex(0)).unwrap().as_object().unwrap();
  let next = types.resolve(&node.property("next").unwrap().ty).unwrap();
  assert_eq!(next, types.get(TypeIndex(0)).unwrap());

  let children = types.resolve(&node.property("children").unwrap().ty).unwrap();
  match children {
    TypeSymbol::TypedArray(x) => assert_eq!(x.item_type, TypeRef::Index(TypeIndex(0))),
    _ => panic!("expecting an array, got {:?}", children),
  }

  assert_eq!(types.type_name(&TypeRef::Index(TypeIndex(1))), "Node[]");
  assert_eq!(types.type_name(&TypeRef::Index(TypeIndex(2))), "#2[]");
}

#[test]
fn forward_references() {
  let types = generate(
    &nodes(json!([
      { "Resource": { "name": "Ns/thing", "body": 1 } },
      { "Object": { "name": "Thing", "properties": { "tag": 2 } } },
      { "StringLiteral": { "value": "x" } }
    ])),
    "2021-01-01",
  )
  .unwrap();
  let resource = types.get(TypeIndex(0)).unwrap().as_resource().unwrap();
  match types.resolve(&resource.property("tag").unwrap().ty).unwrap() {
    TypeSymbol::StringLiteral(x) => assert_eq!(&*x.value, "x"),
    x => panic!("expecting a string literal, got {:?}", x),
  }
}

#[test]
fn union_flattening() {
  let types = generate(
    &nodes(json!([
      { "BuiltIn": { "kind": "string" } },
      { "StringLiteral": { "value": "a" } },
      { "StringLiteral": { "value": "a" } },
      { "Union": { "name": "inner", "elements": [1, 4] } },
      { "Union": { "name": "outer", "elements": [0, 3, 2, 0] } },
      { "Union": { "name": "loose", "elements": [0, 6] } },
      { "BuiltIn": { "kind": "any" } }
    ])),
    "2020-01-01",
  )
  .unwrap();

  // `inner` and `outer` contain each other.
  let expected = vec![
    TypeRef::Index(TypeIndex(1)),
    TypeRef::Primitive(PrimitiveType::String),
  ];
  match types.get(TypeIndex(4)).unwrap() {
    TypeSymbol::Union(x) => assert_eq!(x.members, expected),
    x => panic!("expecting a union, got {:?}", x),
  }
  match types.get(TypeIndex(3)).unwrap() {
    TypeSymbol::Union(x) => assert_eq!(
      x.members,
      vec![
        TypeRef::Index(TypeIndex(1)),
        TypeRef::Primitive(PrimitiveType::String)
      ]
    ),
    x => panic!("expecting a union, got {:?}", x),
  }
  match types.get(TypeIndex(5)).unwrap() {
    TypeSymbol::Union(x) => assert_eq!(x.members, vec![TypeRef::Primitive(PrimitiveType::Any)]),
    x => panic!("expecting a union, got {:?}", x),
  }
  assert_eq!(types.type_name(&TypeRef::Index(TypeIndex(4))), "'a' | string");
}

const CHAIN_LENGTH: usize = 150_000;

fn union_members(types: &TypeArena, index: usize) -> Vec<TypeRef> {
  match types.get(TypeIndex(index)).unwrap() {
    TypeSymbol::Union(x) => x.members.clone(),
    x => panic!("expecting a union, got {:?}", x),
  }
}

#[test]
fn deep_union_chain() {
  // Every union nests the one before it.
  let mut batch = vec![json!({ "BuiltIn": { "kind": "string" } })];
  for i in 0..CHAIN_LENGTH {
    batch.push(json!({ "Union": { "name": format!("u{}", i), "elements": [i] } }));
  }
  let types = generate(&nodes(Value::Array(batch)), "2020-01-01").unwrap();
  assert_eq!(types.len(), CHAIN_LENGTH + 1);
  assert_eq!(
    union_members(&types, CHAIN_LENGTH),
    vec![TypeRef::Primitive(PrimitiveType::String)]
  );
  assert_eq!(types.type_name(&TypeRef::Index(TypeIndex(CHAIN_LENGTH))), "string");
}

#[test]
fn deep_forward_union_chain() {
  // Every union nests the one after it; the first conversion walks the
  // whole chain at once.
  let mut batch = vec![];
  for i in 0..CHAIN_LENGTH {
    let elements = json!([i + 1, CHAIN_LENGTH + 1]);
    batch.push(json!({ "Union": { "name": format!("u{}", i), "elements": elements } }));
  }
  batch.push(json!({ "BuiltIn": { "kind": "int" } }));
  batch.push(json!({ "StringLiteral": { "value": "end" } }));
  let types = generate(&nodes(Value::Array(batch)), "2020-01-01").unwrap();
  assert_eq!(types.len(), CHAIN_LENGTH + 2);

  let expected = vec![
    TypeRef::Primitive(PrimitiveType::Int),
    TypeRef::Index(TypeIndex(CHAIN_LENGTH + 1)),
  ];
  assert_eq!(union_members(&types, 0), expected);
  assert_eq!(union_members(&types, CHAIN_LENGTH / 2), expected);
  assert_eq!(union_members(&types, CHAIN_LENGTH - 1), expected);
}

#[test]
fn deep_union_cycle() {
  // A ring of unions, each also holding its own literal.
  let ring = 1_000;
  let mut batch = vec![];
  for i in 0..ring {
    let elements = json!([(i + 1) % ring, ring + i]);
    batch.push(json!({ "Union": { "name": format!("u{}", i), "elements": elements } }));
  }
  for i in 0..ring {
    batch.push(json!({ "StringLiteral": { "value": format!("v{}", i % 10) } }));
  }
  let types = generate(&nodes(Value::Array(batch)), "2020-01-01").unwrap();

  // Equal literals collapse onto the first index holding the value.
  let expected = (0..10)
    .map(|i| TypeRef::Index(TypeIndex(ring + i)))
    .collect::<Vec<_>>();
  for &i in &[0, 1, ring / 2, ring - 1] {
    let mut members = union_members(&types, i);
    members.sort_by_key(|x| match x {
      TypeRef::Index(x) => x.0,
      TypeRef::Primitive(_) => 0,
    });
    assert_eq!(members, expected);
  }
}

#[test]
fn deep_array_name() {
  let mut batch = vec![json!({ "BuiltIn": { "kind": "string" } })];
  for i in 0..CHAIN_LENGTH {
    batch.push(json!({ "Array": { "name": format!("a{}", i), "itemType": i } }));
  }
  let types = generate(&nodes(Value::Array(batch)), "2020-01-01").unwrap();
  assert_eq!(
    types.type_name(&TypeRef::Index(TypeIndex(CHAIN_LENGTH))),
    format!("...{}", "[]".repeat(MAX_TYPE_NAME_DEPTH))
  );
  assert_eq!(types.type_name(&TypeRef::Index(TypeIndex(3))), "string[][][]");
}

#[test]
fn discriminated_merge() {
  let types = generate(
    &nodes(json!([
      { "BuiltIn": { "kind": "string" } },
      { "BuiltIn": { "kind": "int" } },
      { "BuiltIn": { "kind": "bool" } },
      { "Object": { "name": "ArmA", "properties": { "a": 1, "c": 2 } } },
      { "Object": { "name": "ArmB", "properties": {} } },
      { "DiscriminatedObject": {
        "name": "Shape",
        "discriminator": "kind",
        "baseProperties": { "a": 0, "b": 0 },
        "elements": { "A": 3, "B": 4 }
      } }
    ])),
    "2020-01-01",
  )
  .unwrap();

  let shape = match types.get(TypeIndex(5)).unwrap() {
    TypeSymbol::DiscriminatedObject(x) => x,
    x => panic!("expecting a discriminated object, got {:?}", x),
  };
  assert_eq!(&*shape.name, "Shape");
  assert_eq!(&*shape.discriminator, "kind");
  assert_eq!(
    shape.variants.keys().map(|x| &**x).collect::<Vec<_>>(),
    vec!["A", "B"]
  );

  let a = &shape.variants["A"];
  assert_eq!(&*a.name, "ArmA");
  assert_eq!(
    a.properties.iter().map(|x| &*x.name).collect::<Vec<_>>(),
    vec!["a", "c", "b"]
  );
  assert_eq!(a.property("a").unwrap().ty, TypeRef::Index(TypeIndex(1)));
  assert_eq!(a.property("b").unwrap().ty, TypeRef::Index(TypeIndex(0)));
  assert_eq!(a.property("c").unwrap().ty, TypeRef::Index(TypeIndex(2)));

  let b = &shape.variants["B"];
  assert_eq!(
    b.properties.iter().map(|x| &*x.name).collect::<Vec<_>>(),
    vec!["a", "b"]
  );
}

#[test]
fn object_without_properties() {
  let err = malformed(json!([
    { "BuiltIn": { "kind": "string" } },
    { "Object": { "name": "Foo" } }
  ]));
  assert_eq!(err.index, 1);
  assert_eq!(err.kind, NodeKind::Object);
  assert_eq!(err.reason, MalformedReason::MissingField("properties".into()));
}

#[test]
fn unknown_built_in() {
  let err = malformed(json!([{ "BuiltIn": { "kind": "float" } }]));
  assert_eq!(err.index, 0);
  assert_eq!(err.kind, NodeKind::BuiltIn);
  assert_eq!(err.reason, MalformedReason::UnknownBuiltInKind("float".into()));

  let err = malformed(json!([{ "BuiltIn": {} }]));
  assert_eq!(err.reason, MalformedReason::MissingField("kind".into()));
}

#[test]
fn dangling_reference() {
  let err = malformed(json!([
    { "Object": { "name": "Foo", "properties": { "x": 7 } } }
  ]));
  assert_eq!(err.index, 0);
  assert_eq!(
    err.reason,
    MalformedReason::DanglingReference {
      field: "properties.x".into(),
      target: 7
    }
  );
}

#[test]
fn resource_body_must_be_object() {
  let err = malformed(json!([
    { "BuiltIn": { "kind": "string" } },
    { "Resource": { "name": "Ns/foo", "body": 0 } }
  ]));
  assert_eq!(err.index, 1);
  assert_eq!(err.kind, NodeKind::Resource);
  assert_eq!(
    err.reason,
    MalformedReason::ExpectingObject {
      field: "body".into(),
      target: 0,
      found: NodeKind::BuiltIn
    }
  );
}

#[test]
fn resource_name_must_form_a_reference() {
  let err = malformed(json!([
    { "Object": { "name": "Foo", "properties": {} } },
    { "Resource": { "name": "no-namespace", "body": 0 } }
  ]));
  assert_eq!(err.index, 1);
  assert_eq!(
    err.reason,
    MalformedReason::InvalidResourceName("no-namespace@2020-01-01".into())
  );
}

#[test]
fn missing_fields() {
  let cases = vec![
    (json!({ "Array": { "name": "x[]" } }), NodeKind::Array, "itemType"),
    (json!({ "Array": { "itemType": 0 } }), NodeKind::Array, "name"),
    (json!({ "Resource": { "name": "Ns/x" } }), NodeKind::Resource, "body"),
    (json!({ "Union": { "name": "u" } }), NodeKind::Union, "elements"),
    (json!({ "StringLiteral": {} }), NodeKind::StringLiteral, "value"),
    (
      json!({ "DiscriminatedObject": { "name": "d", "discriminator": "k", "elements": {} } }),
      NodeKind::DiscriminatedObject,
      "baseProperties",
    ),
    (
      json!({ "DiscriminatedObject": { "name": "d", "baseProperties": {}, "elements": {} } }),
      NodeKind::DiscriminatedObject,
      "discriminator",
    ),
  ];
  for (node, kind, field) in cases {
    let err = malformed(json!([{ "BuiltIn": { "kind": "string" } }, node]));
    assert_eq!(err.index, 1);
    assert_eq!(err.kind, kind);
    assert_eq!(err.reason, MalformedReason::MissingField(field.into()));
  }
}

#[test]
fn error_message() {
  let err = malformed(json!([{ "Object": { "name": "Foo" } }]));
  assert_eq!(
    err.to_string(),
    "malformed object node at index 0: missing required field `properties`"
  );
}
