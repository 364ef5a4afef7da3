use serde_json::Value;

use crate::schema::serialized::SerializedType;

pub fn nodes(batch: Value) -> Vec<SerializedType> {
  serde_json::from_value(batch).unwrap()
}

/// A small provider batch: a recursive object, a union with duplicate
/// literals and one resource.
pub fn sample_batch() -> Value {
  serde_json::json!([
    { "BuiltIn": { "kind": "string" } },
    { "BuiltIn": { "kind": "int" } },
    { "StringLiteral": { "value": "Standard_LRS" } },
    { "StringLiteral": { "value": "Premium_LRS" } },
    { "StringLiteral": { "value": "Standard_LRS" } },
    { "Union": { "name": "skuName", "elements": [2, 3, 4] } },
    { "Object": {
      "name": "Sku",
      "properties": { "name": 5, "tier": 0 }
    } },
    { "Object": {
      "name": "Folder",
      "properties": { "name": 0, "children": 8 }
    } },
    { "Array": { "name": "Folder[]", "itemType": 7 } },
    { "Object": {
      "name": "StorageAccountProperties",
      "properties": { "sku": 6, "root": 7, "quota": 1 },
      "additionalProperties": 0
    } },
    { "Resource": { "name": "Microsoft.Storage/storageAccounts", "body": 9 } }
  ])
}
