use anyhow::Result;
use restype_analyzer::{
  registrar::global,
  schema::{loader::TypeLoader, serialized::SerializedType},
  types::ResourceTypeReference,
};
use serde_json::json;

use super::{load_providers, ProviderVersion};

struct StaticLoader(serde_json::Value);

impl TypeLoader for StaticLoader {
  fn load_types(&self, _: &str, _: &str) -> Result<Vec<SerializedType>> {
    Ok(serde_json::from_value(self.0.clone())?)
  }
}

#[test]
fn provider_versions() {
  let p: ProviderVersion = "Microsoft.Storage@2019-06-01".parse().unwrap();
  assert_eq!(p.namespace, "Microsoft.Storage");
  assert_eq!(p.api_version, "2019-06-01");

  assert!("Microsoft.Storage".parse::<ProviderVersion>().is_err());
  assert!("@2019-06-01".parse::<ProviderVersion>().is_err());
  assert!("Microsoft.Storage@".parse::<ProviderVersion>().is_err());
}

#[test]
fn providers_are_loaded() {
  let _ = pretty_env_logger::try_init();
  let loader = StaticLoader(json!([
    { "Object": { "name": "Widget", "properties": {} } },
    { "Resource": { "name": "Cli.Test/widgets", "body": 0 } }
  ]));
  let providers = vec![
    "Cli.Test@2020-01-01".parse::<ProviderVersion>().unwrap(),
    "Cli.Test@2021-01-01".parse::<ProviderVersion>().unwrap(),
  ];
  load_providers(&loader, &providers).unwrap();

  for version in &["2020-01-01", "2021-01-01"] {
    let r = ResourceTypeReference::parse(&format!("Cli.Test/widgets@{}", version)).unwrap();
    assert!(global().has_type_defined(&r));
  }
}

#[test]
fn failed_provider_stops_loading() {
  let loader = StaticLoader(json!([{ "Object": { "name": "Broken" } }]));
  let providers = vec!["Cli.Broken@2020-01-01".parse::<ProviderVersion>().unwrap()];
  assert!(load_providers(&loader, &providers).is_err());
}
