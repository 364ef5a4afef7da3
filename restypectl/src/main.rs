use std::{path::PathBuf, str::FromStr};

use anyhow::Result;
use restype_analyzer::{
  registrar::{global, BoundResourceType, ResourceTypeProvider},
  schema::{
    generate::generate,
    loader::{DirectoryTypeLoader, TypeLoader},
  },
  types::{ResourceTypeReference, TypeRef},
};
use structopt::StructOpt;
use thiserror::Error;

#[cfg(test)]
mod main_test;

/// Resource type tool.
#[derive(Debug, StructOpt)]
#[structopt(name = "restypectl", about = "Inspect provider resource type schemas.")]
struct Opt {
  /// Root directory of the provider schemas.
  #[structopt(long, env = "RESTYPE_TYPES_DIR", default_value = ".")]
  types_dir: PathBuf,

  #[structopt(subcommand)]
  subcmd: SubCommand,
}

#[derive(Debug, StructOpt)]
enum SubCommand {
  /// Convert one provider batch and print its type symbols.
  Generate(Generate),

  /// Resolve a resource type reference.
  Lookup(Lookup),

  /// List the resource types registered by the given providers.
  List(List),
}

#[derive(Debug, StructOpt)]
struct Generate {
  namespace: String,
  api_version: String,
}

#[derive(Debug, StructOpt)]
struct Lookup {
  /// `<namespace>/<type>@<apiVersion>`.
  reference: String,

  /// Providers to load first, as `<namespace>@<apiVersion>`.
  #[structopt(short, long)]
  provider: Vec<ProviderVersion>,
}

#[derive(Debug, StructOpt)]
struct List {
  /// Providers to load, as `<namespace>@<apiVersion>`.
  #[structopt(short, long)]
  provider: Vec<ProviderVersion>,
}

#[derive(Debug, Clone)]
struct ProviderVersion {
  namespace: String,
  api_version: String,
}

impl FromStr for ProviderVersion {
  type Err = CliError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.rsplit_once('@') {
      Some((namespace, api_version)) if !namespace.is_empty() && !api_version.is_empty() => {
        Ok(Self {
          namespace: namespace.to_string(),
          api_version: api_version.to_string(),
        })
      }
      _ => Err(CliError::InvalidProvider(s.to_string())),
    }
  }
}

#[derive(Error, Debug)]
enum CliError {
  #[error("invalid provider `{0}`, expecting `<namespace>@<apiVersion>`")]
  InvalidProvider(String),
}

fn main() -> Result<()> {
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info");
  }
  pretty_env_logger::init_timed();
  let opt = Opt::from_args();
  let loader = DirectoryTypeLoader::new(opt.types_dir.clone());

  match &opt.subcmd {
    SubCommand::Generate(x) => {
      let nodes = loader.load_types(&x.namespace, &x.api_version)?;
      let types = generate(&nodes, &x.api_version)?;
      println!(
        "{}",
        serde_json::to_string_pretty(
          &types
            .iter()
            .map(|(index, symbol)| serde_json::json!({
              "index": index.0,
              "type": types.type_name(&TypeRef::Index(index)),
              "symbol": symbol,
            }))
            .collect::<Vec<_>>()
        )?
      );
    }
    SubCommand::Lookup(x) => {
      let reference = ResourceTypeReference::parse(&x.reference)?;
      load_providers(&loader, &x.provider)?;
      let provider: &dyn ResourceTypeProvider = global();
      let ty = provider.lookup_type(&reference);
      println!(
        "{}",
        serde_json::to_string_pretty(&describe(
          &ty,
          provider.has_type_defined(&reference)
        ))?
      );
    }
    SubCommand::List(x) => {
      load_providers(&loader, &x.provider)?;
      println!(
        "{}",
        serde_json::to_string_pretty(&global().registered_types())?
      );
    }
  }

  Ok(())
}

fn load_providers(loader: &dyn TypeLoader, providers: &[ProviderVersion]) -> Result<()> {
  for p in providers {
    log::info!("Loading provider {}@{}.", p.namespace, p.api_version);
    global().load_provider(loader, &p.namespace, &p.api_version)?;
  }
  Ok(())
}

fn describe(ty: &BoundResourceType, defined: bool) -> serde_json::Value {
  serde_json::json!({
    "name": ty.name(),
    "reference": ty.reference(),
    "defined": defined,
    "properties": ty
      .properties()
      .iter()
      .map(|p| serde_json::json!({
        "name": p.name,
        "type": ty.type_name(&p.ty),
        "flags": p.flags.iter().map(|x| x.to_string()).collect::<Vec<_>>(),
      }))
      .collect::<Vec<_>>(),
    "additionalProperties": ty
      .resource
      .additional_properties
      .as_ref()
      .map(|x| ty.type_name(x)),
  })
}
