
use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{
  schema::{generate::generate, loader::TypeLoader},
  types::{
    ResourceType, ResourceTypeReference, TypeArena, TypeIndex, TypeProperty, TypeRef, TypeSymbol,
    TOP_LEVEL_RESOURCE_PROPERTIES,
  },
};

/// A resource type together with the arena its property links point into.
#[derive(Clone, Debug)]
pub struct BoundResourceType {
  pub types: Arc<TypeArena>,
  pub resource: ResourceType,
}

static EMPTY_ARENA: Lazy<Arc<TypeArena>> = Lazy::new(|| Arc::new(TypeArena::default()));

impl BoundResourceType {
  /// Clones the resource at `index` out of `types`.
  pub fn from_arena(types: Arc<TypeArena>, index: TypeIndex) -> Option<Self> {
    let resource = types.get(index)?.as_resource()?.clone();
    Some(Self { types, resource })
  }

  /// The loosely typed shape used for resource types nobody registered.
  pub fn fallback(reference: &ResourceTypeReference) -> Self {
    Self {
      types: EMPTY_ARENA.clone(),
      resource: ResourceType {
        name: Arc::from(reference.full_type()),
        properties: TOP_LEVEL_RESOURCE_PROPERTIES.clone(),
        additional_properties: None,
        reference: reference.clone(),
      },
    }
  }

  pub fn name(&self) -> &str {
    &self.resource.name
  }

  pub fn reference(&self) -> &ResourceTypeReference {
    &self.resource.reference
  }

  pub fn properties(&self) -> &[TypeProperty] {
    &self.resource.properties
  }

  pub fn property(&self, name: &str) -> Option<&TypeProperty> {
    self.resource.property(name)
  }

  pub fn property_type(&self, name: &str) -> Option<&TypeSymbol> {
    self.types.resolve(&self.property(name)?.ty)
  }

  pub fn additional_properties_type(&self) -> Option<&TypeSymbol> {
    self.types.resolve(self.resource.additional_properties.as_ref()?)
  }

  pub fn type_name(&self, ty: &TypeRef) -> String {
    self.types.type_name(ty)
  }
}

pub type ResourceTypeFactory = Arc<dyn Fn() -> BoundResourceType + Send + Sync>;

/// What a type checker needs from the registry.
pub trait ResourceTypeProvider: Send + Sync {
  fn lookup_type(&self, reference: &ResourceTypeReference) -> BoundResourceType;
  fn has_type_defined(&self, reference: &ResourceTypeReference) -> bool;
}

/// Maps resource type references to deferred producers of their types.
///
/// Keys compare case-insensitively. Registering a reference again replaces
/// its factory.
#[derive(Default)]
pub struct ResourceTypeRegistrar {
  accessors: RwLock<HashMap<ResourceTypeReference, ResourceTypeFactory>>,
}

impl ResourceTypeRegistrar {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_type<F>(&self, reference: ResourceTypeReference, factory: F)
  where
    F: Fn() -> BoundResourceType + Send + Sync + 'static,
  {
    let factory: ResourceTypeFactory = Arc::new(factory);
    let previous = self.accessors.write().insert(reference.clone(), factory);
    if previous.is_some() {
      log::debug!("replaced the registration of `{}`", reference);
    }
  }

  pub fn lookup_type(&self, reference: &ResourceTypeReference) -> BoundResourceType {
    // Clone the factory out so that it runs without the lock held.
    let factory = self.accessors.read().get(reference).cloned();
    match factory {
      Some(factory) => factory(),
      None => {
        log::trace!("`{}` is not registered, using the fallback shape", reference);
        BoundResourceType::fallback(reference)
      }
    }
  }

  pub fn has_type_defined(&self, reference: &ResourceTypeReference) -> bool {
    self.accessors.read().contains_key(reference)
  }

  pub fn registered_types(&self) -> Vec<ResourceTypeReference> {
    let mut out: Vec<_> = self.accessors.read().keys().cloned().collect();
    out.sort_by_cached_key(|x| x.to_string().to_ascii_lowercase());
    out
  }

  /// Loads one provider batch, converts it and registers every resource in
  /// it. Nothing is registered if loading or conversion fails.
  pub fn load_provider(
    &self,
    loader: &dyn TypeLoader,
    provider_namespace: &str,
    api_version: &str,
  ) -> Result<usize> {
    let nodes = loader.load_types(provider_namespace, api_version)?;
    let types = Arc::new(generate(&nodes, api_version)?);

    let resources = types
      .resources()
      .map(|(_, x)| x.clone())
      .collect::<Vec<_>>();
    for resource in &resources {
      let types = types.clone();
      let resource = resource.clone();
      self.register_type(resource.reference.clone(), move || BoundResourceType {
        types: types.clone(),
        resource: resource.clone(),
      });
    }

    log::info!(
      "registered {} resource type(s) from {}@{}",
      resources.len(),
      provider_namespace,
      api_version
    );
    Ok(resources.len())
  }
}

impl ResourceTypeProvider for ResourceTypeRegistrar {
  fn lookup_type(&self, reference: &ResourceTypeReference) -> BoundResourceType {
    ResourceTypeRegistrar::lookup_type(self, reference)
  }

  fn has_type_defined(&self, reference: &ResourceTypeReference) -> bool {
    ResourceTypeRegistrar::has_type_defined(self, reference)
  }
}

static GLOBAL: Lazy<ResourceTypeRegistrar> = Lazy::new(ResourceTypeRegistrar::new);

/// The process-wide registrar. Created empty on first use and kept for the
/// lifetime of the process.
pub fn global() -> &'static ResourceTypeRegistrar {
  &GLOBAL
}
