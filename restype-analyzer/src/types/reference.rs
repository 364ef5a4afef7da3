use std::{
  fmt::Display,
  hash::{Hash, Hasher},
  str::FromStr,
  sync::Arc,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

static REFERENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^([A-Za-z0-9][A-Za-z0-9.]*)((?:/[A-Za-z0-9_.\-]+)+)@([A-Za-z0-9.\-]+)$")
    .unwrap()
});

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("invalid resource type reference `{0}`: expecting `<namespace>/<type>[/<subtype>...]@<apiVersion>`")]
pub struct InvalidReferenceFormatError(pub String);

/// Identifies a resource kind at a specific API version, e.g.
/// `Microsoft.Storage/storageAccounts@2019-06-01`.
///
/// Equality and hashing are case-insensitive over the whole
/// `<fullType>@<apiVersion>` string.
#[derive(Clone, Debug)]
pub struct ResourceTypeReference {
  namespace: Arc<str>,
  types: Vec<Arc<str>>,
  api_version: Arc<str>,
}

impl ResourceTypeReference {
  pub fn parse(input: &str) -> Result<Self, InvalidReferenceFormatError> {
    let captures = REFERENCE_PATTERN
      .captures(input)
      .ok_or_else(|| InvalidReferenceFormatError(input.to_string()))?;
    let group = |i: usize| captures.get(i).map(|x| x.as_str()).unwrap_or_default();

    let types = group(2)
      .split('/')
      .filter(|x| !x.is_empty())
      .map(Arc::from)
      .collect::<Vec<_>>();
    if types.is_empty() {
      return Err(InvalidReferenceFormatError(input.to_string()));
    }

    Ok(Self {
      namespace: Arc::from(group(1)),
      types,
      api_version: Arc::from(group(3)),
    })
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn types(&self) -> &[Arc<str>] {
    &self.types
  }

  pub fn api_version(&self) -> &str {
    &self.api_version
  }

  /// `<namespace>/<type>[/<subtype>...]`, without the version.
  pub fn full_type(&self) -> String {
    let mut out = self.namespace.to_string();
    for t in &self.types {
      out.push('/');
      out.push_str(t);
    }
    out
  }

  fn segments(&self) -> impl Iterator<Item = &str> {
    std::iter::once(&*self.namespace)
      .chain(self.types.iter().map(|x| &**x))
      .chain(std::iter::once(&*self.api_version))
  }
}

impl PartialEq for ResourceTypeReference {
  fn eq(&self, that: &Self) -> bool {
    self.types.len() == that.types.len()
      && self
        .segments()
        .zip(that.segments())
        .all(|(a, b)| a.eq_ignore_ascii_case(b))
  }
}

impl Eq for ResourceTypeReference {}

impl Hash for ResourceTypeReference {
  fn hash<H: Hasher>(&self, state: &mut H) {
    for segment in self.segments() {
      for b in segment.bytes() {
        state.write_u8(b.to_ascii_lowercase());
      }
      state.write_u8(0xff);
    }
  }
}

impl Display for ResourceTypeReference {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}@{}", self.full_type(), self.api_version)
  }
}

impl FromStr for ResourceTypeReference {
  type Err = InvalidReferenceFormatError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl Serialize for ResourceTypeReference {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ResourceTypeReference {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    Self::parse(&s).map_err(serde::de::Error::custom)
  }
}
