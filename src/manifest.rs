//! Declarative property manifests.
//!
//! A manifest describes groups and their properties in YAML so that tools
//! (the CLI in particular) can resolve configuration without compiled-in
//! declarations:
//!
//! ```yaml
//! groups:
//!   - name: org.app.Server
//!     properties:
//!       - name: PORT
//!         type: u16
//!         default: 8080
//!         aliases: [port]
//!         min: 1
//!       - name: HOST
//!         required: true
//!         not_blank: true
//! ```

use crate::error::ManifestError;
use crate::group::PropertyGroup;
use crate::property::{DynProperty, Property, PropertyBuilder, PropertyType};
use crate::validate::{Compare, MatchesPattern, NotBlank, OneOf};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A whole manifest file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// One group of a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,
    /// At least one member must receive an explicit value.
    #[serde(default)]
    pub at_least_one: bool,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

/// One property of a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySpec {
    pub name: String,
    #[serde(default = "default_type", rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    /// Input aliases.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub out_aliases: Vec<String>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min: Option<Value>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub one_of: Vec<Value>,
    /// Regular expression the whole value must match (strings only).
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub not_blank: bool,
}

fn default_type() -> String {
    "string".to_string()
}

impl Manifest {
    pub fn from_yaml(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_yaml(&text)?;
        debug!(path = %path.display(), groups = manifest.groups.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Build the declared groups. Every call creates fresh property identities.
    pub fn to_groups(&self) -> Result<Vec<PropertyGroup>, ManifestError> {
        self.groups.iter().map(GroupSpec::to_group).collect()
    }
}

impl GroupSpec {
    pub fn to_group(&self) -> Result<PropertyGroup, ManifestError> {
        let mut group = PropertyGroup::new(&self.name);
        for spec in &self.properties {
            group.add_dyn(spec.to_property()?);
        }
        if self.at_least_one {
            group = group.require_at_least_one();
        }
        Ok(group)
    }
}

impl PropertySpec {
    /// Build the property this spec declares.
    pub fn to_property(&self) -> Result<DynProperty, ManifestError> {
        match self.value_type.to_lowercase().as_str() {
            "string" | "str" => self.typed::<String>(|builder| self.string_validators(builder)),
            "bool" | "boolean" => self.typed::<bool>(|b| self.no_string_validators(b)),
            "i32" => self.typed::<i32>(|b| self.no_string_validators(b)),
            "i64" | "int" | "integer" => self.typed::<i64>(|b| self.no_string_validators(b)),
            "u16" | "port" => self.typed::<u16>(|b| self.no_string_validators(b)),
            "u32" => self.typed::<u32>(|b| self.no_string_validators(b)),
            "u64" => self.typed::<u64>(|b| self.no_string_validators(b)),
            "usize" => self.typed::<usize>(|b| self.no_string_validators(b)),
            "f64" | "float" | "number" => self.typed::<f64>(|b| self.no_string_validators(b)),
            "path" => self.typed::<PathBuf>(|b| self.no_string_validators(b)),
            "date" => self.typed::<NaiveDate>(|b| self.no_string_validators(b)),
            "datetime" => self.typed::<DateTime<FixedOffset>>(|b| self.no_string_validators(b)),
            other => Err(ManifestError::UnsupportedType {
                property: self.name.clone(),
                value_type: other.to_string(),
            }),
        }
    }

    fn typed<T: PropertyType + PartialOrd>(
        &self,
        extra: impl FnOnce(PropertyBuilder<T>) -> Result<PropertyBuilder<T>, ManifestError>,
    ) -> Result<DynProperty, ManifestError> {
        let mut builder = Property::<T>::builder(&self.name);
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        if let Some(default) = &self.default {
            builder = builder.default_value(self.parse_scalar::<T>("default", default)?);
        }
        for alias in &self.aliases {
            builder = builder.in_alias(alias);
        }
        for alias in &self.out_aliases {
            builder = builder.out_alias(alias);
        }
        if self.required {
            builder = builder.required();
        }
        if let Some(min) = &self.min {
            let bound = self.parse_scalar::<T>("min", min)?;
            builder = builder.validator(Compare::must_be_greater_than_or_equal_to(bound));
        }
        if let Some(max) = &self.max {
            let bound = self.parse_scalar::<T>("max", max)?;
            builder = builder.validator(Compare::must_be_less_than_or_equal_to(bound));
        }
        if !self.one_of.is_empty() {
            let allowed = self
                .one_of
                .iter()
                .map(|v| self.parse_scalar::<T>("one_of", v))
                .collect::<Result<Vec<T>, _>>()?;
            builder = builder.validator(OneOf::new(allowed));
        }
        Ok(extra(builder)?.build().to_dyn())
    }

    fn string_validators(&self, mut builder: PropertyBuilder<String>) -> Result<PropertyBuilder<String>, ManifestError> {
        if self.not_blank {
            builder = builder.validator(NotBlank);
        }
        if let Some(pattern) = &self.pattern {
            builder = builder.validator(MatchesPattern::new(pattern));
        }
        Ok(builder)
    }

    fn no_string_validators<T: PropertyType>(
        &self,
        builder: PropertyBuilder<T>,
    ) -> Result<PropertyBuilder<T>, ManifestError> {
        if self.not_blank || self.pattern.is_some() {
            return Err(ManifestError::invalid(
                &self.name,
                "not_blank and pattern apply to string properties only",
            ));
        }
        Ok(builder)
    }

    fn parse_scalar<T: PropertyType>(&self, field: &str, value: &Value) -> Result<T, ManifestError> {
        let raw = scalar_text(value)
            .ok_or_else(|| ManifestError::invalid(&self.name, format!("{field} must be a scalar")))?;
        T::parse(&raw).map_err(|e| ManifestError::invalid(&self.name, format!("{field}: {e}")))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
