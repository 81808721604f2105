//! Naming strategies.
//!
//! A strategy turns a property and its group into a canonical name plus the
//! aliases the property requested, and defines the normalization used to
//! match names coming from sources. Strategies are pure: no I/O, no state.

use crate::property::{AliasDirection, AnyProperty};
use serde::Serialize;
use std::fmt;

/// Characters that may not appear in a name, besides whitespace.
pub const RESERVED_NAME_CHARS: &[char] = &['=', ':', ',', ';', '"', '\'', '\\'];

/// A name variant together with its normalized (matching) form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveName {
    /// The name as declared, kept for display.
    pub actual: String,
    /// The name after normalization, used for matching.
    pub effective: String,
    pub direction: AliasDirection,
}

/// Every name a property is known by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyNames {
    pub canonical: EffectiveName,
    pub aliases: Vec<EffectiveName>,
}

impl PropertyNames {
    /// Canonical name followed by every alias.
    pub fn all(&self) -> impl Iterator<Item = &EffectiveName> {
        std::iter::once(&self.canonical).chain(self.aliases.iter())
    }

    /// Names recognized when reading from sources.
    pub fn in_names(&self) -> impl Iterator<Item = &EffectiveName> {
        self.all().filter(|n| n.direction.is_in())
    }

    /// Names used when exporting values.
    pub fn out_names(&self) -> impl Iterator<Item = &EffectiveName> {
        self.all().filter(|n| n.direction.is_out())
    }
}

/// A declared name cannot be used by the naming scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("illegal name '{name}': {reason}")]
pub struct NamingError {
    pub name: String,
    pub reason: String,
}

/// Maps properties to names and defines name matching.
pub trait NamingStrategy: Send + Sync + fmt::Debug {
    /// Compute the canonical name and aliases of `property` within `group`.
    fn build_names(&self, property: &dyn AnyProperty, group: &str) -> Result<PropertyNames, NamingError>;

    /// Normalize a raw name for matching. Must be idempotent.
    fn to_effective_name(&self, name: &str) -> String;

    /// Hierarchical (directory-style) form of an effective name.
    fn uri_name(&self, name: &str) -> String {
        name.replace('.', "/")
    }

    /// Whether the URI form differs from the name, so hierarchical sources must try both.
    fn is_uri_name_distinct(&self, name: &str) -> bool {
        self.uri_name(name) != name
    }
}

/// Reject empty names, whitespace and reserved delimiters.
pub fn check_name(name: &str) -> Result<(), NamingError> {
    let error = |reason: &str| NamingError {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(error("name is empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(error("name contains whitespace"));
    }
    if let Some(c) = name.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
        return Err(error(&format!("name contains reserved character '{c}'")));
    }
    Ok(())
}

fn build_with(
    property: &dyn AnyProperty,
    group: &str,
    normalize: impl Fn(&str) -> String,
) -> Result<PropertyNames, NamingError> {
    let canonical = if group.is_empty() {
        property.name().to_string()
    } else {
        format!("{group}.{}", property.name())
    };
    check_name(&canonical)?;

    let aliases = property
        .aliases()
        .iter()
        .map(|alias| {
            check_name(&alias.name)?;
            Ok(EffectiveName {
                actual: alias.name.clone(),
                effective: normalize(&alias.name),
                direction: alias.direction,
            })
        })
        .collect::<Result<Vec<_>, NamingError>>()?;

    Ok(PropertyNames {
        canonical: EffectiveName {
            effective: normalize(&canonical),
            actual: canonical,
            direction: AliasDirection::Both,
        },
        aliases,
    })
}

/// Default strategy: `<group>.<field>` canonical names, matched case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveNaming;

impl NamingStrategy for CaseInsensitiveNaming {
    fn build_names(&self, property: &dyn AnyProperty, group: &str) -> Result<PropertyNames, NamingError> {
        build_with(property, group, |n| self.to_effective_name(n))
    }

    fn to_effective_name(&self, name: &str) -> String {
        name.to_uppercase()
    }
}

/// `<group>.<field>` canonical names, matched exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseSensitiveNaming;

impl NamingStrategy for CaseSensitiveNaming {
    fn build_names(&self, property: &dyn AnyProperty, group: &str) -> Result<PropertyNames, NamingError> {
        build_with(property, group, |n| self.to_effective_name(n))
    }

    fn to_effective_name(&self, name: &str) -> String {
        name.to_string()
    }
}
