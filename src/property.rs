//! Typed configuration points.
//!
//! A [`Property<T>`] is a cheap handle to a single shared declaration. Cloning
//! the handle does not create a new property: identity is the [`PropertyId`]
//! assigned when the property is built, so two properties declared with the
//! same settings are still distinct.
//!
//! The registry and the loader pipeline work with the type-erased
//! [`AnyProperty`] view; typed access happens at the edges through
//! [`ValueMap`](crate::values::ValueMap) and [`LoadedValues`](crate::values::LoadedValues).

use crate::error::ParseError;
use crate::validate::Validator;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROPERTY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a property declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PropertyId(u64);

impl PropertyId {
    fn next() -> Self {
        Self(NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type-erased, shareable property value.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

/// A type-erased property handle as stored in groups and the registry.
pub type DynProperty = Arc<dyn AnyProperty>;

/// Value types a property can hold.
pub trait PropertyType: Any + Send + Sync + fmt::Debug {
    /// Short type name used in diagnostics.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Convert a raw string from a source into a value.
    fn parse(raw: &str) -> Result<Self, ParseError>
    where
        Self: Sized;

    /// Render the value back to the raw form a source would contain.
    fn to_raw(&self) -> String;
}

/// Strip surrounding whitespace; a double-quoted value keeps its inner whitespace.
fn trim_quoted(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

impl PropertyType for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        Ok(trim_quoted(raw).to_string())
    }

    fn to_raw(&self) -> String {
        self.clone()
    }
}

impl PropertyType for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
            _ => Err(ParseError::new(
                "bool",
                raw,
                "expected one of true/false, yes/no, on/off, 1/0",
            )),
        }
    }

    fn to_raw(&self) -> String {
        self.to_string()
    }
}

macro_rules! from_str_property_type {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl PropertyType for $ty {
                fn type_name() -> &'static str {
                    $name
                }

                fn parse(raw: &str) -> Result<Self, ParseError> {
                    raw.trim()
                        .parse::<$ty>()
                        .map_err(|e| ParseError::new($name, raw, e))
                }

                fn to_raw(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

from_str_property_type! {
    i32 => "i32",
    i64 => "i64",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f64 => "f64",
}

impl PropertyType for PathBuf {
    fn type_name() -> &'static str {
        "path"
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        let value = trim_quoted(raw);
        if value.is_empty() {
            return Err(ParseError::new("path", raw, "path is empty"));
        }
        Ok(PathBuf::from(value))
    }

    fn to_raw(&self) -> String {
        self.to_string_lossy().into_owned()
    }
}

impl PropertyType for NaiveDate {
    fn type_name() -> &'static str {
        "date"
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| ParseError::new("date", raw, e))
    }

    fn to_raw(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl PropertyType for DateTime<FixedOffset> {
    fn type_name() -> &'static str {
        "datetime"
    }

    fn parse(raw: &str) -> Result<Self, ParseError> {
        DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| ParseError::new("datetime", raw, e))
    }

    fn to_raw(&self) -> String {
        self.to_rfc3339()
    }
}

/// Which way a name may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasDirection {
    /// Recognized when reading values from sources.
    In,
    /// Used only when exporting values to other systems.
    Out,
    /// Both of the above.
    Both,
}

impl AliasDirection {
    pub fn is_in(self) -> bool {
        matches!(self, AliasDirection::In | AliasDirection::Both)
    }

    pub fn is_out(self) -> bool {
        matches!(self, AliasDirection::Out | AliasDirection::Both)
    }
}

/// An alternate name requested for a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    pub name: String,
    pub direction: AliasDirection,
}

impl Alias {
    pub fn new(name: impl Into<String>, direction: AliasDirection) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, AliasDirection::In)
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, AliasDirection::Out)
    }

    pub fn both(name: impl Into<String>) -> Self {
        Self::new(name, AliasDirection::Both)
    }
}

/// Parser converting raw source strings to `T`.
pub type ValueParser<T> = fn(&str) -> Result<T, ParseError>;

struct PropertyDef<T: PropertyType> {
    id: PropertyId,
    name: String,
    description: Option<String>,
    default: Option<T>,
    validators: Vec<Arc<dyn Validator<T>>>,
    aliases: Vec<Alias>,
    required: bool,
    parser: ValueParser<T>,
}

impl<T: PropertyType> fmt::Debug for PropertyDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &T::type_name())
            .field("default", &self.default)
            .field("aliases", &self.aliases)
            .field("required", &self.required)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// A typed configuration point.
pub struct Property<T: PropertyType> {
    inner: Arc<PropertyDef<T>>,
}

impl<T: PropertyType> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PropertyType> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: PropertyType> Property<T> {
    /// Start declaring a property with the given field name.
    pub fn builder(name: impl Into<String>) -> PropertyBuilder<T> {
        PropertyBuilder::new(name)
    }

    pub fn id(&self) -> PropertyId {
        self.inner.id
    }

    /// Field name as declared, before any group qualification.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    pub fn default_value(&self) -> Option<&T> {
        self.inner.default.as_ref()
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.inner.aliases
    }

    pub fn is_required(&self) -> bool {
        self.inner.required
    }

    /// Parse a raw string with this property's parser.
    pub fn parse(&self, raw: &str) -> Result<T, ParseError> {
        (self.inner.parser)(raw)
    }

    /// Message of the first validator rejecting `value`, if any.
    pub fn validate(&self, value: &T) -> Result<(), String> {
        self.inner.validate(value)
    }

    /// Type-erased handle sharing this property's identity.
    pub fn to_dyn(&self) -> DynProperty {
        self.inner.clone()
    }
}

impl<T: PropertyType> PropertyDef<T> {
    fn validate(&self, value: &T) -> Result<(), String> {
        for validator in &self.validators {
            if !validator.is_valid(value) {
                return Err(validator.invalid_message(value));
            }
        }
        Ok(())
    }
}

/// Builder for [`Property`].
pub struct PropertyBuilder<T: PropertyType> {
    name: String,
    description: Option<String>,
    default: Option<T>,
    validators: Vec<Arc<dyn Validator<T>>>,
    aliases: Vec<Alias>,
    required: bool,
    parser: ValueParser<T>,
}

impl<T: PropertyType> PropertyBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default: None,
            validators: Vec::new(),
            aliases: Vec::new(),
            required: false,
            parser: T::parse,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    pub fn alias(mut self, alias: Alias) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Shorthand for an input alias.
    pub fn in_alias(self, name: impl Into<String>) -> Self {
        self.alias(Alias::input(name))
    }

    /// Shorthand for an output alias.
    pub fn out_alias(self, name: impl Into<String>) -> Self {
        self.alias(Alias::output(name))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validator(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Replace the type's default parser.
    pub fn parser(mut self, parser: ValueParser<T>) -> Self {
        self.parser = parser;
        self
    }

    pub fn build(self) -> Property<T> {
        Property {
            inner: Arc::new(PropertyDef {
                id: PropertyId::next(),
                name: self.name,
                description: self.description,
                default: self.default,
                validators: self.validators,
                aliases: self.aliases,
                required: self.required,
                parser: self.parser,
            }),
        }
    }
}

/// Type-erased view of a property used by the registry and the engine.
pub trait AnyProperty: Send + Sync + fmt::Debug {
    fn id(&self) -> PropertyId;
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn value_type(&self) -> &'static str;
    fn aliases(&self) -> &[Alias];
    fn is_required(&self) -> bool;
    fn has_default(&self) -> bool;
    fn default_raw(&self) -> Option<String>;

    /// Parse a raw source string into an erased value of this property's type.
    fn parse_value(&self, raw: &str) -> Result<ErasedValue, ParseError>;

    /// Run validators in declaration order; the first failure's message is returned.
    fn check_value(&self, value: &ErasedValue) -> Result<(), String>;

    /// Validate the declared default, if there is one.
    fn check_default(&self) -> Result<(), String>;

    /// Descriptions of validators whose own configuration is malformed.
    fn invalid_validator_specs(&self) -> Vec<String>;

    /// Raw string form of an erased value of this property's type.
    fn raw_value(&self, value: &ErasedValue) -> Option<String>;
}

impl<T: PropertyType> AnyProperty for PropertyDef<T> {
    fn id(&self) -> PropertyId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn value_type(&self) -> &'static str {
        T::type_name()
    }

    fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn default_raw(&self) -> Option<String> {
        self.default.as_ref().map(PropertyType::to_raw)
    }

    fn parse_value(&self, raw: &str) -> Result<ErasedValue, ParseError> {
        let value: T = (self.parser)(raw)?;
        Ok(Arc::new(value))
    }

    fn check_value(&self, value: &ErasedValue) -> Result<(), String> {
        match value.downcast_ref::<T>() {
            Some(typed) => self.validate(typed),
            None => Err(format!("value is not of type {}", T::type_name())),
        }
    }

    fn check_default(&self) -> Result<(), String> {
        match &self.default {
            Some(default) => self.validate(default),
            None => Ok(()),
        }
    }

    fn invalid_validator_specs(&self) -> Vec<String> {
        self.validators
            .iter()
            .filter(|v| !v.is_specification_valid())
            .map(|v| v.specification_message())
            .collect()
    }

    fn raw_value(&self, value: &ErasedValue) -> Option<String> {
        value.downcast_ref::<T>().map(PropertyType::to_raw)
    }
}
