//! Reference loader implementations.

mod args;
mod env;
mod fixed;
mod properties;
mod yaml;

pub use args::ArgsLoader;
pub use env::EnvLoader;
pub use fixed::FixedValueLoader;
pub use properties::{PropertiesFileLoader, parse_properties};
pub use yaml::{YamlFileLoader, flatten_yaml};

use crate::loader::LoadContext;
use crate::problem::LoaderProblemKind;
use crate::property::Property;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Where a file-based loader finds its file.
#[derive(Debug, Clone)]
pub enum FileLocation {
    Path(PathBuf),
    /// Path taken from a property claimed by an earlier loader (or its default).
    FromProperty(Property<PathBuf>),
}

impl FileLocation {
    fn resolve(&self, ctx: &LoadContext<'_>) -> Option<PathBuf> {
        match self {
            FileLocation::Path(path) => Some(path.clone()),
            FileLocation::FromProperty(property) => ctx.value(property).cloned(),
        }
    }

    fn describe(&self) -> String {
        match self {
            FileLocation::Path(path) => path.display().to_string(),
            FileLocation::FromProperty(property) => format!("path from property '{}'", property.name()),
        }
    }
}

impl From<PathBuf> for FileLocation {
    fn from(path: PathBuf) -> Self {
        FileLocation::Path(path)
    }
}

impl From<&str> for FileLocation {
    fn from(path: &str) -> Self {
        FileLocation::Path(PathBuf::from(path))
    }
}

impl From<Property<PathBuf>> for FileLocation {
    fn from(property: Property<PathBuf>) -> Self {
        FileLocation::FromProperty(property)
    }
}

/// Read the file a loader points at.
///
/// `Ok(None)` means there is nothing to load: the file is optional and absent.
fn read_source(
    location: &FileLocation,
    required: bool,
    ctx: &LoadContext<'_>,
) -> Result<Option<(PathBuf, String)>, LoaderProblemKind> {
    let Some(path) = location.resolve(ctx) else {
        if required {
            return Err(LoaderProblemKind::source_not_found(
                location.describe(),
                "no path configured",
            ));
        }
        debug!(location = %location.describe(), "no path configured, skipping optional source");
        return Ok(None);
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(Some((path, content))),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if required {
                Err(LoaderProblemKind::source_not_found(
                    path.display().to_string(),
                    e.to_string(),
                ))
            } else {
                debug!(path = %path.display(), "optional source not found");
                Ok(None)
            }
        }
        Err(e) => Err(LoaderProblemKind::source_error(path.display().to_string(), e)),
    }
}
