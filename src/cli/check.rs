//! Check subcommand for prop-resolve
//!
//! Resolves the properties declared by a manifest from command line
//! assignments, environment variables and property files.

use crate::engine::{Resolver, ResolverBuilder};
use crate::group::PropertyGroup;
use crate::loaders::{EnvLoader, FixedValueLoader, PropertiesFileLoader, YamlFileLoader};
use crate::naming::{CaseInsensitiveNaming, CaseSensitiveNaming};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the check subcommand
///
/// Sources are consulted in this order and the first value found wins:
/// `--set`, environment variables, `--properties` files, `--yaml` files.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Property manifest (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Assign a value by any property name (repeatable)
    #[arg(short, long, value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Read environment variables
    #[arg(long)]
    pub env: bool,

    /// Only read environment variables with this prefix (implies --env)
    #[arg(long, value_name = "PREFIX")]
    pub env_prefix: Option<String>,

    /// Java-style properties file (repeatable, must exist)
    #[arg(long, value_name = "FILE")]
    pub properties: Vec<PathBuf>,

    /// YAML values file (repeatable, must exist)
    #[arg(long, value_name = "FILE")]
    pub yaml: Vec<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Match names case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,
}

impl CheckArgs {
    pub fn uses_env(&self) -> bool {
        self.env || self.env_prefix.is_some()
    }

    /// Build the resolver for the given groups, loaders in precedence order.
    pub fn resolver(&self, groups: Vec<PropertyGroup>) -> Resolver {
        let mut builder = ResolverBuilder::new().groups(groups).label(format!(
            "manifest {}",
            self.manifest.display()
        ));
        builder = if self.case_sensitive {
            builder.naming(CaseSensitiveNaming)
        } else {
            builder.naming(CaseInsensitiveNaming)
        };

        if !self.set.is_empty() {
            builder = builder.loader(FixedValueLoader::new("--set arguments").with_pairs(&self.set));
        }
        if self.uses_env() {
            builder = builder.loader(match &self.env_prefix {
                Some(prefix) => EnvLoader::with_prefix(prefix),
                None => EnvLoader::new(),
            });
        }
        for path in &self.properties {
            builder = builder.loader(PropertiesFileLoader::new(path.clone()).required());
        }
        for path in &self.yaml {
            builder = builder.loader(YamlFileLoader::new(path.clone()).required());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    fn args(set: &[&str]) -> CheckArgs {
        CheckArgs {
            manifest: PathBuf::from("app.yaml"),
            set: set.iter().map(|s| s.to_string()).collect(),
            env: false,
            env_prefix: None,
            properties: Vec::new(),
            yaml: vec![PathBuf::from("/nonexistent/values.yaml")],
            format: "text".to_string(),
            case_sensitive: false,
        }
    }

    #[test]
    fn test_set_wins_over_files_and_missing_file_is_reported() {
        let port = Property::<i64>::builder("PORT").build();
        let resolution = args(&["app.port=1"])
            .resolver(vec![PropertyGroup::new("app").with(&port)])
            .resolve();

        assert_eq!(resolution.problems().len(), 1);
        let values = resolution.partial_values().unwrap();
        assert_eq!(values.explicit_value(&port), Some(&1));
    }
}
