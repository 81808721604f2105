//! Typed configuration resolution.
//!
//! Applications declare typed [`Property`] values in named
//! [`PropertyGroup`]s. A [`Resolver`] registers them under canonical names and
//! aliases, runs an ordered list of [`Loader`]s where the first value found
//! wins, validates what was loaded, checks requirements, and returns either
//! an immutable [`ValueMap`] or a [`ProblemList`] holding every problem found.
//!
//! ```no_run
//! use prop_resolve::loaders::{ArgsLoader, EnvLoader};
//! use prop_resolve::{Property, PropertyGroup, Resolver};
//!
//! let port = Property::<u16>::builder("PORT").default_value(8080).build();
//! let values = Resolver::builder()
//!     .group(PropertyGroup::new("org.app.Server").with(&port))
//!     .loader(ArgsLoader::new())
//!     .loader(EnvLoader::new())
//!     .resolve()
//!     .into_result()?;
//! println!("port = {:?}", values.effective_value(&port));
//! # Ok::<(), prop_resolve::ProblemList>(())
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod format;
pub mod global;
pub mod group;
pub mod lifecycle;
pub mod loader;
pub mod loaders;
pub mod manifest;
pub mod naming;
pub mod problem;
pub mod property;
pub mod registry;
pub mod validate;
pub mod values;

pub use engine::{Resolution, Resolver, ResolverBuilder, resolve};
pub use group::PropertyGroup;
pub use loader::{Environment, LoadContext, Loader, LoaderValues, MapEnvironment, SystemEnvironment};
pub use naming::{CaseInsensitiveNaming, CaseSensitiveNaming, NamingStrategy};
pub use problem::{Problem, ProblemList};
pub use property::{Alias, AliasDirection, Property, PropertyType};
pub use registry::PropertyRegistry;
pub use values::{ForcedValues, ValueMap};
