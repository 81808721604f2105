//! Integration tests for the file, environment and argument loaders.
//!
//! File sources are written to temporary directories so each test controls
//! exactly what exists on disk.

use prop_resolve::error::ProblemCode;
use prop_resolve::loaders::{
    ArgsLoader, EnvLoader, FixedValueLoader, PropertiesFileLoader, YamlFileLoader,
};
use prop_resolve::problem::LoaderProblemKind;
use prop_resolve::{MapEnvironment, Property, PropertyGroup, Resolution, Resolver};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn codes(resolution: &Resolution) -> Vec<ProblemCode> {
    resolution.problems().iter().map(|p| p.code()).collect()
}

#[test]
fn test_properties_file_values_are_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.properties");
    fs::write(
        &path,
        "# server settings\norg.app.PORT = 8080\norg.app.debug: yes\norg.app.NAME \"  padded  \"\n",
    )
    .unwrap();

    let port = Property::<u16>::builder("PORT").build();
    let debug = Property::<bool>::builder("DEBUG").build();
    let name = Property::<String>::builder("NAME").build();
    let values = Resolver::builder()
        .group(PropertyGroup::new("org.app").with(&port).with(&debug).with(&name))
        .loader(PropertiesFileLoader::new(path).required())
        .resolve()
        .into_result()
        .unwrap();

    assert_eq!(values.explicit_value(&port), Some(&8080));
    assert_eq!(values.explicit_value(&debug), Some(&true));
    assert_eq!(values.explicit_value(&name).map(String::as_str), Some("  padded  "));
}

#[test]
fn test_repeated_key_in_one_file_is_a_duplicate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dup.properties");
    fs::write(&path, "g.A=first\ng.a=second\n").unwrap();

    let a = Property::<String>::builder("A").build();
    let resolution = Resolver::builder()
        .group(PropertyGroup::new("g").with(&a))
        .loader(PropertiesFileLoader::new(path))
        .resolve();

    assert_eq!(codes(&resolution), vec![ProblemCode::DuplicatePropertyLoader]);
    let problem = resolution.problems().loader().next().unwrap();
    assert!(matches!(
        &problem.kind,
        LoaderProblemKind::DuplicateProperty { name: Some(name), .. } if name == "g.a"
    ));
    assert_eq!(
        resolution.partial_values().unwrap().explicit_value(&a).map(String::as_str),
        Some("first")
    );
}

#[test]
fn test_yaml_first_key_in_document_wins() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dup.yaml");
    fs::write(&path, "g:\n  port: 2\n  Port: 1\n").unwrap();

    let port = Property::<u16>::builder("PORT").build();
    let resolution = Resolver::builder()
        .group(PropertyGroup::new("g").with(&port))
        .loader(YamlFileLoader::new(path))
        .resolve();

    assert_eq!(codes(&resolution), vec![ProblemCode::DuplicatePropertyLoader]);
    let problem = resolution.problems().loader().next().unwrap();
    assert!(matches!(
        &problem.kind,
        LoaderProblemKind::DuplicateProperty { name: Some(name), .. } if name == "g.Port"
    ));
    assert_eq!(resolution.partial_values().unwrap().explicit_value(&port), Some(&2));
}

#[test]
fn test_missing_required_file_does_not_stop_other_loaders() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.properties");
    let optional = dir.path().join("also-absent.properties");

    let a = Property::<String>::builder("A").build();
    let resolution = Resolver::builder()
        .group(PropertyGroup::new("g").with(&a))
        .loader(PropertiesFileLoader::new(missing).required())
        .loader(PropertiesFileLoader::new(optional))
        .loader(FixedValueLoader::new("fallback").with_name("g.A", "x"))
        .resolve();

    assert_eq!(codes(&resolution), vec![ProblemCode::SourceNotFound]);
    assert_eq!(resolution.problems().loader().next().unwrap().loader.position, 0);
    assert_eq!(
        resolution.partial_values().unwrap().explicit_value(&a).map(String::as_str),
        Some("x")
    );
}

#[test]
fn test_file_path_from_earlier_loader() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("located.yaml");
    fs::write(&path, "g:\n  A: from-yaml\n  LIMITS: [1, 2]\n").unwrap();

    let config_file = Property::<PathBuf>::builder("CONFIG_FILE").build();
    let a = Property::<String>::builder("A").build();
    let limits = Property::<String>::builder("LIMITS").build();
    let values = Resolver::builder()
        .group(PropertyGroup::new("boot").with(&config_file))
        .group(PropertyGroup::new("g").with(&a).with(&limits))
        .environment(MapEnvironment::new().with_arg(format!("boot.config_file={}", path.display())))
        .loader(ArgsLoader::new())
        .loader(YamlFileLoader::new(config_file.clone()).required())
        .resolve()
        .into_result()
        .unwrap();

    assert_eq!(values.explicit_value(&a).map(String::as_str), Some("from-yaml"));
    assert_eq!(values.explicit_value(&limits).map(String::as_str), Some("1,2"));
}

#[test]
fn test_unset_path_property_with_required_file() {
    let config_file = Property::<PathBuf>::builder("CONFIG_FILE").build();
    let resolution = Resolver::builder()
        .group(PropertyGroup::new("boot").with(&config_file))
        .loader(YamlFileLoader::new(config_file.clone()).required())
        .resolve();
    assert_eq!(codes(&resolution), vec![ProblemCode::SourceNotFound]);
}

#[test]
fn test_malformed_yaml_is_a_source_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "a: [unclosed\n").unwrap();

    let resolution = Resolver::builder()
        .loader(YamlFileLoader::new(path))
        .resolve();
    assert_eq!(codes(&resolution), vec![ProblemCode::SourceError]);
}

#[test]
fn test_env_loader_prefix_and_unknown_reporting() {
    let port = Property::<u16>::builder("PORT").build();
    let resolution = Resolver::builder()
        .group(PropertyGroup::new("net").with(&port))
        .environment(
            MapEnvironment::new()
                .with_var("APP_NET_PORT", "9000")
                .with_var("NET_PORT", "1")
                .with_var("APP_UNRELATED", "x"),
        )
        .loader(EnvLoader::with_prefix("APP_"))
        .resolve();

    assert!(resolution.is_success(), "{}", resolution.problems());
    assert_eq!(resolution.values().unwrap().explicit_value(&port), Some(&9000));
}

#[test]
fn test_args_unknown_names_are_reported() {
    let port = Property::<u16>::builder("PORT").build();
    let resolution = Resolver::builder()
        .group(PropertyGroup::new("net").with(&port))
        .environment(MapEnvironment::new().with_args(["--net.port=80", "--verbose"]))
        .loader(ArgsLoader::new())
        .resolve();

    assert_eq!(codes(&resolution), vec![ProblemCode::UnknownProperty]);

    let lenient = Resolver::builder()
        .group(PropertyGroup::new("net").with(&port))
        .environment(MapEnvironment::new().with_args(["--net.port=80", "--verbose"]))
        .loader(ArgsLoader::new().report_unknown(false))
        .resolve();
    assert!(lenient.is_success());
}
