//! Integration tests for manifest-driven resolution as performed by `check`.

use clap::Parser;
use prop_resolve::cli::{Cli, Command};
use prop_resolve::error::ProblemCode;
use prop_resolve::format::{names_to_json, problems_to_json, values_to_json};
use prop_resolve::manifest::Manifest;
use prop_resolve::registry::RegistryBuilder;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MANIFEST: &str = r#"
groups:
  - name: org.app.Server
    properties:
      - name: PORT
        type: u16
        default: 8080
        aliases: [port]
        min: 1024
      - name: HOST
        required: true
        not_blank: true
      - name: MODE
        one_of: [dev, prod]
        default: dev
  - name: org.app.Auth
    at_least_one: true
    properties:
      - name: TOKEN
      - name: PASSWORD_FILE
        type: path
"#;

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path.display().to_string()
}

fn check_args(argv: &[&str]) -> prop_resolve::cli::check::CheckArgs {
    let cli = Cli::try_parse_from(argv).unwrap();
    match cli.command {
        Command::Check(args) => args,
        other => panic!("expected check, got {other:?}"),
    }
}

#[test]
fn test_manifest_resolves_from_set_and_properties_file() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "manifest.yaml", MANIFEST);
    let props = write(
        dir.path(),
        "app.properties",
        "org.app.Server.HOST=example.org\nport=9000\n",
    );

    let args = check_args(&[
        "prop-resolve",
        "check",
        "--manifest",
        &manifest,
        "--set",
        "org.app.Auth.TOKEN=secret",
        "--properties",
        &props,
    ]);
    let groups = Manifest::from_path(&args.manifest).unwrap().to_groups().unwrap();
    let values = args.resolver(groups).resolve().into_result().unwrap();

    let json = values_to_json(&values);
    let rows = json["values"].as_array().unwrap();
    let row = |name: &str| rows.iter().find(|r| r["name"] == name).unwrap().clone();

    assert_eq!(row("org.app.Server.PORT")["value"], "9000");
    assert_eq!(row("org.app.Server.HOST")["value"], "example.org");
    assert_eq!(row("org.app.Server.MODE")["value"], "dev");
    assert!(row("org.app.Server.MODE")["source"].is_null());
    assert_eq!(row("org.app.Auth.TOKEN")["value"], "secret");
    assert!(row("org.app.Auth.PASSWORD_FILE")["value"].is_null());
}

#[test]
fn test_manifest_problems_are_all_reported() {
    let dir = TempDir::new().unwrap();
    let manifest = write(dir.path(), "manifest.yaml", MANIFEST);
    let yaml = write(
        dir.path(),
        "values.yaml",
        "org:\n  app:\n    Server:\n      PORT: 80\n      MODE: test\n      HOST: '  '\n",
    );

    let args = check_args(&["prop-resolve", "check", "-m", &manifest, "--yaml", &yaml]);
    let groups = Manifest::from_path(&args.manifest).unwrap().to_groups().unwrap();
    let problems = args.resolver(groups).resolve().into_result().unwrap_err();

    let codes: Vec<ProblemCode> = problems.iter().map(|p| p.code()).collect();
    assert_eq!(
        codes,
        vec![
            ProblemCode::InvalidValue,
            ProblemCode::InvalidValue,
            ProblemCode::InvalidValue,
            ProblemCode::RequiredGroup,
        ]
    );
    let json = problems_to_json(&problems);
    assert_eq!(json["ok"], false);
    assert_eq!(json["count"], 4);
}

#[test]
fn test_names_lists_aliases_and_types() {
    let manifest = Manifest::from_yaml(MANIFEST).unwrap();
    let (registry, problems) = RegistryBuilder::new()
        .groups(manifest.to_groups().unwrap())
        .build();
    assert!(problems.is_empty());

    let json = names_to_json(&registry);
    let properties = json["properties"].as_array().unwrap();
    assert_eq!(properties.len(), 5);
    let port = &properties[0];
    assert_eq!(port["name"], "org.app.Server.PORT");
    assert_eq!(port["type"], "u16");
    assert_eq!(port["default"], "8080");
    assert_eq!(port["aliases"][0]["actual"], "port");
}

#[test]
fn test_manifest_rejects_unknown_type() {
    let err = Manifest::from_yaml("groups:\n  - name: g\n    properties:\n      - name: X\n        type: complex\n")
        .unwrap()
        .to_groups()
        .unwrap_err();
    assert!(err.to_string().contains("unsupported type 'complex'"), "{err}");
}
