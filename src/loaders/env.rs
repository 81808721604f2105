use crate::loader::{LoadContext, Loader, LoaderValues};
use heck::ToShoutySnakeCase;
use std::sync::Arc;

/// Environment variables.
///
/// Each input name of a property is looked up as written and in its
/// SHOUTY_SNAKE form (`org.app.Port` → `ORG_APP_PORT`), with the prefix
/// prepended when one is set. The loader asks for names it knows, so unknown
/// variables are never reported.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider variables starting with `prefix` (e.g. `APP_`).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Variable names probed for one property name.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let mut names = vec![format!("{prefix}{name}")];
        let shouty = format!("{prefix}{}", name.to_shouty_snake_case());
        if !names.contains(&shouty) {
            names.push(shouty);
        }
        names
    }
}

impl Loader for EnvLoader {
    fn load(&self, ctx: &LoadContext<'_>) -> LoaderValues {
        let mut values = LoaderValues::new();
        for entry in ctx.registry.entries() {
            let mut probed: Vec<String> = Vec::new();
            for name in entry.in_names() {
                for var in self.candidates(name) {
                    if probed.contains(&var) {
                        continue;
                    }
                    if let Some(raw) = ctx.environment.var(&var) {
                        values.raw(Arc::clone(entry.property()), raw, Some(var.clone()));
                    }
                    probed.push(var);
                }
            }
        }
        values
    }

    fn specific_load_description(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("environment variables ({prefix}*)"),
            None => "environment variables".to_string(),
        }
    }

    fn reports_unknown_properties(&self) -> bool {
        false
    }
}
