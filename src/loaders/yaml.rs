use super::{FileLocation, read_source};
use crate::loader::{LoadContext, Loader, LoaderValues};
use crate::problem::LoaderProblemKind;
use serde_yaml::Value;
use tracing::debug;

/// A YAML document whose nested mappings name properties by dotted path.
///
/// ```yaml
/// org:
///   app:
///     port: 8080        # org.app.port=8080
/// tags: [a, b]          # tags=a,b
/// ```
#[derive(Debug, Clone)]
pub struct YamlFileLoader {
    location: FileLocation,
    required: bool,
}

impl YamlFileLoader {
    /// An optional file; a missing file loads nothing.
    pub fn new(location: impl Into<FileLocation>) -> Self {
        Self {
            location: location.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl Loader for YamlFileLoader {
    fn load(&self, ctx: &LoadContext<'_>) -> LoaderValues {
        let mut values = LoaderValues::new();
        let (path, content) = match read_source(&self.location, self.required, ctx) {
            Ok(Some(found)) => found,
            Ok(None) => return values,
            Err(problem) => {
                values.problem(problem);
                return values;
            }
        };

        let location = path.display().to_string();
        if content.trim().is_empty() {
            debug!(path = %location, "yaml file is empty");
            return values;
        }
        let document = match serde_yaml::from_str::<Value>(&content) {
            Ok(document) => document,
            Err(e) => {
                values.problem(LoaderProblemKind::source_error(location, e));
                return values;
            }
        };

        match flatten_yaml(&document) {
            Ok(pairs) => {
                debug!(path = %location, entries = pairs.len(), "read yaml file");
                for (name, raw) in pairs {
                    values.named(name, raw);
                }
            }
            Err(message) => values.problem(LoaderProblemKind::source_error(location, message)),
        }
        values
    }

    fn specific_load_description(&self) -> String {
        format!("yaml file {}", self.location.describe())
    }
}

/// Flatten a YAML document into dotted `(name, raw)` pairs.
///
/// Pairs follow document order. Scalars render as their plain text, sequences
/// of scalars are joined with `,` and nulls are skipped. An empty document
/// yields nothing.
pub fn flatten_yaml(document: &Value) -> Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    match document {
        Value::Null => {}
        Value::Mapping(_) => flatten_into("", document, &mut pairs)?,
        Value::Tagged(tagged) => return flatten_yaml(&tagged.value),
        _ => return Err("top level of the document must be a mapping".to_string()),
    }
    Ok(pairs)
}

fn flatten_into(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) -> Result<(), String> {
    match value {
        Value::Null => {}
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = scalar_text(key).ok_or_else(|| format!("'{prefix}' has a non-scalar key"))?;
                let name = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&name, child, pairs)?;
            }
        }
        Value::Tagged(tagged) => flatten_into(prefix, &tagged.value, pairs)?,
        Value::Sequence(items) => {
            let rendered = items
                .iter()
                .map(|item| scalar_text(item).ok_or_else(|| format!("'{prefix}' holds a nested collection")))
                .collect::<Result<Vec<_>, _>>()?;
            pairs.push((prefix.to_string(), rendered.join(",")));
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                pairs.push((prefix.to_string(), text));
            }
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}
