//! Output formatting for problem reports, value listings and name tables.

use crate::problem::{Problem, ProblemList};
use crate::registry::PropertyRegistry;
use crate::values::ValueMap;
use serde_json::{Value, json};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "text" | "markdown" | "md" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

const CATEGORIES: [&str; 4] = ["construction", "loader", "value", "requirement"];

/// Format a problem list as markdown, grouped by category in pipeline order.
pub fn format_problems_markdown(problems: &ProblemList) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Problems ({})\n\n", problems.len()));

    for category in CATEGORIES {
        let in_category: Vec<&Problem> = problems
            .iter()
            .filter(|p| p.category() == category)
            .collect();
        if in_category.is_empty() {
            continue;
        }

        md.push_str(&format!("## {} problems\n\n", format_category_name(category)));
        for problem in in_category {
            let code = serde_json::to_value(problem.code())
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            md.push_str(&format!("- `{}` {}\n", code, problem));
        }
        md.push('\n');
    }

    md
}

/// Capitalize the first letter of a category name.
fn format_category_name(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Format effective values as markdown, in registration order.
pub fn format_values_markdown(values: &ValueMap) -> String {
    let rows = values.effective_raw_values();
    let mut md = String::new();

    md.push_str(&format!("# Values ({})\n\n", rows.len()));

    for row in rows {
        let value = row
            .value
            .as_ref()
            .map(|v| format!("`{}`", v))
            .unwrap_or_else(|| "_unset_".to_string());
        let source = match row.source {
            Some(source) => format!(" ({})", source),
            None if row.value.is_some() => " (default)".to_string(),
            None => String::new(),
        };
        md.push_str(&format!("- **{}** = {}{}\n", row.name, value, source));
    }

    md
}

/// Format every registered name as markdown, grouped by property group.
pub fn format_names_markdown(registry: &PropertyRegistry) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Properties ({})\n\n", registry.len()));

    for group in registry.groups() {
        md.push_str(&format!("## {}\n\n", group.name));
        for id in &group.members {
            let Some(entry) = registry.entry(*id) else {
                continue;
            };
            let property = entry.property();
            let required = if property.is_required() { " required" } else { "" };
            md.push_str(&format!(
                "- `{}` ({}{})\n",
                entry.canonical_name(),
                property.value_type(),
                required
            ));
            for alias in entry.aliases() {
                md.push_str(&format!(
                    "  - alias `{}` [{}]\n",
                    alias.actual,
                    direction_label(alias.direction.is_in(), alias.direction.is_out())
                ));
            }
            if let Some(description) = property.description() {
                md.push_str(&format!("  - {}\n", description));
            }
        }
        md.push('\n');
    }

    md
}

fn direction_label(is_in: bool, is_out: bool) -> &'static str {
    match (is_in, is_out) {
        (true, true) => "in/out",
        (true, false) => "in",
        _ => "out",
    }
}

/// JSON problem report: count plus each problem with its code and message.
pub fn problems_to_json(problems: &ProblemList) -> Value {
    let items: Vec<Value> = problems
        .iter()
        .map(|problem| {
            json!({
                "code": problem.code(),
                "category": problem.category(),
                "message": problem.to_string(),
                "detail": problem,
            })
        })
        .collect();
    json!({
        "ok": problems.is_empty(),
        "count": problems.len(),
        "problems": items,
    })
}

/// JSON value listing.
pub fn values_to_json(values: &ValueMap) -> Value {
    json!({
        "ok": true,
        "values": values.effective_raw_values(),
    })
}

/// JSON name table.
pub fn names_to_json(registry: &PropertyRegistry) -> Value {
    let properties: Vec<Value> = registry
        .entries()
        .map(|entry| {
            let property = entry.property();
            json!({
                "name": entry.canonical_name(),
                "group": entry.group_name(),
                "type": property.value_type(),
                "required": property.is_required(),
                "default": property.default_raw(),
                "description": property.description(),
                "aliases": entry.aliases(),
            })
        })
        .collect();
    json!({ "properties": properties })
}

/// Name table and registry problems as a single document.
pub fn names_report_json(registry: &PropertyRegistry, problems: &ProblemList) -> Value {
    let mut report = names_to_json(registry);
    let mut listed = problems_to_json(problems);
    report["ok"] = json!(problems.is_empty());
    report["problems"] = listed["problems"].take();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Resolver;
    use crate::group::PropertyGroup;
    use crate::loaders::FixedValueLoader;
    use crate::property::Property;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("md"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_problems_grouped_by_category() {
        let port = Property::<i64>::builder("PORT").build();
        let name = Property::<String>::builder("NAME").required().build();
        let resolution = Resolver::builder()
            .group(PropertyGroup::new("svc").with(&port).with(&name))
            .loader(FixedValueLoader::new("args").with_name("svc.PORT", "x"))
            .resolve();

        let md = format_problems_markdown(resolution.problems());
        assert!(md.starts_with("# Problems (2)"), "{md}");
        assert!(md.contains("## Loader problems"));
        assert!(md.contains("`PARSE_FAILURE`"));
        assert!(md.contains("## Requirement problems"));
        assert!(!md.contains("## Construction problems"));

        let json = problems_to_json(resolution.problems());
        assert_eq!(json["count"], 2);
        assert_eq!(json["problems"][1]["code"], "REQUIRED_PROPERTY");
    }

    #[test]
    fn test_values_listing_marks_defaults() {
        let host = Property::<String>::builder("HOST").default_value("localhost".into()).build();
        let port = Property::<i64>::builder("PORT").build();
        let user = Property::<String>::builder("USER").build();
        let values = Resolver::builder()
            .group(PropertyGroup::new("db").with(&host).with(&port).with(&user))
            .loader(FixedValueLoader::new("args").with_name("db.port", "5432"))
            .resolve()
            .into_result()
            .unwrap();

        let md = format_values_markdown(&values);
        assert!(md.contains("- **db.HOST** = `localhost` (default)"), "{md}");
        assert!(md.contains("- **db.PORT** = `5432` (loader #1 (args))"), "{md}");
        assert!(md.contains("- **db.USER** = _unset_"), "{md}");

        let json = values_to_json(&values);
        assert_eq!(json["values"][1]["value"], "5432");
    }

    #[test]
    fn test_names_report_is_one_document() {
        let a = Property::<String>::builder("A").in_alias("Foo").build();
        let b = Property::<String>::builder("B").in_alias("Foo").build();
        let (registry, construction) = crate::registry::RegistryBuilder::new()
            .group(PropertyGroup::new("first").with(&a))
            .group(PropertyGroup::new("second").with(&b))
            .build();
        let mut problems: ProblemList = ProblemList::new();
        problems.add_all(construction);

        let report = names_report_json(&registry, &problems);
        assert_eq!(report["ok"], false);
        assert_eq!(report["properties"].as_array().map(Vec::len), Some(2));
        assert_eq!(report["problems"].as_array().map(Vec::len), Some(1));
        assert_eq!(report["problems"][0]["code"], json!(crate::error::ProblemCode::NonUniqueNames));
    }
}
