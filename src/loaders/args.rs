use super::fixed::split_pair;
use crate::loader::{LoadContext, Loader, LoaderValues};

/// `name=value` command line arguments taken from the environment.
///
/// Leading `-` or `--` is stripped, so `--port=80` and `port=80` are the same.
/// A bare `name` sets the property to `true`.
#[derive(Debug, Clone)]
pub struct ArgsLoader {
    report_unknown: bool,
}

impl Default for ArgsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgsLoader {
    pub fn new() -> Self {
        Self {
            report_unknown: true,
        }
    }

    pub fn report_unknown(mut self, report: bool) -> Self {
        self.report_unknown = report;
        self
    }
}

impl Loader for ArgsLoader {
    fn load(&self, ctx: &LoadContext<'_>) -> LoaderValues {
        let mut values = LoaderValues::new();
        for arg in ctx.environment.args() {
            let stripped = arg.trim_start_matches('-');
            let (name, raw) = split_pair(stripped);
            if !name.is_empty() {
                values.named(name, raw);
            }
        }
        values
    }

    fn specific_load_description(&self) -> String {
        "command line arguments".to_string()
    }

    fn reports_unknown_properties(&self) -> bool {
        self.report_unknown
    }
}
