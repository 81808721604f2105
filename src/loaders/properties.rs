use super::{FileLocation, read_source};
use crate::loader::{LoadContext, Loader, LoaderValues};
use tracing::debug;

/// A `.properties` file: `key=value`, `key: value` or `key value` per line.
#[derive(Debug, Clone)]
pub struct PropertiesFileLoader {
    location: FileLocation,
    required: bool,
}

impl PropertiesFileLoader {
    /// An optional file; a missing file loads nothing.
    pub fn new(location: impl Into<FileLocation>) -> Self {
        Self {
            location: location.into(),
            required: false,
        }
    }

    /// A missing file is reported as a loader problem.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl Loader for PropertiesFileLoader {
    fn load(&self, ctx: &LoadContext<'_>) -> LoaderValues {
        let mut values = LoaderValues::new();
        match read_source(&self.location, self.required, ctx) {
            Ok(Some((path, content))) => {
                let pairs = parse_properties(&content);
                debug!(path = %path.display(), entries = pairs.len(), "read properties file");
                for (name, raw) in pairs {
                    values.named(name, raw);
                }
            }
            Ok(None) => {}
            Err(problem) => values.problem(problem),
        }
        values
    }

    fn specific_load_description(&self) -> String {
        format!("properties file {}", self.location.describe())
    }
}

/// Parse `.properties` text into `(key, value)` pairs in file order.
///
/// Supports `#`/`!` comments, `=`/`:`/whitespace separators, backslash line
/// continuation and the `\t \n \r \f \uXXXX` escapes. Repeated keys are all
/// returned.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        pairs.push(split_entry(&logical));
    }
    pairs
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let mut key_end = line.len();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }
    (unescape(key), unescape(rest))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{0c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
                match decoded {
                    Some(ch) if hex.len() == 4 => out.push(ch),
                    // Malformed escape: keep it as written.
                    _ => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(text: &str) -> Vec<(String, String)> {
        parse_properties(text)
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_separators_and_comments() {
        let text = "# comment\n! other\n\na=1\nb : 2\nc 3\n  d=\ne\n";
        assert_eq!(
            pairs(text),
            vec![pair("a", "1"), pair("b", "2"), pair("c", "3"), pair("d", ""), pair("e", "")]
        );
    }

    #[test]
    fn test_continuation_and_escapes() {
        let text = "list=a,\\\n    b,\\\n    c\npath=C:\\\\tmp\nkey\\ with\\ space=x\nsnow=\\u2603\n";
        assert_eq!(
            pairs(text),
            vec![
                pair("list", "a,b,c"),
                pair("path", "C:\\tmp"),
                pair("key with space", "x"),
                pair("snow", "\u{2603}"),
            ]
        );
    }

    #[test]
    fn test_value_keeps_later_separators() {
        assert_eq!(pairs("url=http://host:80/a=b"), vec![pair("url", "http://host:80/a=b")]);
    }

    #[test]
    fn test_repeated_keys_are_kept() {
        assert_eq!(pairs("a=1\na=2").len(), 2);
    }
}
