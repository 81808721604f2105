//! Per-property value validators.
//!
//! Validators run after a value has been parsed and claimed. Each property runs
//! its validators in declaration order and stops at the first failure.

use crate::property::PropertyType;
use regex_lite::Regex;

/// Rule a parsed value must satisfy.
pub trait Validator<T>: Send + Sync {
    fn is_valid(&self, value: &T) -> bool;

    /// Human-readable explanation of why `value` was rejected.
    fn invalid_message(&self, value: &T) -> String;

    /// Whether the validator's own configuration is well-formed.
    fn is_specification_valid(&self) -> bool {
        true
    }

    /// Explanation used when [`is_specification_valid`](Self::is_specification_valid) is false.
    fn specification_message(&self) -> String {
        "validator is misconfigured".to_string()
    }
}

/// Ordering operator used by [`Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl Comparison {
    fn describe(self) -> &'static str {
        match self {
            Comparison::GreaterThan => "greater than",
            Comparison::GreaterThanOrEqualTo => "greater than or equal to",
            Comparison::LessThan => "less than",
            Comparison::LessThanOrEqualTo => "less than or equal to",
        }
    }
}

/// Compares a value against a fixed bound using the type's native ordering.
#[derive(Debug, Clone)]
pub struct Compare<T> {
    op: Comparison,
    bound: T,
}

impl<T: PropertyType + PartialOrd> Compare<T> {
    pub fn new(op: Comparison, bound: T) -> Self {
        Self { op, bound }
    }

    pub fn must_be_greater_than(bound: T) -> Self {
        Self::new(Comparison::GreaterThan, bound)
    }

    pub fn must_be_greater_than_or_equal_to(bound: T) -> Self {
        Self::new(Comparison::GreaterThanOrEqualTo, bound)
    }

    pub fn must_be_less_than(bound: T) -> Self {
        Self::new(Comparison::LessThan, bound)
    }

    pub fn must_be_less_than_or_equal_to(bound: T) -> Self {
        Self::new(Comparison::LessThanOrEqualTo, bound)
    }
}

impl<T: PropertyType + PartialOrd> Validator<T> for Compare<T> {
    fn is_valid(&self, value: &T) -> bool {
        match self.op {
            Comparison::GreaterThan => *value > self.bound,
            Comparison::GreaterThanOrEqualTo => *value >= self.bound,
            Comparison::LessThan => *value < self.bound,
            Comparison::LessThanOrEqualTo => *value <= self.bound,
        }
    }

    fn invalid_message(&self, value: &T) -> String {
        format!(
            "'{}' must be {} {}",
            value.to_raw(),
            self.op.describe(),
            self.bound.to_raw()
        )
    }

    fn is_specification_valid(&self) -> bool {
        // NaN bounds make every comparison false.
        self.bound.partial_cmp(&self.bound).is_some()
    }

    fn specification_message(&self) -> String {
        format!("bound '{}' is not comparable", self.bound.to_raw())
    }
}

/// Requires the whole string to match a regular expression.
#[derive(Debug, Clone)]
pub struct MatchesPattern {
    pattern: String,
    regex: Option<Regex>,
}

impl MatchesPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{pattern})$")).ok();
        Self { pattern, regex }
    }
}

impl Validator<String> for MatchesPattern {
    fn is_valid(&self, value: &String) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(value))
    }

    fn invalid_message(&self, value: &String) -> String {
        format!("'{value}' does not match the pattern '{}'", self.pattern)
    }

    fn is_specification_valid(&self) -> bool {
        self.regex.is_some()
    }

    fn specification_message(&self) -> String {
        format!("'{}' is not a valid regular expression", self.pattern)
    }
}

/// Rejects empty or whitespace-only strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBlank;

impl Validator<String> for NotBlank {
    fn is_valid(&self, value: &String) -> bool {
        !value.trim().is_empty()
    }

    fn invalid_message(&self, _value: &String) -> String {
        "value must not be blank".to_string()
    }
}

/// Requires a string prefix.
#[derive(Debug, Clone)]
pub struct StartsWith {
    prefix: String,
    ignore_case: bool,
}

impl StartsWith {
    pub fn new(prefix: impl Into<String>, ignore_case: bool) -> Self {
        Self {
            prefix: prefix.into(),
            ignore_case,
        }
    }
}

impl Validator<String> for StartsWith {
    fn is_valid(&self, value: &String) -> bool {
        if self.ignore_case {
            value.to_lowercase().starts_with(&self.prefix.to_lowercase())
        } else {
            value.starts_with(&self.prefix)
        }
    }

    fn invalid_message(&self, value: &String) -> String {
        format!("'{value}' must start with '{}'", self.prefix)
    }
}

/// Requires a string suffix.
#[derive(Debug, Clone)]
pub struct EndsWith {
    suffix: String,
    ignore_case: bool,
}

impl EndsWith {
    pub fn new(suffix: impl Into<String>, ignore_case: bool) -> Self {
        Self {
            suffix: suffix.into(),
            ignore_case,
        }
    }
}

impl Validator<String> for EndsWith {
    fn is_valid(&self, value: &String) -> bool {
        if self.ignore_case {
            value.to_lowercase().ends_with(&self.suffix.to_lowercase())
        } else {
            value.ends_with(&self.suffix)
        }
    }

    fn invalid_message(&self, value: &String) -> String {
        format!("'{value}' must end with '{}'", self.suffix)
    }
}

/// Restricts a value to an explicit set.
#[derive(Debug, Clone)]
pub struct OneOf<T> {
    allowed: Vec<T>,
}

impl<T: PropertyType + PartialEq> OneOf<T> {
    pub fn new(allowed: impl IntoIterator<Item = T>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl<T: PropertyType + PartialEq> Validator<T> for OneOf<T> {
    fn is_valid(&self, value: &T) -> bool {
        self.allowed.contains(value)
    }

    fn invalid_message(&self, value: &T) -> String {
        let allowed: Vec<String> = self.allowed.iter().map(PropertyType::to_raw).collect();
        format!("'{}' must be one of: {}", value.to_raw(), allowed.join(", "))
    }

    fn is_specification_valid(&self) -> bool {
        !self.allowed.is_empty()
    }

    fn specification_message(&self) -> String {
        "the set of allowed values is empty".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_operators_are_exact() {
        let gt = Compare::must_be_greater_than(5i64);
        let gte = Compare::must_be_greater_than_or_equal_to(5i64);
        let lt = Compare::must_be_less_than(5i64);
        let lte = Compare::must_be_less_than_or_equal_to(5i64);

        assert!(!gt.is_valid(&5));
        assert!(gt.is_valid(&6));
        assert!(gte.is_valid(&5));
        assert!(!gte.is_valid(&4));
        assert!(!lt.is_valid(&5));
        assert!(lt.is_valid(&4));
        assert!(lte.is_valid(&5));
        assert!(!lte.is_valid(&6));
    }

    #[test]
    fn test_compare_dates() {
        use chrono::NaiveDate;
        let cutoff = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let validator = Compare::must_be_greater_than(cutoff);
        assert!(validator.is_valid(&NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()));
        assert!(!validator.is_valid(&cutoff));
        assert_eq!(
            validator.invalid_message(&cutoff),
            "'2020-01-01' must be greater than 2020-01-01"
        );
    }

    #[test]
    fn test_nan_bound_is_invalid_specification() {
        assert!(!Compare::must_be_less_than(f64::NAN).is_specification_valid());
        assert!(Compare::must_be_less_than(1.5f64).is_specification_valid());
    }

    #[test]
    fn test_pattern_matches_whole_value() {
        let validator = MatchesPattern::new("[a-z]+");
        assert!(validator.is_specification_valid());
        assert!(validator.is_valid(&"abc".to_string()));
        assert!(!validator.is_valid(&"abc1".to_string()));
    }

    #[test]
    fn test_bad_pattern_is_invalid_specification() {
        let validator = MatchesPattern::new("([a-z");
        assert!(!validator.is_specification_valid());
        assert!(!validator.is_valid(&"abc".to_string()));
    }

    #[test]
    fn test_string_validators() {
        assert!(!NotBlank.is_valid(&"  ".to_string()));
        assert!(StartsWith::new("HTTP", true).is_valid(&"https://x".to_string()));
        assert!(!StartsWith::new("HTTP", false).is_valid(&"https://x".to_string()));
        assert!(EndsWith::new(".yaml", false).is_valid(&"app.yaml".to_string()));
    }

    #[test]
    fn test_one_of() {
        let validator = OneOf::new(["dev".to_string(), "prod".to_string()]);
        assert!(validator.is_valid(&"dev".to_string()));
        assert_eq!(
            validator.invalid_message(&"qa".to_string()),
            "'qa' must be one of: dev, prod"
        );
        assert!(!OneOf::<i64>::new([]).is_specification_valid());
    }
}
