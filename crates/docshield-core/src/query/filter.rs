//! Filter evaluation against stored document fields.

use docshield_proto::{FilterExpr, SimpleFilter, Value};

/// Evaluates filter expressions against a row of stored fields.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a filter expression against a row of field values.
    ///
    /// Returns `true` if the row matches the filter.
    pub fn evaluate(filter: &FilterExpr, row: &[(String, Value)]) -> bool {
        match filter {
            FilterExpr::And(filters) => filters.iter().all(|f| Self::eval(row, f)),
            FilterExpr::Or(filters) => filters.iter().any(|f| Self::eval(row, f)),
            other => match Self::as_simple(other) {
                Some(simple) => Self::eval(row, &simple),
                None => false,
            },
        }
    }

    /// Evaluate a simple (non-compound) filter.
    pub fn eval(row: &[(String, Value)], filter: &SimpleFilter) -> bool {
        match filter {
            SimpleFilter::Eq { field, value } => {
                Self::compare_field(row, field, value, Self::values_equal)
            }
            SimpleFilter::Ne { field, value } => {
                Self::compare_field(row, field, value, |a, b| !Self::values_equal(a, b))
            }
            SimpleFilter::Lt { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(|ord| ord.is_lt())
            }),
            SimpleFilter::Le { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(|ord| ord.is_le())
            }),
            SimpleFilter::Gt { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(|ord| ord.is_gt())
            }),
            SimpleFilter::Ge { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).is_some_and(|ord| ord.is_ge())
            }),
            SimpleFilter::In { field, values } => match Self::get_field_value(row, field) {
                Some(fv) => values.iter().any(|v| Self::values_equal(fv, v)),
                None => false,
            },
            SimpleFilter::NotIn { field, values } => match Self::get_field_value(row, field) {
                Some(fv) => !values.iter().any(|v| Self::values_equal(fv, v)),
                None => true, // NULL is not in any set
            },
            SimpleFilter::IsNull { field } => {
                matches!(Self::get_field_value(row, field), None | Some(Value::Null))
            }
            SimpleFilter::IsNotNull { field } => {
                !matches!(Self::get_field_value(row, field), None | Some(Value::Null))
            }
            SimpleFilter::Like { field, pattern } => match Self::get_field_value(row, field) {
                Some(Value::String(s)) => Self::like_match(s, pattern),
                _ => false,
            },
            SimpleFilter::NotLike { field, pattern } => match Self::get_field_value(row, field) {
                Some(Value::String(s)) => !Self::like_match(s, pattern),
                _ => true,
            },
        }
    }

    /// Convert a non-compound expression into its [`SimpleFilter`] form.
    pub fn as_simple(filter: &FilterExpr) -> Option<SimpleFilter> {
        Some(match filter.clone() {
            FilterExpr::Eq { field, value } => SimpleFilter::Eq { field, value },
            FilterExpr::Ne { field, value } => SimpleFilter::Ne { field, value },
            FilterExpr::Lt { field, value } => SimpleFilter::Lt { field, value },
            FilterExpr::Le { field, value } => SimpleFilter::Le { field, value },
            FilterExpr::Gt { field, value } => SimpleFilter::Gt { field, value },
            FilterExpr::Ge { field, value } => SimpleFilter::Ge { field, value },
            FilterExpr::In { field, values } => SimpleFilter::In { field, values },
            FilterExpr::NotIn { field, values } => SimpleFilter::NotIn { field, values },
            FilterExpr::IsNull { field } => SimpleFilter::IsNull { field },
            FilterExpr::IsNotNull { field } => SimpleFilter::IsNotNull { field },
            FilterExpr::Like { field, pattern } => SimpleFilter::Like { field, pattern },
            FilterExpr::NotLike { field, pattern } => SimpleFilter::NotLike { field, pattern },
            FilterExpr::And(_) | FilterExpr::Or(_) => return None,
        })
    }

    /// Get a field value from a row by name.
    fn get_field_value<'a>(row: &'a [(String, Value)], field: &str) -> Option<&'a Value> {
        row.iter().find(|(name, _)| name == field).map(|(_, v)| v)
    }

    /// Compare a field value with a comparator function.
    fn compare_field<F>(row: &[(String, Value)], field: &str, value: &Value, comparator: F) -> bool
    where
        F: FnOnce(&Value, &Value) -> bool,
    {
        match Self::get_field_value(row, field) {
            Some(fv) => comparator(fv, value),
            None => false, // Missing field doesn't match
        }
    }

    /// Check if two values are equal.
    ///
    /// A multi-valued field equals a scalar string when any element does.
    fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Int64(a), Value::Float64(b)) => (*a as f64) == *b,
            (Value::Float64(a), Value::Int64(b)) => *a == (*b as f64),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::StringArray(values), Value::String(b)) => values.iter().any(|v| v == b),
            (Value::StringArray(a), Value::StringArray(b)) => a == b,
            _ => false,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
        match (a, b) {
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (Value::Int64(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
            (Value::Float64(a), Value::Int64(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None, // Incompatible types
        }
    }

    /// Match a string against a SQL LIKE pattern.
    ///
    /// Supports:
    /// - `%` matches zero or more characters
    /// - `_` matches exactly one character
    /// - `\\%` matches literal `%`
    /// - `\\_` matches literal `_`
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let Some(tokens) = Self::like_tokens(pattern) else {
            return false;
        };
        let value: Vec<char> = value.chars().collect();

        // Greedy scan, backtracking only to the most recent `%`.
        let (mut v, mut p) = (0, 0);
        let mut resume: Option<(usize, usize)> = None;
        while v < value.len() {
            match tokens.get(p) {
                Some(LikeToken::Any) => {
                    resume = Some((p, v));
                    p += 1;
                }
                Some(LikeToken::One) => {
                    v += 1;
                    p += 1;
                }
                Some(LikeToken::Char(c)) if *c == value[v] => {
                    v += 1;
                    p += 1;
                }
                _ => match resume {
                    Some((star, from)) => {
                        p = star + 1;
                        v = from + 1;
                        resume = Some((star, from + 1));
                    }
                    None => return false,
                },
            }
        }
        tokens[p..].iter().all(|t| *t == LikeToken::Any)
    }

    /// Split a pattern into tokens. A trailing lone escape matches nothing.
    fn like_tokens(pattern: &str) -> Option<Vec<LikeToken>> {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            tokens.push(match c {
                '%' => LikeToken::Any,
                '_' => LikeToken::One,
                '\\' => LikeToken::Char(chars.next()?),
                c => LikeToken::Char(c),
            });
        }
        Some(tokens)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Any,
    One,
    Char(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(fields: Vec<(&str, Value)>) -> Vec<(String, Value)> {
        fields.into_iter().map(|(n, v)| (n.to_string(), v)).collect()
    }

    #[test]
    fn test_eq_filter() {
        let row = make_row(vec![
            ("name", Value::String("Alice".into())),
            ("age", Value::Int64(30)),
        ]);

        assert!(FilterEvaluator::evaluate(&FilterExpr::eq("name", "Alice"), &row));
        assert!(!FilterEvaluator::evaluate(&FilterExpr::eq("name", "Bob"), &row));
        assert!(FilterEvaluator::evaluate(&FilterExpr::eq("age", 30i64), &row));
        assert!(FilterEvaluator::evaluate(&FilterExpr::eq("age", 30.0), &row));
    }

    #[test]
    fn test_missing_field_semantics() {
        let row = make_row(vec![("name", "Alice".into())]);

        assert!(!FilterEvaluator::evaluate(&FilterExpr::eq("title", "x"), &row));
        assert!(!FilterEvaluator::evaluate(&FilterExpr::ne("title", "x"), &row));
        assert!(FilterEvaluator::evaluate(&FilterExpr::is_null("title"), &row));
        assert!(FilterEvaluator::evaluate(
            &FilterExpr::NotIn {
                field: "title".into(),
                values: vec!["x".into()]
            },
            &row
        ));
    }

    #[test]
    fn test_comparison_filters() {
        let row = make_row(vec![("score", Value::Int64(75))]);

        assert!(FilterEvaluator::evaluate(&FilterExpr::lt("score", 80i64), &row));
        assert!(!FilterEvaluator::evaluate(&FilterExpr::lt("score", 75i64), &row));
        assert!(FilterEvaluator::evaluate(&FilterExpr::ge("score", 75i64), &row));
        assert!(!FilterEvaluator::evaluate(&FilterExpr::lt("score", "80"), &row));
    }

    #[test]
    fn test_compound_filters() {
        let row = make_row(vec![("title", "b1".into()), ("owner", "x".into())]);

        let or = FilterExpr::or(vec![SimpleFilter::eq("title", "b1"), SimpleFilter::eq("title", "c2")]);
        assert!(FilterEvaluator::evaluate(&or, &row));

        let and = FilterExpr::and(vec![SimpleFilter::eq("title", "b1"), SimpleFilter::eq("owner", "y")]);
        assert!(!FilterEvaluator::evaluate(&and, &row));

        assert!(!FilterEvaluator::evaluate(&FilterExpr::or(vec![]), &row));
        assert!(FilterEvaluator::evaluate(&FilterExpr::and(vec![]), &row));
    }

    #[test]
    fn test_multi_valued_eq() {
        let row = make_row(vec![("tags", Value::StringArray(vec!["x".into(), "y".into()]))]);
        assert!(FilterEvaluator::evaluate(&FilterExpr::eq("tags", "y"), &row));
        assert!(!FilterEvaluator::evaluate(&FilterExpr::eq("tags", "z"), &row));
    }

    #[test]
    fn test_like_match() {
        assert!(FilterEvaluator::like_match("hello", "h%"));
        assert!(FilterEvaluator::like_match("hello", "%llo"));
        assert!(FilterEvaluator::like_match("hello", "h_llo"));
        assert!(FilterEvaluator::like_match("50%", "50\\%"));
        assert!(!FilterEvaluator::like_match("hello", "h_lo"));
        assert!(!FilterEvaluator::like_match("500", "50\\%"));
        assert!(FilterEvaluator::like_match("", "%"));
        assert!(FilterEvaluator::like_match("abcbd", "%b%d"));
        assert!(!FilterEvaluator::like_match("abc", "abc\\"));
    }

    #[test]
    fn test_like_many_wildcards_long_value() {
        let value = "a".repeat(20_000);
        assert!(!FilterEvaluator::like_match(&value, "%a%a%a%a%a%a%a%a%b"));
        assert!(FilterEvaluator::like_match(&value, "%a%a%a%a%a%a%a%a%"));
        assert!(FilterEvaluator::like_match(&value, "a%_a"));
    }
}
