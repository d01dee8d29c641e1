//! Comparison operators and their evaluation.

use dynarec_codec::NativeValue;
use std::cmp::Ordering;
use std::fmt;

/// How many comparison values an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No values (`NULL`, `NOT_NULL`).
    Nullary,
    /// Exactly one value.
    Unary,
    /// Exactly two values (`BETWEEN`).
    Binary,
    /// One or more values (`IN`).
    Variadic,
}

impl Arity {
    /// Returns true if `count` values satisfy this arity.
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Nullary => count == 0,
            Arity::Unary => count == 1,
            Arity::Binary => count == 2,
            Arity::Variadic => count >= 1,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arity::Nullary => "no values",
            Arity::Unary => "exactly 1 value",
            Arity::Binary => "exactly 2 values",
            Arity::Variadic => "at least 1 value",
        })
    }
}

/// Native comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than or equal.
    Le,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Greater than.
    Gt,
    /// Attribute exists.
    NotNull,
    /// Attribute does not exist.
    Null,
    /// Substring, subsequence or set membership.
    Contains,
    /// Negation of `Contains`.
    NotContains,
    /// String or binary prefix.
    BeginsWith,
    /// Equal to any of the values.
    In,
    /// Inclusive range.
    Between,
}

impl ComparisonOperator {
    /// Every operator, in wire-documentation order.
    pub const ALL: [ComparisonOperator; 13] = [
        ComparisonOperator::Eq,
        ComparisonOperator::Ne,
        ComparisonOperator::Le,
        ComparisonOperator::Lt,
        ComparisonOperator::Ge,
        ComparisonOperator::Gt,
        ComparisonOperator::NotNull,
        ComparisonOperator::Null,
        ComparisonOperator::Contains,
        ComparisonOperator::NotContains,
        ComparisonOperator::BeginsWith,
        ComparisonOperator::In,
        ComparisonOperator::Between,
    ];

    /// Returns the wire name (`"EQ"`, `"BEGINS_WITH"`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "EQ",
            ComparisonOperator::Ne => "NE",
            ComparisonOperator::Le => "LE",
            ComparisonOperator::Lt => "LT",
            ComparisonOperator::Ge => "GE",
            ComparisonOperator::Gt => "GT",
            ComparisonOperator::NotNull => "NOT_NULL",
            ComparisonOperator::Null => "NULL",
            ComparisonOperator::Contains => "CONTAINS",
            ComparisonOperator::NotContains => "NOT_CONTAINS",
            ComparisonOperator::BeginsWith => "BEGINS_WITH",
            ComparisonOperator::In => "IN",
            ComparisonOperator::Between => "BETWEEN",
        }
    }

    /// Parses an operator name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns the number of comparison values this operator takes.
    pub const fn arity(self) -> Arity {
        match self {
            ComparisonOperator::NotNull | ComparisonOperator::Null => Arity::Nullary,
            ComparisonOperator::Between => Arity::Binary,
            ComparisonOperator::In => Arity::Variadic,
            _ => Arity::Unary,
        }
    }

    /// Returns true if the operator may appear on a range key in a key
    /// condition.
    pub const fn allowed_on_range_key(self) -> bool {
        matches!(
            self,
            ComparisonOperator::Eq
                | ComparisonOperator::Le
                | ComparisonOperator::Lt
                | ComparisonOperator::Ge
                | ComparisonOperator::Gt
                | ComparisonOperator::BeginsWith
                | ComparisonOperator::Between
        )
    }

    /// Evaluates the operator against an attribute (absent = `None`).
    pub fn evaluate(self, attribute: Option<&NativeValue>, values: &[NativeValue]) -> bool {
        let Some(attr) = attribute else {
            return matches!(self, ComparisonOperator::Null | ComparisonOperator::Ne);
        };
        let first = values.first();
        match self {
            ComparisonOperator::Null => false,
            ComparisonOperator::NotNull => true,
            ComparisonOperator::Eq => first.is_some_and(|v| native_eq(attr, v)),
            ComparisonOperator::Ne => first.is_some_and(|v| !native_eq(attr, v)),
            ComparisonOperator::Le => compares(attr, first, |o| o != Ordering::Greater),
            ComparisonOperator::Lt => compares(attr, first, |o| o == Ordering::Less),
            ComparisonOperator::Ge => compares(attr, first, |o| o != Ordering::Less),
            ComparisonOperator::Gt => compares(attr, first, |o| o == Ordering::Greater),
            ComparisonOperator::Contains => first.is_some_and(|v| contains(attr, v)),
            ComparisonOperator::NotContains => first.is_some_and(|v| !contains(attr, v)),
            ComparisonOperator::BeginsWith => first.is_some_and(|v| begins_with(attr, v)),
            ComparisonOperator::In => values.iter().any(|v| native_eq(attr, v)),
            ComparisonOperator::Between => match values {
                [low, high] => {
                    compares(attr, Some(low), |o| o != Ordering::Less)
                        && compares(attr, Some(high), |o| o != Ordering::Greater)
                }
                _ => false,
            },
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compares(attr: &NativeValue, value: Option<&NativeValue>, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|v| attr.cmp_scalar(v))
        .is_some_and(accept)
}

fn native_eq(a: &NativeValue, b: &NativeValue) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    if !a.kind().is_set() {
        return a.cmp_scalar(b) == Some(Ordering::Equal);
    }
    let left = a.elements();
    let right = b.elements();
    left.len() == right.len()
        && left
            .iter()
            .all(|x| right.iter().any(|y| x.cmp_scalar(y) == Some(Ordering::Equal)))
}

fn contains(attr: &NativeValue, value: &NativeValue) -> bool {
    match (attr, value) {
        (NativeValue::S(haystack), NativeValue::S(needle)) => haystack.contains(needle.as_str()),
        (NativeValue::B(haystack), NativeValue::B(needle)) => {
            needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle.as_slice())
        }
        (set, member) if set.kind().is_set() => set
            .elements()
            .iter()
            .any(|e| e.cmp_scalar(member) == Some(Ordering::Equal)),
        _ => false,
    }
}

fn begins_with(attr: &NativeValue, value: &NativeValue) -> bool {
    match (attr, value) {
        (NativeValue::S(s), NativeValue::S(prefix)) => s.starts_with(prefix.as_str()),
        (NativeValue::B(b), NativeValue::B(prefix)) => b.starts_with(prefix),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> NativeValue {
        NativeValue::S(v.into())
    }

    fn n(v: i64) -> NativeValue {
        NativeValue::integer(v)
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ComparisonOperator::parse("eq"), Some(ComparisonOperator::Eq));
        assert_eq!(
            ComparisonOperator::parse("Begins_With"),
            Some(ComparisonOperator::BeginsWith)
        );
        assert_eq!(ComparisonOperator::parse("like"), None);
        for op in ComparisonOperator::ALL {
            assert_eq!(ComparisonOperator::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn arity_rules() {
        assert_eq!(ComparisonOperator::Between.arity(), Arity::Binary);
        assert_eq!(ComparisonOperator::In.arity(), Arity::Variadic);
        assert_eq!(ComparisonOperator::Null.arity(), Arity::Nullary);
        assert_eq!(ComparisonOperator::Ge.arity(), Arity::Unary);
        assert!(Arity::Binary.accepts(2));
        assert!(!Arity::Binary.accepts(1));
        assert!(!Arity::Variadic.accepts(0));
        assert!(Arity::Variadic.accepts(5));
    }

    #[test]
    fn numeric_comparisons() {
        let age = n(30);
        assert!(ComparisonOperator::Gt.evaluate(Some(&age), &[n(9)]));
        assert!(ComparisonOperator::Le.evaluate(Some(&age), &[n(30)]));
        assert!(!ComparisonOperator::Lt.evaluate(Some(&age), &[n(30)]));
        assert!(ComparisonOperator::Between.evaluate(Some(&age), &[n(1), n(30)]));
        assert!(!ComparisonOperator::Between.evaluate(Some(&age), &[n(31), n(40)]));
        assert!(ComparisonOperator::In.evaluate(Some(&age), &[n(1), n(30)]));
    }

    #[test]
    fn missing_attributes() {
        assert!(ComparisonOperator::Null.evaluate(None, &[]));
        assert!(!ComparisonOperator::NotNull.evaluate(None, &[]));
        assert!(!ComparisonOperator::Eq.evaluate(None, &[s("x")]));
        assert!(ComparisonOperator::Ne.evaluate(None, &[s("x")]));
        assert!(ComparisonOperator::NotNull.evaluate(Some(&s("x")), &[]));
    }

    #[test]
    fn string_operators() {
        let email = s("foo@bar.com");
        assert!(ComparisonOperator::BeginsWith.evaluate(Some(&email), &[s("foo")]));
        assert!(ComparisonOperator::Contains.evaluate(Some(&email), &[s("@bar")]));
        assert!(ComparisonOperator::NotContains.evaluate(Some(&email), &[s("baz")]));
        assert!(!ComparisonOperator::Eq.evaluate(Some(&email), &[n(1)]));
    }

    #[test]
    fn set_membership_and_equality() {
        let tags = NativeValue::Ss(vec!["a".into(), "b".into()]);
        assert!(ComparisonOperator::Contains.evaluate(Some(&tags), &[s("b")]));
        assert!(!ComparisonOperator::Contains.evaluate(Some(&tags), &[s("c")]));
        let reordered = NativeValue::Ss(vec!["b".into(), "a".into()]);
        assert!(ComparisonOperator::Eq.evaluate(Some(&tags), &[reordered]));
    }
}
