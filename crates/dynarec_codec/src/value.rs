//! Tagged native values.

use crate::error::CodecResult;
use crate::number::Number;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Storage-level kind of an attribute.
///
/// The three scalar kinds are string, number and binary; each has a
/// homogeneous set counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeKind {
    /// String.
    #[serde(rename = "S")]
    S,
    /// Number (decimal text).
    #[serde(rename = "N")]
    N,
    /// Binary.
    #[serde(rename = "B")]
    B,
    /// String set.
    #[serde(rename = "SS")]
    Ss,
    /// Number set.
    #[serde(rename = "NS")]
    Ns,
    /// Binary set.
    #[serde(rename = "BS")]
    Bs,
}

impl NativeKind {
    /// Returns the lowercase wire tag (`"s"`, `"ns"`, ...).
    pub const fn tag(self) -> &'static str {
        match self {
            NativeKind::S => "s",
            NativeKind::N => "n",
            NativeKind::B => "b",
            NativeKind::Ss => "ss",
            NativeKind::Ns => "ns",
            NativeKind::Bs => "bs",
        }
    }

    /// Returns true for the set kinds.
    ///
    /// A set tag is the scalar tag with a trailing `s`, which is why the
    /// tag length alone tells scalars from sets.
    pub const fn is_set(self) -> bool {
        self.tag().len() > 1
    }

    /// Returns the element kind of a set kind (scalars map to themselves).
    pub const fn element(self) -> Self {
        match self {
            NativeKind::S | NativeKind::Ss => NativeKind::S,
            NativeKind::N | NativeKind::Ns => NativeKind::N,
            NativeKind::B | NativeKind::Bs => NativeKind::B,
        }
    }

    /// Returns the set kind whose elements are of this kind.
    pub const fn set_of(self) -> Self {
        match self {
            NativeKind::S | NativeKind::Ss => NativeKind::Ss,
            NativeKind::N | NativeKind::Ns => NativeKind::Ns,
            NativeKind::B | NativeKind::Bs => NativeKind::Bs,
        }
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A tagged native attribute value.
///
/// Serializes in the externally-tagged form used on the wire, e.g.
/// `{"S": "abc"}` or `{"NS": ["1", "2"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeValue {
    /// String.
    #[serde(rename = "S")]
    S(String),
    /// Number, as decimal text.
    #[serde(rename = "N")]
    N(String),
    /// Binary.
    #[serde(rename = "B")]
    B(Vec<u8>),
    /// String set.
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    /// Number set.
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    /// Binary set.
    #[serde(rename = "BS")]
    Bs(Vec<Vec<u8>>),
}

impl NativeValue {
    /// Returns the kind tag of this value.
    pub const fn kind(&self) -> NativeKind {
        match self {
            NativeValue::S(_) => NativeKind::S,
            NativeValue::N(_) => NativeKind::N,
            NativeValue::B(_) => NativeKind::B,
            NativeValue::Ss(_) => NativeKind::Ss,
            NativeValue::Ns(_) => NativeKind::Ns,
            NativeValue::Bs(_) => NativeKind::Bs,
        }
    }

    /// Builds a number value from an integer.
    pub fn integer(n: i64) -> Self {
        NativeValue::N(crate::number::format_integer(n))
    }

    /// Returns the string payload of an `S` value.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            NativeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// Parses the payload of an `N` value.
    pub fn as_number(&self) -> Option<CodecResult<Number>> {
        match self {
            NativeValue::N(text) => Some(Number::parse(text)),
            _ => None,
        }
    }

    /// Returns the payload of a `B` value.
    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            NativeValue::B(b) => Some(b),
            _ => None,
        }
    }

    /// Splits the value into scalar elements.
    ///
    /// A scalar yields itself; a set yields one scalar per member.
    pub fn elements(&self) -> Vec<NativeValue> {
        match self {
            NativeValue::Ss(v) => v.iter().cloned().map(NativeValue::S).collect(),
            NativeValue::Ns(v) => v.iter().cloned().map(NativeValue::N).collect(),
            NativeValue::Bs(v) => v.iter().cloned().map(NativeValue::B).collect(),
            scalar => vec![scalar.clone()],
        }
    }

    /// Orders two scalars of the same kind.
    ///
    /// Numbers compare numerically, strings and binaries bytewise. Returns
    /// `None` for mismatched kinds, sets, or unparsable numbers.
    pub fn cmp_scalar(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (NativeValue::S(a), NativeValue::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (NativeValue::B(a), NativeValue::B(b)) => Some(a.cmp(b)),
            (NativeValue::N(a), NativeValue::N(b)) => {
                let a = Number::parse(a).ok()?;
                let b = Number::parse(b).ok()?;
                Some(a.cmp_numeric(&b))
            }
            _ => None,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::S(s) | NativeValue::N(s) => write!(f, "{{{}: {s}}}", self.kind()),
            NativeValue::B(b) => write!(f, "{{b: <{} bytes>}}", b.len()),
            NativeValue::Ss(v) | NativeValue::Ns(v) => {
                write!(f, "{{{}: [{}]}}", self.kind(), v.join(", "))
            }
            NativeValue::Bs(v) => write!(f, "{{bs: <{} members>}}", v.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_length_marks_sets() {
        assert!(!NativeKind::S.is_set());
        assert!(!NativeKind::N.is_set());
        assert!(NativeKind::Ss.is_set());
        assert!(NativeKind::Bs.is_set());
        assert_eq!(NativeKind::Ns.element(), NativeKind::N);
        assert_eq!(NativeKind::B.set_of(), NativeKind::Bs);
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(NativeValue::S("x".into()).kind(), NativeKind::S);
        assert_eq!(NativeValue::integer(3).kind(), NativeKind::N);
        assert_eq!(NativeValue::Bs(vec![]).kind(), NativeKind::Bs);
    }

    #[test]
    fn numbers_compare_numerically() {
        let nine = NativeValue::N("9".into());
        let ten = NativeValue::N("10".into());
        assert_eq!(nine.cmp_scalar(&ten), Some(Ordering::Less));
        // Bytewise comparison would say "9" > "10".
        assert_eq!(
            NativeValue::S("9".into()).cmp_scalar(&NativeValue::S("10".into())),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn mismatched_kinds_do_not_compare() {
        let s = NativeValue::S("1".into());
        let n = NativeValue::N("1".into());
        assert_eq!(s.cmp_scalar(&n), None);
        assert_eq!(NativeValue::Ss(vec![]).cmp_scalar(&NativeValue::Ss(vec![])), None);
    }

    #[test]
    fn elements_of_set() {
        let set = NativeValue::Ns(vec!["1".into(), "2".into()]);
        assert_eq!(
            set.elements(),
            vec![NativeValue::N("1".into()), NativeValue::N("2".into())]
        );
        let scalar = NativeValue::S("a".into());
        assert_eq!(scalar.elements(), vec![scalar.clone()]);
    }

    #[test]
    fn display_uses_lowercase_tags() {
        assert_eq!(NativeValue::N("5".into()).to_string(), "{n: 5}");
        assert_eq!(
            NativeValue::Ss(vec!["a".into(), "b".into()]).to_string(),
            "{ss: [a, b]}"
        );
    }
}
