//! A small, deterministic canonical encoding used anywhere the spec needs a
//! byte-identical digest across platforms and languages: the policy
//! fingerprint (§3/§9) and the channel state digest (§4.3).
//!
//! Deliberately not `serde_json`: JSON object key order and float formatting
//! are not contractually stable, and the spec requires struct keys sorted
//! lexicographically, array/set elements sorted, and integers emitted in
//! decimal with no floating point anywhere in the encoding.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// A node in the canonical encoding AST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanonicalValue {
    /// A decimal integer, emitted verbatim (no leading zeros, sign only if negative).
    Integer(i128),
    /// A UTF-8 string, emitted with a length prefix so no escaping is needed.
    Text(String),
    /// An ordered sequence. Callers sort before constructing this when the
    /// spec calls for set/array elements sorted.
    Array(Vec<CanonicalValue>),
    /// A sequence of (key, value) pairs. Must already be sorted
    /// lexicographically by key; [`object`] enforces this.
    Object(Vec<(String, CanonicalValue)>),
}

impl CanonicalValue {
    /// Build an `Object` node, sorting the given fields by key.
    pub fn object(mut fields: Vec<(&str, CanonicalValue)>) -> CanonicalValue {
        fields.sort_by(|a, b| a.0.cmp(b.0));
        CanonicalValue::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Build an `Array` node from items that implement [`Ord`], sorting them
    /// first.
    pub fn sorted_array<T, F>(mut items: Vec<T>, to_value: F) -> CanonicalValue
    where
        T: Ord,
        F: Fn(&T) -> CanonicalValue,
    {
        items.sort();
        CanonicalValue::Array(items.iter().map(to_value).collect())
    }

    /// Serialize to the canonical text form: a length-prefixed,
    /// type-tagged encoding with no ambiguity between a string that looks
    /// like a number and an actual number, and no dependence on map
    /// iteration order (the caller already sorted it).
    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        match self {
            CanonicalValue::Integer(i) => {
                let _ = write!(out, "i{i};");
            }
            CanonicalValue::Text(s) => {
                let _ = write!(out, "s{}:{};", s.len(), s);
            }
            CanonicalValue::Array(items) => {
                let _ = write!(out, "a{};", items.len());
                out.push('[');
                for item in items {
                    item.write(out);
                }
                out.push(']');
            }
            CanonicalValue::Object(fields) => {
                let _ = write!(out, "o{};", fields.len());
                out.push('{');
                for (key, value) in fields {
                    let _ = write!(out, "s{}:{};", key.len(), key);
                    value.write(out);
                }
                out.push('}');
            }
        }
    }

    /// SHA-256 of the UTF-8 canonical encoding, as specified in §3/§9.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.encode().as_bytes());
        hasher.finalize().into()
    }
}
