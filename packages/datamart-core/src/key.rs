//! Record identity: simple and composite keys.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One identity field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Int(i64),
    Text(String),
}

impl KeyPart {
    /// Empty text and zero integers never identify a stored record.
    pub fn is_blank(&self) -> bool {
        match self {
            KeyPart::Int(v) => *v == 0,
            KeyPart::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeyPart::Int(v) => Some(*v),
            KeyPart::Text(s) => s.parse().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Reads a key part out of a JSON field value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(KeyPart::Int),
            Value::String(s) => Some(KeyPart::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            KeyPart::Int(v) => Value::from(*v),
            KeyPart::Text(s) => Value::from(s.clone()),
        }
    }

    /// Parses user or path input, preferring integers.
    ///
    /// Only canonical integer text becomes `Int`; `"007"` or `"+5"` stay
    /// text so they render back unchanged.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => KeyPart::Int(n),
            _ => KeyPart::Text(raw.to_string()),
        }
    }

    fn path_segment(&self) -> String {
        utf8_percent_encode(&self.to_string(), SEGMENT).to_string()
    }
}

impl std::fmt::Display for KeyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{}", v),
            KeyPart::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for KeyPart {
    fn from(v: i64) -> Self {
        KeyPart::Int(v)
    }
}

impl From<i32> for KeyPart {
    fn from(v: i32) -> Self {
        KeyPart::Int(i64::from(v))
    }
}

impl From<&str> for KeyPart {
    fn from(v: &str) -> Self {
        KeyPart::Text(v.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(v: String) -> Self {
        KeyPart::Text(v)
    }
}

/// Identity of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Simple(KeyPart),
    Composite(KeyPart, KeyPart),
}

impl RecordKey {
    pub fn simple(part: impl Into<KeyPart>) -> Self {
        RecordKey::Simple(part.into())
    }

    pub fn composite(first: impl Into<KeyPart>, second: impl Into<KeyPart>) -> Self {
        RecordKey::Composite(first.into(), second.into())
    }

    pub fn parts(&self) -> Vec<&KeyPart> {
        match self {
            RecordKey::Simple(p) => vec![p],
            RecordKey::Composite(a, b) => vec![a, b],
        }
    }

    /// True when any part is blank.
    pub fn is_blank(&self) -> bool {
        self.parts().iter().any(|p| p.is_blank())
    }

    /// Percent-encoded path suffix, e.g. `/5` or `/CUST1/USERA`.
    pub fn path(&self) -> String {
        self.parts()
            .iter()
            .map(|p| format!("/{}", p.path_segment()))
            .collect()
    }

    /// Builds a key from already separated raw path segments.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        let decode = |s: &S| KeyPart::parse(&percent_decode_str(s.as_ref()).decode_utf8_lossy());
        match segments {
            [one] => Some(RecordKey::Simple(decode(one))),
            [first, second] => Some(RecordKey::Composite(decode(first), decode(second))),
            _ => None,
        }
    }

    /// Compares by rendered text so `5` and `"5"` identify the same record.
    pub fn matches(&self, other: &RecordKey) -> bool {
        let mine = self.parts();
        let theirs = other.parts();
        mine.len() == theirs.len()
            && mine
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| a.to_string() == b.to_string())
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Simple(p) => write!(f, "{}", p),
            RecordKey::Composite(a, b) => write!(f, "({}, {})", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_path_is_encoded() {
        let key = RecordKey::composite("CUST 1", "a/b");
        assert_eq!(key.path(), "/CUST%201/a%2Fb");
        assert_eq!(key.to_string(), "(CUST 1, a/b)");
    }

    #[test]
    fn segments_round_trip_through_path() {
        let key = RecordKey::composite(7, "FMT%");
        let path = key.path();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let parsed = RecordKey::from_segments(&segments).unwrap();
        assert!(parsed.matches(&key));
    }

    #[test]
    fn blank_detection() {
        assert!(RecordKey::simple("").is_blank());
        assert!(RecordKey::simple(0).is_blank());
        assert!(RecordKey::composite(3, " ").is_blank());
        assert!(!RecordKey::composite(3, "USERA").is_blank());
    }

    #[test]
    fn non_canonical_digits_stay_text() {
        assert_eq!(KeyPart::parse("42"), KeyPart::Int(42));
        assert_eq!(KeyPart::parse("-3"), KeyPart::Int(-3));
        assert_eq!(KeyPart::parse("007"), KeyPart::Text("007".to_string()));
        assert_eq!(KeyPart::parse("+5"), KeyPart::Text("+5".to_string()));

        let key = RecordKey::from_segments(&["007"]).unwrap();
        assert_eq!(key.to_string(), "007");
        assert_eq!(key.path(), "/007");
    }

    #[test]
    fn numeric_text_matches_int() {
        assert!(RecordKey::simple("5").matches(&RecordKey::simple(5)));
        assert!(!RecordKey::simple(5).matches(&RecordKey::composite(5, 1)));
    }
}
