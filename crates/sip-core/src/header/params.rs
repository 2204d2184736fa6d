use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered header parameters (`;lr;branch=z9hG4bK776`).
///
/// Names are stored lowercased. A flag parameter such as `lr` has no value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params(Vec<(String, Option<String>)>);

impl Params {
    pub fn new() -> Self {
        Params(Vec::new())
    }

    /// Parses a parameter block without its leading `;`.
    ///
    /// Each piece is split at the first `=`. Names are trimmed and
    /// lowercased, values trimmed, and pieces with an empty name skipped.
    pub fn parse(block: &str) -> Self {
        let mut params = Params::new();
        for piece in block.split(';') {
            let (name, value) = match piece.split_once('=') {
                Some((name, value)) => (name, Some(value.trim().to_string())),
                None => (piece, None),
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            params.set(name, value);
        }
        params
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Sets a parameter, keeping its position if it already exists.
    pub fn set(&mut self, name: &str, value: Option<String>) {
        let name = name.to_ascii_lowercase();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        let pos = self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Renders `k1=v1;k2;k3=v3`, without a leading separator.
impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            match value {
                Some(value) => write!(f, "{}={}", name, value)?,
                None => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, Option<&'a str>)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, Option<&'a str>)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.set(name, value.map(str::to_string));
        }
        params
    }
}

/// Splits `text` at the first `;` into the head and the parameter block.
pub(crate) fn split_params(text: &str) -> (&str, Params) {
    match text.split_once(';') {
        Some((head, block)) => (head, Params::parse(block)),
        None => (text, Params::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_and_values() {
        let params = Params::parse("lr;Transport = UDP ;ttl=16");
        assert_eq!(params.len(), 3);
        assert!(params.contains("lr"));
        assert_eq!(params.get("lr"), None);
        assert_eq!(params.get("transport"), Some("UDP"));
        assert_eq!(params.get("TTL"), Some("16"));
    }

    #[test]
    fn test_empty_names_are_skipped() {
        let params = Params::parse(";;=x;maddr=10.0.0.1;");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("maddr"), Some("10.0.0.1"));
    }

    #[test]
    fn test_value_splits_at_first_equals() {
        let params = Params::parse("x=a=b");
        assert_eq!(params.get("x"), Some("a=b"));
    }

    #[test]
    fn test_render_keeps_order() {
        let mut params = Params::parse("branch=z9hG4bK1;rport");
        params.set("received", Some("192.0.2.1".to_string()));
        params.set("branch", Some("z9hG4bK2".to_string()));
        assert_eq!(params.to_string(), "branch=z9hG4bK2;rport;received=192.0.2.1");
        assert_eq!(params.remove("rport"), Some(None));
        assert_eq!(params.to_string(), "branch=z9hG4bK2;received=192.0.2.1");
    }
}
