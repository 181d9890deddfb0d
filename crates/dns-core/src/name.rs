//! Domain names used as keys for zone data
//!
//! A [`Name`] is a sequence of labels plus a flag telling whether it is
//! absolute (anchored at the root) or relative to some origin. Comparison
//! ignores ASCII case, and ordering follows the DNSSEC canonical order so
//! that zone contents iterate the way they would be signed.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DnsError, DnsResult};
use crate::types::{MAX_DOMAIN_NAME_LENGTH, MAX_LABEL_LENGTH};

/// A domain name
#[derive(Clone, Serialize, Deserialize)]
pub struct Name {
    labels: Vec<String>,
    absolute: bool,
}

impl Name {
    /// The root name `.`
    pub fn root() -> Self {
        Self { labels: Vec::new(), absolute: true }
    }

    /// The empty relative name, written `@` in zone files
    pub fn empty() -> Self {
        Self { labels: Vec::new(), absolute: false }
    }

    /// Parse text into a name
    ///
    /// A trailing dot makes the name absolute. Relative names are appended
    /// to `origin` when one is given. `@` is the origin itself, or the
    /// empty relative name without one.
    pub fn from_text(text: &str, origin: Option<&Name>) -> DnsResult<Self> {
        let relative = match text {
            "" => return Err(DnsError::invalid_name(text, "empty name")),
            "." => return Ok(Self::root()),
            "@" => Self::empty(),
            _ => {
                let (body, absolute) = match text.strip_suffix('.') {
                    Some(body) => (body, true),
                    None => (text, false),
                };
                let mut labels = Vec::new();
                for label in body.split('.') {
                    if label.is_empty() {
                        return Err(DnsError::invalid_name(text, "empty label"));
                    }
                    labels.push(label.to_string());
                }
                let name = Self { labels, absolute };
                name.check_limits().map_err(|_| {
                    DnsError::invalid_name(text, "label or name too long")
                })?;
                if absolute {
                    return Ok(name);
                }
                name
            }
        };

        match origin {
            Some(origin) => relative.derelativize(origin),
            None => Ok(relative),
        }
    }

    fn check_limits(&self) -> DnsResult<()> {
        if let Some(label) = self.labels.iter().find(|l| l.len() > MAX_LABEL_LENGTH) {
            return Err(DnsError::invalid_name(
                self.to_string(),
                format!("label '{}' exceeds {} octets", label, MAX_LABEL_LENGTH),
            ));
        }
        if self.labels.iter().any(|l| l.is_empty()) {
            return Err(DnsError::invalid_name(self.to_string(), "empty label"));
        }
        if self.wire_length() > MAX_DOMAIN_NAME_LENGTH {
            return Err(DnsError::invalid_name(
                self.to_string(),
                format!("name exceeds {} octets", MAX_DOMAIN_NAME_LENGTH),
            ));
        }
        Ok(())
    }

    /// Length of the name in uncompressed wire format
    pub fn wire_length(&self) -> usize {
        let labels: usize = self.labels.iter().map(|l| l.len() + 1).sum();
        if self.absolute { labels + 1 } else { labels }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// True when `self` is equal to `other` or below it
    ///
    /// Absolute and relative names never contain each other.
    pub fn is_subdomain(&self, other: &Name) -> bool {
        if self.absolute != other.absolute || other.labels.len() > self.labels.len() {
            return false;
        }
        self.labels
            .iter()
            .rev()
            .zip(other.labels.iter().rev())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Strip `origin` from the end of the name
    ///
    /// Names outside `origin` are returned unchanged.
    pub fn relativize(&self, origin: &Name) -> Name {
        if !self.is_subdomain(origin) {
            return self.clone();
        }
        let keep = self.labels.len() - origin.labels.len();
        Self {
            labels: self.labels[..keep].to_vec(),
            absolute: false,
        }
    }

    /// Append `origin` to a relative name
    pub fn derelativize(&self, origin: &Name) -> DnsResult<Name> {
        if self.absolute {
            return Ok(self.clone());
        }
        let mut labels = self.labels.clone();
        labels.extend(origin.labels.iter().cloned());
        let name = Self { labels, absolute: origin.absolute };
        name.check_limits()?;
        Ok(name)
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.labels.iter().rev().zip(other.labels.iter().rev()) {
            let ordering = a
                .bytes()
                .map(|c| c.to_ascii_lowercase())
                .cmp(b.bytes().map(|c| c.to_ascii_lowercase()));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        self.labels
            .len()
            .cmp(&other.labels.len())
            .then(self.absolute.cmp(&other.absolute))
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
            && self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
        self.labels.len().hash(state);
        for label in &self.labels {
            for byte in label.bytes() {
                state.write_u8(byte.to_ascii_lowercase());
            }
            state.write_u8(0);
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_cmp(other)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(if self.absolute { "." } else { "@" });
        }
        f.write_str(&self.labels.join("."))?;
        if self.absolute {
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

impl FromStr for Name {
    type Err = DnsError;

    fn from_str(s: &str) -> DnsResult<Self> {
        Self::from_text(s, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Name {
        Name::from_text(text, None).unwrap()
    }

    #[test]
    fn test_parse_absolute_and_relative() {
        let abs = name("www.Example.com.");
        assert!(abs.is_absolute());
        assert_eq!(abs.label_count(), 3);
        assert_eq!(abs.to_string(), "www.Example.com.");

        let rel = name("www");
        assert!(!rel.is_absolute());
        assert_eq!(rel.to_string(), "www");

        assert_eq!(name("."), Name::root());
        assert_eq!(name("@"), Name::empty());
    }

    #[test]
    fn test_parse_with_origin() {
        let origin = name("example.com.");
        assert_eq!(Name::from_text("www", Some(&origin)).unwrap(), name("www.example.com."));
        assert_eq!(Name::from_text("@", Some(&origin)).unwrap(), origin);
        assert_eq!(Name::from_text("other.org.", Some(&origin)).unwrap(), name("other.org."));
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert!(matches!(Name::from_text("", None), Err(DnsError::InvalidDnsName { .. })));
        assert!(matches!(Name::from_text("a..b", None), Err(DnsError::InvalidDnsName { .. })));

        let long_label = "a".repeat(64);
        assert!(Name::from_text(&long_label, None).is_err());

        let long_name = vec!["a".repeat(63); 5].join(".");
        assert!(Name::from_text(&long_name, None).is_err());
    }

    #[test]
    fn test_case_insensitive_equality_and_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(name("WWW.example.COM."));
        assert!(set.contains(&name("www.example.com.")));
        assert_ne!(name("www.example.com."), name("www.example.com"));
    }

    #[test]
    fn test_relativize_round_trip() {
        let origin = name("example.com.");
        let full = name("a.b.example.com.");
        let rel = full.relativize(&origin);
        assert_eq!(rel, name("a.b"));
        assert_eq!(rel.derelativize(&origin).unwrap(), full);
        assert_eq!(origin.relativize(&origin), Name::empty());

        let outside = name("example.org.");
        assert_eq!(outside.relativize(&origin), outside);
    }

    #[test]
    fn test_canonical_ordering() {
        let mut names = vec![
            name("z.example."),
            name("a.example."),
            name("example."),
            name("yljkjljk.a.example."),
            name("Z.a.example."),
        ];
        names.sort();
        let sorted: Vec<String> = names.iter().map(|n| n.to_string().to_lowercase()).collect();
        assert_eq!(
            sorted,
            vec!["example.", "a.example.", "yljkjljk.a.example.", "z.a.example.", "z.example."]
        );
    }
}
