use crate::error::{GraftError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Numeric release version (e.g., "0.0.10" -> [0, 0, 10])
///
/// Components are compared as numbers, major first. Git lists refs as plain
/// strings, which puts `0.0.10` before `0.0.9`, so every "first/last release"
/// query sorts with this type instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    /// Create a version from its numeric components
    pub fn new(components: impl Into<Vec<u64>>) -> Result<Self> {
        let components = components.into();
        if components.len() < 2 {
            return Err(GraftError::parse(format!(
                "Version needs at least two components, got {}",
                components.len()
            )));
        }
        Ok(Version { components })
    }

    /// Parse a dotted version (e.g., "1.2" or "0.0.10")
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() < 2 {
            return Err(GraftError::parse(format!(
                "Invalid version format: '{}' - expected <major>.<minor>",
                text
            )));
        }

        let components = parts
            .iter()
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(GraftError::parse(format!(
                        "Invalid version component '{}' in '{}'",
                        part, text
                    )));
                }
                part.parse::<u64>().map_err(|_| {
                    GraftError::parse(format!("Version component out of range: {}", part))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Version { components })
    }

    pub fn major(&self) -> u64 {
        self.components[0]
    }

    /// The last component, i.e. the release sequence number
    pub fn minor(&self) -> u64 {
        self.components[self.components.len() - 1]
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec<u64> compares element-wise, then by length
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = GraftError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = Version::parse("1.2").unwrap();
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 2);
    }

    #[test]
    fn test_version_parse_three_components() {
        let v = Version::parse("0.0.444").unwrap();
        assert_eq!(v.components(), &[0, 0, 444]);
        assert_eq!(v.minor(), 444);
    }

    #[test]
    fn test_version_parse_invalid() {
        assert!(Version::parse("1").is_err());
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("-1.2").is_err());
        assert!(Version::parse("pub-20200101.1").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        let mut versions: Vec<Version> = ["0.0.2", "0.0.10", "0.0.9"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        versions.sort();

        let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["0.0.2", "0.0.9", "0.0.10"]);
    }

    #[test]
    fn test_major_dominates_minor() {
        assert!(Version::parse("2.0").unwrap() > Version::parse("1.99").unwrap());
        assert!(Version::parse("1.10").unwrap() > Version::parse("1.9").unwrap());
    }

    #[test]
    fn test_shorter_prefix_sorts_first() {
        assert!(Version::parse("1.2").unwrap() < Version::parse("1.2.0").unwrap());
    }

    #[test]
    fn test_new_requires_two_components() {
        assert!(Version::new(vec![1]).is_err());
        assert_eq!(Version::new(vec![3, 4]).unwrap().to_string(), "3.4");
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::parse("20141207.2").unwrap().to_string(), "20141207.2");
    }
}
