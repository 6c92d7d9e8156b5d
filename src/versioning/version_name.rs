use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const ORIGINAL: &str = "Original";

/// Registry key of a model version.
///
/// The variant order is the display order: `Original`, then `V<n>` by ascending `n`,
/// then any other name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionName {
    Original,
    Numbered(u32),
    Other(String),
}

impl VersionName {
    pub fn parse(name: &str) -> Self {
        if name == ORIGINAL {
            return Self::Original;
        }
        name.strip_prefix('V')
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| {
                let n: u32 = digits.parse().ok()?;
                (n.to_string() == digits).then_some(Self::Numbered(n))
            })
            .unwrap_or_else(|| Self::Other(name.to_string()))
    }

    pub fn is_original(&self) -> bool {
        matches!(self, Self::Original)
    }

    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Numbered(n) => Some(*n),
            _ => None,
        }
    }

    /// `V<max + 1>` over the numbered names, or `V1` when there are none.
    /// `None` once `V<u32::MAX>` is taken.
    pub fn next_after<'a, I>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a VersionName>,
    {
        match names.into_iter().filter_map(VersionName::number).max() {
            Some(n) => n.checked_add(1).map(Self::Numbered),
            None => Some(Self::Numbered(1)),
        }
    }
}

impl Display for VersionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => f.write_str(ORIGINAL),
            Self::Numbered(n) => write!(f, "V{n}"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl FromStr for VersionName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for VersionName {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for VersionName {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<VersionName> for String {
    fn from(value: VersionName) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_shapes() {
        assert_eq!(VersionName::parse("Original"), VersionName::Original);
        assert_eq!(VersionName::parse("V12"), VersionName::Numbered(12));
        assert_eq!(VersionName::parse("V"), VersionName::Other("V".into()));
        assert_eq!(VersionName::parse("V01"), VersionName::Other("V01".into()));
        assert_eq!(VersionName::parse("V-1"), VersionName::Other("V-1".into()));
        assert_eq!(VersionName::parse("v2"), VersionName::Other("v2".into()));
    }

    #[test]
    fn display_round_trips() {
        for s in ["Original", "V3", "legacy"] {
            assert_eq!(VersionName::parse(s).to_string(), s);
        }
    }

    #[test]
    fn orders_original_then_numeric_then_malformed() {
        let mut names: Vec<VersionName> = ["V10", "legacy", "V2", "Original", "V1"]
            .into_iter()
            .map(VersionName::parse)
            .collect();
        names.sort();
        let shown: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["Original", "V1", "V2", "V10", "legacy"]);
    }

    #[test]
    fn next_name_is_max_plus_one() {
        let names = [
            VersionName::Original,
            VersionName::Numbered(1),
            VersionName::Numbered(7),
            VersionName::Other("V3x".into()),
        ];
        assert_eq!(VersionName::next_after(&names), Some(VersionName::Numbered(8)));
        assert_eq!(
            VersionName::next_after(&[VersionName::Original]),
            Some(VersionName::Numbered(1))
        );
    }

    #[test]
    fn numbering_stops_at_the_largest_name() {
        let names = [VersionName::Original, VersionName::Numbered(u32::MAX)];
        assert_eq!(VersionName::next_after(&names), None);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&VersionName::Numbered(4)).unwrap();
        assert_eq!(json, "\"V4\"");
        let back: VersionName = serde_json::from_str("\"Original\"").unwrap();
        assert!(back.is_original());
    }
}
