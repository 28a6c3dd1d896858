//! Module descriptors and mode filters

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use datalab_plugin::{Capability, CapabilityKind};
use datalab_schema::{GroupSpec, SchemaFingerprint};

/// Filter value selecting every descriptor
pub const ALL_MODES: &str = "all";

/// Everything discovery learned about one selectable module
///
/// Descriptors are rebuilt on every scan and compare by name only.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Name callers select the module by
    pub display_name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Lifecycle contract and factory
    pub capability: Capability,
    /// Declared mode tags; empty when the unit declared none
    pub mode_tags: Vec<String>,
    /// Configuration schema
    pub schema: GroupSpec,
    /// Fingerprint of `schema`
    pub fingerprint: SchemaFingerprint,
    /// Unit file
    pub source: PathBuf,
    /// Symbol within the unit
    pub symbol: String,
}

impl ModuleDescriptor {
    /// Lifecycle contract
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        self.capability.kind()
    }

    /// Whether `name` selects this module, by display name or symbol
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.display_name == name || self.symbol == name
    }
}

impl PartialEq for ModuleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name
    }
}

impl Eq for ModuleDescriptor {}

/// Which mode tags a discovery pass selects
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModeFilter {
    /// Every descriptor, including ones without mode tags
    #[default]
    All,
    /// Descriptors sharing at least one tag
    Tags(Vec<String>),
}

impl ModeFilter {
    /// Filter on a single tag
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag == ALL_MODES {
            Self::All
        } else {
            Self::Tags(vec![tag])
        }
    }

    /// Whether descriptors with these tags pass
    #[must_use]
    pub fn matches(&self, tags: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::Tags(wanted) => tags.iter().any(|t| wanted.contains(t)),
        }
    }
}

impl FromStr for ModeFilter {
    type Err = Infallible;

    /// `all`, or a comma-separated list of tags
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tags: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() || tags.iter().any(|t| t == ALL_MODES) {
            Ok(Self::All)
        } else {
            Ok(Self::Tags(tags))
        }
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_MODES),
            Self::Tags(tags) => f.write_str(&tags.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn all_matches_untagged() {
        assert!(ModeFilter::All.matches(&[]));
        assert!(!ModeFilter::tag("pre").matches(&[]));
    }

    #[test]
    fn tags_intersect() {
        let filter = ModeFilter::tag("post");
        assert!(filter.matches(&tags(&["pre", "post"])));
        assert!(!filter.matches(&tags(&["pre"])));
    }

    #[test]
    fn parses_lists_and_all() {
        assert_eq!("all".parse::<ModeFilter>().unwrap(), ModeFilter::All);
        assert_eq!("".parse::<ModeFilter>().unwrap(), ModeFilter::All);
        assert_eq!(
            "pre, post".parse::<ModeFilter>().unwrap(),
            ModeFilter::Tags(tags(&["pre", "post"]))
        );
        assert_eq!(ModeFilter::tag("all"), ModeFilter::All);
        assert_eq!(ModeFilter::Tags(tags(&["pre", "post"])).to_string(), "pre,post");
    }
}
