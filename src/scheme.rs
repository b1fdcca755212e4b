//! Core value types: tab identifiers, color schemes and override states.

use serde::{Deserialize, Serialize};

/// Browser tab identifier
///
/// Unique while the tab exists. The browser may hand the same number to a
/// later tab, so nothing keyed by a `TabId` may outlive the tab it named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl TabId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TabId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(TabId)
    }
}

impl From<u32> for TabId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Color scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Light,
    Dark,
}

impl Scheme {
    /// The other scheme
    pub fn flip(&self) -> Self {
        match self {
            Scheme::Light => Scheme::Dark,
            Scheme::Dark => Scheme::Light,
        }
    }

    /// String representation for storage and CSS media features
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Light => "light",
            Scheme::Dark => "dark",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Scheme::Light),
            "dark" => Some(Scheme::Dark),
            _ => None,
        }
    }

    /// Map the result of `matchMedia('(prefers-color-scheme: dark)').matches`
    pub fn from_prefers_dark(prefers_dark: bool) -> Self {
        if prefers_dark {
            Scheme::Dark
        } else {
            Scheme::Light
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Override state of a single tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideState {
    #[default]
    Unforced,
    Forced(Scheme),
}

impl OverrideState {
    pub fn forced(&self) -> Option<Scheme> {
        match self {
            OverrideState::Unforced => None,
            OverrideState::Forced(scheme) => Some(*scheme),
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, OverrideState::Forced(_))
    }
}

impl From<Option<Scheme>> for OverrideState {
    fn from(value: Option<Scheme>) -> Self {
        match value {
            Some(scheme) => OverrideState::Forced(scheme),
            None => OverrideState::Unforced,
        }
    }
}
