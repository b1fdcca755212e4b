//! Action icon assets and presentation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::scheme::{Scheme, TabId};

/// The two logical sizes of one scheme's icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconPair {
    #[serde(rename = "16")]
    pub small: String,
    #[serde(rename = "32")]
    pub large: String,
}

impl IconPair {
    pub fn new(small: impl Into<String>, large: impl Into<String>) -> Self {
        Self {
            small: small.into(),
            large: large.into(),
        }
    }
}

/// Static lookup of icon asset pairs by scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSet {
    pub light: IconPair,
    pub dark: IconPair,
}

impl Default for IconSet {
    fn default() -> Self {
        Self {
            light: IconPair::new("icons/yellow-sun-16.png", "icons/yellow-sun-32.png"),
            dark: IconPair::new("icons/blue-moon-16.png", "icons/blue-moon-32.png"),
        }
    }
}

impl IconSet {
    pub fn resolve(&self, scheme: Scheme) -> &IconPair {
        match scheme {
            Scheme::Light => &self.light,
            Scheme::Dark => &self.dark,
        }
    }
}

/// Sets the visible action icon for a tab. Purely cosmetic, never fails.
#[async_trait]
pub trait IconPresenter: Send + Sync {
    async fn show(&self, tab: TabId, scheme: Scheme);
}

/// Presenter for the console front end: logs the asset pair and prints a
/// status line per tab.
pub struct TracingIconPresenter {
    icons: IconSet,
    print_status: bool,
}

impl TracingIconPresenter {
    pub fn new(icons: IconSet) -> Self {
        Self {
            icons,
            print_status: true,
        }
    }

    /// Only log, do not print to stdout
    pub fn quiet(mut self) -> Self {
        self.print_status = false;
        self
    }

    fn status_line(&self, tab: TabId, scheme: Scheme) -> String {
        format!(
            "tab {}: next toggle -> {} ({})",
            tab,
            scheme,
            self.icons.resolve(scheme).small
        )
    }
}

#[async_trait]
impl IconPresenter for TracingIconPresenter {
    async fn show(&self, tab: TabId, scheme: Scheme) {
        let pair = self.icons.resolve(scheme);
        tracing::debug!(
            tab = %tab,
            scheme = %scheme,
            small = %pair.small,
            large = %pair.large,
            "Setting action icon"
        );
        if self.print_status {
            println!("{}", self.status_line(tab, scheme));
        }
    }
}
