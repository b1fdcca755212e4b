//! Line-based console standing in for the browser action button.

use crate::cdp::TabSummary;
use crate::scheme::TabId;
use crate::store::OverrideMap;

pub const HELP: &str = "commands: toggle <tab> | tabs | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Toggle(TabId),
    Tabs,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let parsed = match command.to_lowercase().as_str() {
            "toggle" | "t" => {
                let arg = words
                    .next()
                    .ok_or_else(|| "toggle needs a tab id".to_string())?;
                let tab = arg
                    .parse::<TabId>()
                    .map_err(|_| format!("invalid tab id '{}'", arg))?;
                ConsoleCommand::Toggle(tab)
            }
            "tabs" | "ls" => ConsoleCommand::Tabs,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };
        if words.next().is_some() {
            return Err(format!("too many arguments for '{}'", command));
        }
        Ok(Some(parsed))
    }
}

/// Render the tab table printed by the `tabs` command
pub fn format_tabs(tabs: &[TabSummary], overrides: &OverrideMap) -> String {
    if tabs.is_empty() {
        return "No tabs".to_string();
    }
    tabs.iter()
        .map(|summary| {
            let state = overrides
                .get(&summary.tab)
                .map(|scheme| format!("forced {}", scheme))
                .unwrap_or_else(|| "system".to_string());
            format!("{:>4}  {:<12} {}", summary.tab.get(), state, summary.url)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render persisted overrides for the `status` subcommand
pub fn format_overrides(overrides: &OverrideMap) -> String {
    if overrides.is_empty() {
        return "No overrides".to_string();
    }
    overrides
        .iter()
        .map(|(tab, scheme)| format!("tab {}: {}", tab, scheme))
        .collect::<Vec<_>>()
        .join("\n")
}
