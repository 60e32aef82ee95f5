/// Rule-driven grouping: navigation events, batch passes, commands

use crate::color::GroupColor;
use crate::domain::bare_hostname;
use crate::grouper::Grouper;
use crate::membership::Assignment;
use crate::rules::{Rule, RuleSet};
use crate::tab_data::TabInfo;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One-shot messages sent by the popup and options pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    #[serde(rename = "groupTabs")]
    GroupTabs,
}

/// The rule that applies to a tab, if any
pub fn rule_for_tab<'a>(rules: &'a RuleSet, tab: &TabInfo) -> Option<&'a Rule> {
    if tab.incognito {
        return None;
    }
    let hostname = bare_hostname(tab.url.as_deref()?)?;
    rules.lookup(&hostname)
}

impl Grouper {
    /// Seed the default rules into an empty store
    pub async fn on_installed(&self) {
        info!("Tab grouper installed");
        match self.store.load_rules().await {
            Ok(rules) if !rules.is_empty() => {
                debug!("Keeping {} existing rules", rules.len());
            }
            Ok(_) => match self.store.save_rules(&RuleSet::defaults()).await {
                Ok(()) => info!("Installed default rules"),
                Err(e) => warn!("Could not install default rules: {}", e),
            },
            Err(e) => warn!("Could not read rules: {}", e),
        }
    }

    /// A tab finished loading a top-level URL
    pub async fn on_navigation_complete(&self, tab: &TabInfo) -> Assignment {
        if !self.settings().auto_group {
            return Assignment::Skipped;
        }

        let rules = match self.store.load_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                error!("Could not read rules: {}", e);
                return Assignment::Skipped;
            }
        };

        match rule_for_tab(&rules, tab) {
            Some(rule) => {
                self.assign_tab_to_group(tab, rule.group_title(), rule.color())
                    .await
            }
            None => Assignment::Skipped,
        }
    }

    /// Apply the rules to every open tab
    ///
    /// Tabs bound for the same group run one after another so the first
    /// creates the group and the rest join it; distinct groups run
    /// concurrently. A failure on one tab never stops the others.
    pub async fn auto_group_all_tabs(&self) -> Vec<Assignment> {
        let tabs = match self.host.query_tabs().await {
            Ok(tabs) => tabs,
            Err(e) => {
                error!("Could not list tabs: {}", e);
                return Vec::new();
            }
        };
        let rules = match self.store.load_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                error!("Could not read rules: {}", e);
                return Vec::new();
            }
        };

        let mut batches: BTreeMap<String, Vec<(TabInfo, GroupColor)>> = BTreeMap::new();
        for tab in tabs {
            if let Some(rule) = rule_for_tab(&rules, &tab) {
                let color = rule.color();
                batches
                    .entry(rule.group_title().to_string())
                    .or_default()
                    .push((tab, color));
            }
        }

        let runs = batches.into_iter().map(|(title, tabs)| async move {
            let mut outcomes = Vec::with_capacity(tabs.len());
            for (tab, color) in &tabs {
                outcomes.push(self.assign_tab_to_group(tab, &title, *color).await);
            }
            outcomes
        });

        let outcomes: Vec<Assignment> = join_all(runs).await.into_iter().flatten().collect();
        let failed = outcomes.iter().filter(|o| **o == Assignment::Failed).count();
        info!("Grouped {} tabs ({} failed)", outcomes.len() - failed, failed);
        outcomes
    }

    pub async fn handle_command(&self, command: Command) {
        match command {
            Command::GroupTabs => {
                self.auto_group_all_tabs().await;
            }
        }
    }
}
