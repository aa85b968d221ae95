//! Rule catalog keyed by stable rule id.
//!
//! The registry is an explicit value constructed once at startup and passed
//! by reference to whatever needs rule metadata, never ambient static state.
//! It performs no analysis itself; it only enumerates and looks up rules for
//! selection by the (external) configuration layer.

use crate::diagnostics::RuleCategory;
use crate::error::RegistryError;
use crate::rule::Rule;
use crate::rules;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Id-keyed catalog of built-in and externally registered rules.
pub struct RuleRegistry {
    rules: BTreeMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Creates a registry populated with the built-in catalog.
    pub fn builtin() -> Self {
        let mut rules = BTreeMap::new();
        for rule in rules::all_rules() {
            let rule: Arc<dyn Rule> = Arc::from(rule);
            rules.insert(rule.metadata().rule_id.clone(), rule);
        }
        Self { rules }
    }

    /// Registers an additional rule (e.g. from a plugin). Plugin rules
    /// present the identical contract as built-ins; a duplicate id is a
    /// configuration error.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), RegistryError> {
        let rule_id = rule.metadata().rule_id.clone();
        if self.rules.contains_key(&rule_id) {
            return Err(RegistryError::DuplicateRuleId(rule_id));
        }
        self.rules.insert(rule_id, rule);
        Ok(())
    }

    pub fn get(&self, rule_id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(rule_id)
    }

    /// All registered rules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn by_category(&self, category: RuleCategory) -> Vec<&Arc<dyn Rule>> {
        self.rules
            .values()
            .filter(|rule| rule.metadata().category == category)
            .collect()
    }

    pub fn fixable(&self) -> Vec<&Arc<dyn Rule>> {
        self.rules
            .values()
            .filter(|rule| rule.metadata().fixable)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
