//! Per-convention rule sets.

use std::fmt;
use std::sync::Arc;

use federa_logical::Convention;
use log::debug;

use crate::rules::{AggregateInputTrimRule, EnumerableRule, FilterMergeRule, Rule};

/// Rules keyed by the convention whose rule set they belong to.
///
/// The registry is built once and then only read, so one registry can be
/// shared by concurrent optimizations.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<(Convention, Arc<dyn Rule>)>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical rewrites plus the enumerable implementation rules.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Convention::Logical, FilterMergeRule::new());
        registry.register(Convention::Logical, AggregateInputTrimRule::new());
        for rule in EnumerableRule::all() {
            registry.register(Convention::Enumerable, rule);
        }
        registry
    }

    /// Add `rule` to `convention`'s rule set. Returns `false` (and keeps the
    /// existing rule) if a rule of the same name is already registered there.
    pub fn register(&mut self, convention: Convention, rule: impl Rule + 'static) -> bool {
        self.register_arc(convention, Arc::new(rule))
    }

    pub fn register_arc(&mut self, convention: Convention, rule: Arc<dyn Rule>) -> bool {
        if self
            .rules
            .iter()
            .any(|(c, r)| c == &convention && r.name() == rule.name())
        {
            debug!("rule '{}' already registered for {convention}", rule.name());
            return false;
        }
        self.rules.push((convention, rule));
        true
    }

    /// All rules in registration order.
    pub fn rules(&self) -> &[(Convention, Arc<dyn Rule>)] {
        &self.rules
    }

    /// Rules registered for `convention`.
    pub fn rules_for<'a>(&'a self, convention: &'a Convention) -> impl Iterator<Item = &'a Arc<dyn Rule>> + 'a {
        self.rules
            .iter()
            .filter(move |(c, _)| c == convention)
            .map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|(c, r)| format!("{c}:{}", r.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_rejected_per_convention() {
        let mut registry = RuleRegistry::new();
        assert!(registry.register(Convention::Logical, FilterMergeRule::new()));
        assert!(!registry.register(Convention::Logical, FilterMergeRule::new()));
        assert!(registry.register(Convention::Enumerable, FilterMergeRule::new()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let registry = RuleRegistry::with_defaults();
        assert_eq!(registry.rules_for(&Convention::Logical).count(), 2);
        let enumerable: Vec<&str> = registry
            .rules_for(&Convention::Enumerable)
            .map(|r| r.name())
            .collect();
        assert!(enumerable.contains(&"EnumerableScanRule"));
        assert!(enumerable.contains(&"EnumerableAggregateRule"));
    }
}
