//! Strategy registry with first-match-wins dispatch.
//!
//! The [`StrategyRegistry`] holds an ordered list of [`DispatchRule`]s. A URL
//! is normalized once and tested against each rule in registration order; the
//! first matching rule decides the outcome. A rule may match without naming a
//! strategy, which ends dispatch with [`DispatchError::NoStrategy`].

use tracing::debug;

use super::url::{is_direct_file, is_self_post, normalize_url};
use super::{DispatchError, StrategyKind};

/// Predicate over a normalized URL.
pub type UrlPredicate = fn(&str) -> bool;

/// One entry in the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct DispatchRule {
    name: &'static str,
    predicate: UrlPredicate,
    strategy: Option<StrategyKind>,
}

impl DispatchRule {
    /// A rule that dispatches matching URLs to `strategy`.
    #[must_use]
    pub const fn new(name: &'static str, predicate: UrlPredicate, strategy: StrategyKind) -> Self {
        Self {
            name,
            predicate,
            strategy: Some(strategy),
        }
    }

    /// A rule that claims matching URLs without dispatching them.
    #[must_use]
    pub const fn reject(name: &'static str, predicate: UrlPredicate) -> Self {
        Self {
            name,
            predicate,
            strategy: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn strategy(&self) -> Option<StrategyKind> {
        self.strategy
    }

    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        (self.predicate)(normalized)
    }
}

/// Opt-ins for the default rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryOptions {
    /// Dispatch file-shaped URLs to [`StrategyKind::DIRECT`] instead of
    /// rejecting them.
    pub direct_links: bool,
}

/// Ordered collection of dispatch rules.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    rules: Vec<DispatchRule>,
}

impl StrategyRegistry {
    /// Creates an empty registry; every URL is rejected.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Builds the default rule table.
    ///
    /// Order is deterministic: direct files first (claimed even when direct
    /// links are not opted in), then self posts.
    #[must_use]
    pub fn with_defaults(options: RegistryOptions) -> Self {
        let mut registry = Self::new();
        let direct = if options.direct_links {
            DispatchRule::new("direct-file", is_direct_file, StrategyKind::DIRECT)
        } else {
            DispatchRule::reject("direct-file", is_direct_file)
        };
        registry.register(direct);
        registry.register(DispatchRule::new(
            "self-post",
            is_self_post,
            StrategyKind::SELF_POST,
        ));
        registry
    }

    /// Appends a rule after every existing one.
    pub fn register(&mut self, rule: DispatchRule) {
        debug!(
            rule = rule.name(),
            strategy = ?rule.strategy(),
            "Registering dispatch rule"
        );
        self.rules.push(rule);
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in evaluation order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(DispatchRule::name).collect()
    }

    /// Selects the strategy for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoStrategy`] if no rule matches, or if the
    /// first matching rule names no strategy.
    pub fn select(&self, url: &str) -> Result<StrategyKind, DispatchError> {
        let normalized = normalize_url(url);
        let Some(rule) = self.rules.iter().find(|rule| rule.matches(&normalized)) else {
            return Err(DispatchError::no_strategy(url, &normalized));
        };
        rule.strategy()
            .ok_or_else(|| DispatchError::no_strategy(url, &normalized))
    }
}
