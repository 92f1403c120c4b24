//! Priority-ordered access rules.
//!
//! Rules map a `(daemon list, client list)` pair to an [`Effect`]. The
//! [`PolicyEngine`] evaluates them highest priority first; the first match
//! wins. Both lists use the [`pattern`](crate::pattern) language of the host
//! access tables, so a rule set and a `hosts.allow` line express the same
//! things.

use std::collections::BTreeSet;

use crate::pattern::{AccessQuery, PatternList};

/// The effect of a policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The request is allowed.
    Allow,
    /// The request is denied.
    Deny,
}

impl Effect {
    /// Parse `"allow"` or `"deny"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }

    /// The decision a match with this effect produces.
    pub fn decision(self) -> PolicyDecision {
        match self {
            Effect::Allow => PolicyDecision::Allowed,
            Effect::Deny => PolicyDecision::Denied,
        }
    }
}

/// A single policy rule.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    /// Daemons this rule applies to (e.g. "sshd", "ALL").
    pub daemons: PatternList,
    /// Clients this rule applies to (e.g. ".example.com", "10.0.0.0/8").
    pub clients: PatternList,
    /// Whether to allow or deny.
    pub effect: Effect,
    /// Priority (higher = evaluated first). Rules with equal priority
    /// are evaluated in insertion order.
    pub priority: u32,
}

impl PolicyRule {
    /// Create a new Allow rule.
    pub fn allow(daemons: &str, clients: &str) -> Self {
        Self {
            daemons: PatternList::parse(daemons),
            clients: PatternList::parse(clients),
            effect: Effect::Allow,
            priority: 0,
        }
    }

    /// Create a new Deny rule.
    pub fn deny(daemons: &str, clients: &str) -> Self {
        Self {
            daemons: PatternList::parse(daemons),
            clients: PatternList::parse(clients),
            effect: Effect::Deny,
            priority: 0,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    fn matches(&self, query: &AccessQuery<'_>) -> bool {
        self.daemons.matches_daemon(query) && self.clients.matches_client(query)
    }
}

/// The result of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Allowed by a matching rule.
    Allowed,
    /// Denied by a matching rule.
    Denied,
    /// No matching rule found.
    NoMatch,
}

impl PolicyDecision {
    /// Resolve [`NoMatch`](Self::NoMatch) with the given fallback effect.
    pub fn or_else(self, fallback: Effect) -> Self {
        match self {
            PolicyDecision::NoMatch => fallback.decision(),
            decided => decided,
        }
    }

    pub fn is_allowed(self) -> bool {
        self == PolicyDecision::Allowed
    }
}

/// A compiled rule set.
///
/// Rules are kept sorted by priority (descending, stable), so evaluation
/// only needs a shared reference and the engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
}

impl PolicyEngine {
    /// Create a new empty policy engine.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule to the engine.
    pub fn add_rule(&mut self, rule: PolicyRule) {
        let at = self.rules.partition_point(|r| r.priority >= rule.priority);
        self.rules.insert(at, rule);
    }

    /// Evaluate an access request against the policy rules.
    pub fn evaluate(&self, query: &AccessQuery<'_>) -> PolicyDecision {
        self.rules
            .iter()
            .find(|rule| rule.matches(query))
            .map_or(PolicyDecision::NoMatch, |rule| rule.effect.decision())
    }

    /// Returns `true` only if a rule explicitly allows the request.
    pub fn is_allowed(&self, query: &AccessQuery<'_>) -> bool {
        self.evaluate(query).is_allowed()
    }

    /// Return the number of rules in the engine.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Daemon names referenced by rules, excluding wildcards.
    pub fn daemons(&self) -> Vec<&str> {
        let seen: BTreeSet<&str> = self
            .rules
            .iter()
            .flat_map(|r| r.daemons.patterns())
            .map(String::as_str)
            .filter(|d| !d.eq_ignore_ascii_case("ALL"))
            .collect();
        seen.into_iter().collect()
    }
}

/// Create a pre-configured policy engine from a list of rules.
pub fn build_policy(rules: Vec<PolicyRule>) -> PolicyEngine {
    let mut engine = PolicyEngine::new();
    for rule in rules {
        engine.add_rule(rule);
    }
    engine
}
