//! Evaluation against the priority-ordered rules from `[[access.rules]]`.

use netgate_config::AppConfig;
use netgate_config::pattern::AccessQuery;
use netgate_config::policy::{Effect, PolicyDecision, PolicyEngine};

use super::{AccessError, AccessEvaluator};

/// Evaluator backed by an in-memory [`PolicyEngine`].
#[derive(Debug, Clone)]
pub struct RuleSetEvaluator {
    engine: PolicyEngine,
    no_match: Effect,
}

impl RuleSetEvaluator {
    pub fn new(engine: PolicyEngine, no_match: Effect) -> Self {
        Self { engine, no_match }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.build_policy_engine(), config.no_match_effect())
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }
}

impl AccessEvaluator for RuleSetEvaluator {
    fn name(&self) -> &str {
        "rules"
    }

    fn evaluate(&self, query: &AccessQuery<'_>) -> Result<PolicyDecision, AccessError> {
        Ok(self.engine.evaluate(query).or_else(self.no_match))
    }
}
