mod rule_engine;

pub use rule_engine::{RuleEngine, RuleMergeOutcome};
