mod category_rule;

pub use category_rule::{CategoryRule, NewRule, RuleMergeEntry, RulePatch, RuleType};
