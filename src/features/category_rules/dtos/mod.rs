mod rule_dto;

pub use rule_dto::{CategoryRuleResponseDto, CreateRuleDto, UpdateRuleDto};
