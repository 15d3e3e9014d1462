/// Brand blue used when a category has no color of its own
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

/// Maximum length of a category or rule name
pub const MAX_NAME_LENGTH: u64 = 120;

/// Suffix of the name given to rules created from a category edit
pub const RELATED_RULE_NAME_SUFFIX: &str = "and Related Categories";

/// Uppercase alphanumeric alphabet Superpass codes are drawn from
pub const SUPERPASS_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Global admin - everything
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Catalog admin - manages the category taxonomy
pub const ROLE_ADMIN: &str = "admin";
