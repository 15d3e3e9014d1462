use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidateUrl;

lazy_static! {
    /// Six-digit hex color with leading '#'
    /// - Valid: "#3B82F6", "#ffffff"
    /// - Invalid: "3B82F6", "#FFF", "#GGGGGG"
    pub static ref HEX_COLOR_REGEX: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();

    /// Identifier from the fixed icon set
    /// - Valid: "shopping-bag", "pizza", "icon2"
    /// - Invalid: "Shopping Bag", "-bag", "bag_2"
    pub static ref ICON_NAME_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Icon references are either a bare identifier or an absolute image URL
pub fn is_valid_icon(icon: &str) -> bool {
    ICON_NAME_REGEX.is_match(icon)
        || ((icon.starts_with("https://") || icon.starts_with("http://"))
            && !icon.contains(char::is_whitespace)
            && icon.validate_url())
}
