use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

/// Trims `s` and folds every run of whitespace (newlines from the vendor's markup included) into one space.
pub fn tidy_text(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s{2,}|[\t\r\n]").expect("regex should be valid"));
    re.replace_all(s.trim(), " ")
}
