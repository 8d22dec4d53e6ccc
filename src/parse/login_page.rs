use scraper::Html;

use super::field::attr_of_first;
use crate::error::Result;
use crate::lazy_selector;

/// Pulls the anti-forgery token out of the login form.
pub fn extract_csrf_token(html: &str) -> Result<String> {
    lazy_selector!(CSRF_SELECTOR <- r#"[name="csrftk"]"#);
    let document = Html::parse_document(html);
    attr_of_first(&document, &CSRF_SELECTOR, "value", "CSRF token").map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;

    #[test]
    fn test_extract_csrf_token() {
        let html = fs::read_to_string("./src/parse/html_examples/login/login.html").unwrap();
        assert_eq!(
            extract_csrf_token(&html).unwrap(),
            "245EFF7C-BC24-463D-B6B1-CD34B1002DC5"
        );
    }

    #[test]
    fn test_missing_csrf_token() {
        let html =
            fs::read_to_string("./src/parse/html_examples/login/login_no_token.html").unwrap();
        assert!(matches!(extract_csrf_token(&html), Err(Error::Parse(_))));
    }

    #[test]
    fn test_csrf_token_without_value() {
        let html = r#"<form><input type="hidden" name="csrftk"></form>"#;
        assert!(matches!(extract_csrf_token(html), Err(Error::Parse(_))));
    }
}
