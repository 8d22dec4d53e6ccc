use scraper::{ElementRef, Html};

use super::selector::LazySelector;
use crate::error::{Error, Result};

/// Returns `attr` of the first element matching `selector`.
///
/// `field` names the value in the error so a changed vendor page says exactly which lookup broke.
pub(super) fn attr_of_first<'a>(
    document: &'a Html,
    selector: &LazySelector,
    attr: &str,
    field: &str,
) -> Result<&'a str> {
    let element = document.select(selector).next().ok_or_else(|| {
        log::debug!("no match for {} while looking for {field}", selector.query());
        Error::parse_error(format!("Couldn't find value for {field}"))
    })?;
    attr_of(element, attr, field)
}

pub(super) fn attr_of<'a>(element: ElementRef<'a>, attr: &str, field: &str) -> Result<&'a str> {
    element
        .value()
        .attr(attr)
        .ok_or_else(|| Error::parse_error(format!("The {field} element has no `{attr}` attribute")))
}

pub(super) fn parse_int(value: &str, field: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::parse_error(format!("Value for {field} is not an integer: {value:?}")))
}
