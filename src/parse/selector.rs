use std::sync::OnceLock;

use scraper::Selector;

/// A CSS selector compiled on first use and kept for the life of the process.
#[derive(Debug)]
pub(super) struct LazySelector {
    cell: OnceLock<Selector>,
    query: &'static str,
}

impl LazySelector {
    pub(super) const fn new(query: &'static str) -> Self {
        Self {
            cell: OnceLock::new(),
            query,
        }
    }

    pub(super) const fn query(&self) -> &'static str {
        self.query
    }
}

impl core::ops::Deref for LazySelector {
    type Target = Selector;

    fn deref(&self) -> &Self::Target {
        // queries are literals, so a bad one is a programming error caught by the fixture tests
        self.cell.get_or_init(|| match Selector::parse(self.query) {
            Ok(sel) => sel,
            Err(e) => panic!("invalid selector {}: {e:?}", self.query),
        })
    }
}

#[macro_export]
macro_rules! lazy_selector {
    ($x: ident <- $sel: literal) => {
        static $x: $crate::parse::selector::LazySelector =
            $crate::parse::selector::LazySelector::new($sel);
    };
}
