//! Page-number pagination shared by every post listing.
//!
//! Page numbers are 1-based. Out-of-range requests are clamped instead of
//! rejected: a missing, malformed or non-positive number resolves to the
//! first page and a number past the end resolves to the last page. An empty
//! collection still has one (empty) page.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Raw page request as parsed from the `page` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: u32,
    per_page: u32,
}

impl PageRequest {
    pub fn new(number: u32, per_page: u32) -> Self {
        Self {
            number: number.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn first(per_page: u32) -> Self {
        Self::new(1, per_page)
    }

    /// Parse the `page` query value; anything unusable falls back to page 1.
    pub fn parse(raw: Option<&str>, per_page: u32) -> Self {
        let number = raw
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|value| *value >= 1)
            .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
            .unwrap_or(1);
        Self::new(number, per_page)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Resolve the request against a known total, clamping the page number.
    pub fn resolve(&self, total: u64) -> PageWindow {
        let num_pages = num_pages(total, self.per_page);
        let number = self.number.min(num_pages);
        PageWindow {
            number,
            num_pages,
            per_page: self.per_page,
            total,
        }
    }
}

/// A clamped page position, ready to be turned into `LIMIT/OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageWindow {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.per_page)
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            per_page: self.per_page,
            total: self.total,
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub number: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Paginate an in-memory collection.
    pub fn from_items(all: Vec<T>, request: PageRequest) -> Self {
        let window = request.resolve(all.len() as u64);
        let start = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(start)
            .take(window.per_page as usize)
            .collect();
        window.into_page(items)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_previous() || self.has_next()
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            per_page: self.per_page,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

fn num_pages(total: u64, per_page: u32) -> u32 {
    if total == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(per_page));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_items_split_ten_and_five() {
        let items: Vec<u32> = (0..15).collect();
        let first = Page::from_items(items.clone(), PageRequest::new(1, 10));
        let second = Page::from_items(items, PageRequest::new(2, 10));

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 5);
        assert_eq!(second.items[0], 10);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next());
        assert!(!second.has_next());
        assert_eq!(second.previous_page_number(), Some(1));
    }

    #[test]
    fn malformed_page_numbers_resolve_to_first_page() {
        for raw in [None, Some("abc"), Some("0"), Some("-3"), Some("")] {
            assert_eq!(PageRequest::parse(raw, 10).number(), 1, "{raw:?}");
        }
        assert_eq!(PageRequest::parse(Some(" 2 "), 10).number(), 2);
    }

    #[test]
    fn page_past_the_end_resolves_to_last_page() {
        let window = PageRequest::parse(Some("99"), 10).resolve(15);
        assert_eq!(window.number, 2);
        assert_eq!(window.offset(), 10);
        assert_eq!(window.limit(), 10);
    }

    #[test]
    fn empty_collection_has_one_empty_page() {
        let page: Page<u32> = Page::from_items(Vec::new(), PageRequest::parse(Some("3"), 10));
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.is_empty());
        assert!(!page.has_other_pages());
        assert_eq!(page.next_page_number(), None);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let window = PageRequest::first(10).resolve(20);
        assert_eq!(window.num_pages, 2);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let request = PageRequest::parse(Some("99999999999"), 10);
        assert_eq!(request.number(), u32::MAX);
        assert_eq!(request.resolve(5).number, 1);
    }
}
