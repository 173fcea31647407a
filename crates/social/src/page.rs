//! 1-based pagination over deterministically ordered result sets.

use serde::Serialize;

use haulboard_core::{DomainError, DomainResult};

/// Validated page request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    per_page: usize,
}

impl PageRequest {
    /// `page < 1` is clamped to 1; `per_page` must be at least 1.
    pub fn new(page: i64, per_page: usize) -> DomainResult<Self> {
        if per_page == 0 {
            return Err(DomainError::validation("page size must be at least 1"));
        }
        let page = usize::try_from(page.max(1)).unwrap_or(usize::MAX);
        Ok(Self { page, per_page })
    }

    pub fn first(per_page: usize) -> DomainResult<Self> {
        Self::new(1, per_page)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Index of the first row on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Exclusive upper bound of this page (`page * per_page`).
    pub fn end(&self) -> usize {
        self.page.saturating_mul(self.per_page)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Wrap an already-sliced page whose source reports `total` rows.
    pub fn from_total(items: Vec<T>, request: PageRequest, total: usize) -> Self {
        Self {
            items,
            page: request.page(),
            per_page: request.per_page(),
            has_next: total > request.end(),
            has_prev: request.page() > 1,
        }
    }

    /// Wrap a window fetched with `limit = per_page + 1` starting at the
    /// page offset. The extra row, if present, only signals `has_next`.
    pub fn from_lookahead(mut rows: Vec<T>, request: PageRequest) -> Self {
        let has_next = rows.len() > request.per_page();
        rows.truncate(request.per_page());
        Self {
            items: rows,
            page: request.page(),
            per_page: request.per_page(),
            has_next,
            has_prev: request.page() > 1,
        }
    }

    pub fn next_num(&self) -> Option<usize> {
        self.has_next.then(|| self.page + 1)
    }

    pub fn prev_num(&self) -> Option<usize> {
        self.has_prev.then(|| self.page - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// What a store hands back for `request`: the page plus one lookahead row.
    fn fetch(rows: &[u32], request: PageRequest) -> Page<u32> {
        let window = rows
            .iter()
            .copied()
            .skip(request.offset())
            .take(request.per_page().saturating_add(1))
            .collect();
        Page::from_lookahead(window, request)
    }

    #[test]
    fn page_below_one_is_clamped() {
        let req = PageRequest::new(-3, 10).unwrap();
        assert_eq!(req.page(), 1);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(matches!(PageRequest::new(1, 0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn slices_and_flags() {
        let rows: Vec<u32> = (1..=5).collect();

        let p1 = fetch(&rows, PageRequest::new(1, 2).unwrap());
        assert_eq!(p1.items, vec![1, 2]);
        assert!(p1.has_next);
        assert!(!p1.has_prev);
        assert_eq!(p1.next_num(), Some(2));
        assert_eq!(p1.prev_num(), None);

        let p3 = fetch(&rows, PageRequest::new(3, 2).unwrap());
        assert_eq!(p3.items, vec![5]);
        assert!(!p3.has_next);
        assert!(p3.has_prev);

        let beyond = fetch(&rows, PageRequest::new(9, 2).unwrap());
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_next);
        assert!(beyond.has_prev);
    }

    #[test]
    fn lookahead_row_only_sets_has_next() {
        let req = PageRequest::new(2, 2).unwrap();

        let full = Page::from_lookahead(vec![3, 4, 5], req);
        assert_eq!(full.items, vec![3, 4]);
        assert!(full.has_next);
        assert!(full.has_prev);

        let exact = Page::from_lookahead(vec![3, 4], req);
        assert_eq!(exact.items, vec![3, 4]);
        assert!(!exact.has_next);
    }

    #[test]
    fn total_count_drives_has_next() {
        let req = PageRequest::new(1, 2).unwrap();
        assert!(Page::from_total(vec![1, 2], req, 3).has_next);
        assert!(!Page::from_total(vec![1, 2], req, 2).has_next);
    }

    #[test]
    fn exact_fit_has_no_next_page() {
        let page = fetch(&[1, 2], PageRequest::new(1, 2).unwrap());
        assert!(!page.has_next);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let req = PageRequest::new(i64::MAX, usize::MAX).unwrap();
        let page = fetch(&[1, 2, 3], req);
        assert!(page.items.is_empty());
        assert!(!page.has_next);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Walking pages via `has_next` visits every row exactly once, in order.
        #[test]
        fn pages_concatenate_to_the_full_list(
            len in 0usize..60,
            per_page in 1usize..12,
        ) {
            let rows: Vec<u32> = (0..len as u32).collect();
            let mut seen = Vec::new();
            let mut page = 1i64;
            loop {
                let p = fetch(&rows, PageRequest::new(page, per_page).unwrap());
                prop_assert_eq!(p.has_prev, page > 1);
                seen.extend(p.items.iter().copied());
                if !p.has_next {
                    break;
                }
                page += 1;
            }
            prop_assert_eq!(seen, rows);
        }
    }
}
