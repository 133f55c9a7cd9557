//! Fixed-size pagination.

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number that was requested.
    pub page: u32,
    pub page_size: usize,
    /// Items across all pages.
    pub total_count: usize,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether the requested page is past the end (or before the start).
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        self.page == 0 || (self.page > self.total_pages && self.total_count > 0)
    }

    /// The nearest valid page number for this listing (at least 1).
    #[must_use]
    pub fn clamp_page(&self) -> u32 {
        self.page.clamp(1, self.total_pages.max(1))
    }
}

/// Number of pages needed for `total` items; zero items need zero pages.
#[must_use]
pub fn total_pages(total: usize, page_size: usize) -> u32 {
    u32::try_from(total.div_ceil(page_size.max(1))).unwrap_or(u32::MAX)
}

/// Slice out page `page` (1-based) of `items`.
///
/// Pages past the end, and page 0, come back empty; callers decide whether
/// to clamp with [`Page::clamp_page`]. A page size of 0 is treated as 1.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_count = items.len();

    let skip = (page as usize)
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .unwrap_or(usize::MAX);

    Page {
        items: items.into_iter().skip(skip).take(page_size).collect(),
        page,
        page_size,
        total_count,
        total_pages: total_pages(total_count, page_size),
    }
}
