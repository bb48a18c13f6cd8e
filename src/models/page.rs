use crate::constants::{MIN_PAGE_SIZE, PAGE_INDEX_ALL};

/// Which slice of the feedback table a list request reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWindow {
    /// Every record, no LIMIT/OFFSET
    All,
    /// One page of parents, `limit` rows starting at `offset`
    Page { index: i64, limit: i64, offset: i64 },
}

impl PageWindow {
    /// Resolve a requested page against the current record count.
    ///
    /// The page size is raised to [`MIN_PAGE_SIZE`]. [`PAGE_INDEX_ALL`] disables
    /// paging. Any other negative index, or an index past the last page, is
    /// clamped to the last page. An empty table resolves to page 0.
    pub fn resolve(page_index: i64, page_size: i64, total_count: i64) -> Self {
        if page_index == PAGE_INDEX_ALL {
            return PageWindow::All;
        }

        let limit = effective_page_size(page_size);
        let total_count = total_count.max(0);
        let last_page = if total_count == 0 {
            0
        } else {
            (total_count - 1) / limit
        };

        let index = if page_index < 0 || page_index > last_page {
            last_page
        } else {
            page_index
        };

        PageWindow::Page {
            index,
            limit,
            offset: index * limit,
        }
    }

    /// Page index reported back to the client
    pub fn index(&self) -> i64 {
        match self {
            PageWindow::All => PAGE_INDEX_ALL,
            PageWindow::Page { index, .. } => *index,
        }
    }
}

/// Apply the server-side floor to a requested page size
pub fn effective_page_size(page_size: i64) -> i64 {
    page_size.max(MIN_PAGE_SIZE)
}
