//! Filtering and pagination of per-document results.

use crate::invoice::DocumentReport;

/// Which documents to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewFilter {
    #[default]
    All,
    /// Affirmative verdicts only.
    Correct,
    /// Documents that must be reviewed.
    Incorrect,
}

impl ReviewFilter {
    pub fn matches(&self, document: &DocumentReport) -> bool {
        let affirmative = document.classification.color.is_affirmative();
        match self {
            Self::All => true,
            Self::Correct => affirmative,
            Self::Incorrect => !affirmative,
        }
    }
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// Items on this page.
    pub items: &'a [T],
    /// 1-based page number, 0 when there are no pages.
    pub number: usize,
    pub total_pages: usize,
    /// Number of items across all pages.
    pub total: usize,
    offset: usize,
}

impl<T> Page<'_, T> {
    /// 1-based position of the first item on the page.
    pub fn start(&self) -> usize {
        if self.items.is_empty() { 0 } else { self.offset + 1 }
    }

    /// 1-based position of the last item on the page.
    pub fn end(&self) -> usize {
        self.offset + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Slice out page `page` (1-based, clamped to the valid range).
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);

    if total_pages == 0 {
        return Page {
            items: &[],
            number: 0,
            total_pages: 0,
            total: 0,
            offset: 0,
        };
    }

    let number = page.clamp(1, total_pages);
    let offset = (number - 1) * per_page;
    let end = (offset + per_page).min(items.len());

    Page {
        items: &items[offset..end],
        number,
        total_pages,
        total: items.len(),
        offset,
    }
}
