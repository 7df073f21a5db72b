// Paginator - fixed-size, 1-indexed page slicing over an ordered feed

use serde::{Deserialize, Serialize};

/// Raw `?page=` query string. Anything that does not parse as a positive
/// number falls back to the first page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn number(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: usize,
}

impl Paginator {
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    /// `(limit, offset)` for page `number`, for pushing the slice into SQL.
    pub fn window(&self, number: usize) -> (usize, usize) {
        let number = number.max(1);
        (self.per_page, (number - 1).saturating_mul(self.per_page))
    }

    pub fn num_pages(&self, count: usize) -> usize {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Wrap a slice that was already fetched with [`Paginator::window`].
    pub fn assemble<T>(&self, object_list: Vec<T>, number: usize, count: usize) -> Page<T> {
        Page {
            object_list,
            number: number.max(1),
            per_page: self.per_page,
            count,
            num_pages: self.num_pages(count),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub per_page: usize,
    pub count: usize,
    pub num_pages: usize,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous().then(|| (self.number - 1).min(self.num_pages))
    }
}

/// `page_obj` as handed to the rendering layer.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext<T> {
    #[serde(flatten)]
    pub page: Page<T>,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
}

impl<T> From<Page<T>> for PageContext<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            has_next: page.has_next(),
            has_previous: page.has_previous(),
            next_page_number: page.next_page_number(),
            previous_page_number: page.previous_page_number(),
            page,
        }
    }
}
