//! List filters and pagination metadata.

use std::collections::BTreeMap;

use crate::key::KeyPart;

/// Response header carrying the total number of matching records.
pub const TOTAL_ITEMS_HEADER: &str = "x-pagination-totalitems";
/// Response header carrying the page size the server applied.
pub const PAGE_SIZE_HEADER: &str = "x-pagination-pagesize";
/// Response header carrying the page number returned.
pub const PAGE_HEADER: &str = "x-pagination-page";

/// Query parameter names reserved for paging.
pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Key/value constraints for a `list` call.
///
/// Field names are domain (snake_case) names. Keys the server does not
/// recognize are ignored by convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    constraints: BTreeMap<String, String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to records whose parent field equals `parent`.
    pub fn for_parent(field: &str, parent: &KeyPart) -> Self {
        Self::new().with(field, parent)
    }

    pub fn with(mut self, field: &str, value: impl ToString) -> Self {
        self.constraints.insert(field.to_string(), value.to_string());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = Some(page.max(1));
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.constraints.get(field).map(String::as_str)
    }

    pub fn current_page(&self) -> Option<u32> {
        self.page
    }

    pub fn current_page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn is_paged(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }

    /// Query pairs in domain naming, paging parameters last.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .constraints
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(page) = self.page {
            pairs.push((PAGE_PARAM.to_string(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push((PAGE_SIZE_PARAM.to_string(), size.to_string()));
        }
        pairs
    }
}

/// Paging metadata read from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub total_items: u64,
    pub page_size: u32,
    pub page: Option<u32>,
}

impl PageInfo {
    /// Reads pagination headers. Header names are matched lower-case.
    pub fn from_headers(headers: &BTreeMap<String, String>) -> Option<Self> {
        let total_items = headers.get(TOTAL_ITEMS_HEADER)?.trim().parse().ok()?;
        let page_size = headers.get(PAGE_SIZE_HEADER)?.trim().parse().ok()?;
        let page = headers
            .get(PAGE_HEADER)
            .and_then(|v| v.trim().parse().ok());
        Some(Self {
            total_items,
            page_size,
            page,
        })
    }

    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(u64::from(self.page_size))
    }
}

/// One page of a `list` result.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    pub page_info: Option<PageInfo>,
}

impl<R> Page<R> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            page_info: None,
        }
    }
}

impl<R> Default for Page<R> {
    fn default() -> Self {
        Self::empty()
    }
}
