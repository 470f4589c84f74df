pub mod contact;
pub mod favorite;
pub mod identity;
pub mod message;

use serde::Serialize;

/// One page of results, 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, per_page: i64) -> Self {
        Self {
            items,
            total,
            last_page: last_page(total, per_page),
        }
    }
}

pub fn last_page(total: i64, per_page: i64) -> i64 {
    let per_page = per_page.max(1);
    ((total + per_page - 1) / per_page).max(1)
}

/// Clamps a 1-based page number and returns the matching OFFSET.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1) * per_page
}
