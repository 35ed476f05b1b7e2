//! Shared response shapes for the `/api` handlers.

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub current_page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

pub fn paginate<T: Serialize>(items: Vec<T>, page: i64, size: i64, total_items: i64) -> PageResponse<T> {
    let total_pages = if total_items == 0 { 0 } else { (total_items + size - 1) / size };
    PageResponse {
        items,
        current_page: page,
        page_size: size,
        total_pages,
        total_items,
        has_next: page + 1 < total_pages,
        has_previous: page > 0,
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub query: Option<String>,
}
