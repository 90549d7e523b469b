//! HTTP route modules, one per ERP module.
//!
//! Handlers stay thin: extract, check the caller's role, call one
//! repository method, wrap the result in `Json`.

pub mod auth;
pub mod dashboard;
pub mod finance;
pub mod health;
pub mod hr;
pub mod inventory;
pub mod notifications;
pub mod procurement;
pub mod projects;
pub mod records;
pub mod sales;
pub mod search;

use keystone_core::PageRequest;
use serde::{Deserialize, Serialize};

/// A document header with its child rows, for detail routes.
#[derive(Debug, Serialize)]
pub struct Detail<T, I> {
    #[serde(flatten)]
    pub header: T,
    pub items: Vec<I>,
}

/// `?page=N&per_page=M` on list routes.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn request(&self, default_per_page: i64) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(default_per_page),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let request = PageQuery::default().request(20);
        assert_eq!(request, PageRequest::new(1, 20));

        let request = PageQuery {
            page: Some(3),
            per_page: None,
        }
        .request(15);
        assert_eq!(request.offset(), 30);
    }
}
