use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::store::{PageRequest, ProductFilter, ProductSort};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.per_page.unwrap_or(20))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

impl From<ProductSortBy> for ProductSort {
    fn from(value: ProductSortBy) -> Self {
        match value {
            ProductSortBy::CreatedAt => ProductSort::CreatedAt,
            ProductSortBy::Price => ProductSort::Price,
            ProductSortBy::Name => ProductSort::Name,
        }
    }
}

/// Flat on purpose: `serde(flatten)` breaks numeric fields in query strings.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.per_page.unwrap_or(20))
    }

    pub fn to_filter(&self) -> ProductFilter {
        ProductFilter {
            name_contains: self
                .q
                .as_ref()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            sort: self.sort_by.map(Into::into).unwrap_or_default(),
            descending: matches!(self.sort_order.unwrap_or(SortOrder::Desc), SortOrder::Desc),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_query_defaults_to_newest_first() {
        let filter = ProductQuery::default().to_filter();
        assert_eq!(filter.sort, ProductSort::CreatedAt);
        assert!(filter.descending);
        assert!(filter.name_contains.is_none());
    }

    #[test]
    fn blank_search_term_is_ignored() {
        let query = ProductQuery {
            q: Some("   ".into()),
            sort_by: Some(ProductSortBy::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let filter = query.to_filter();
        assert!(filter.name_contains.is_none());
        assert_eq!(filter.sort, ProductSort::Price);
        assert!(!filter.descending);
    }
}
