//! Pagination query parsing and page link construction for the catalog.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::product::{Product, ProductStatus};
use crate::errors::ApplicationError;
use crate::storage::{ProductFilter, ProductQuery, SortOrder};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Query string accepted by the product listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<SortOrder>,
    pub category: Option<String>,
    pub availability: Option<bool>,
}

/// `PageQuery` with defaults filled in and bounds checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPage {
    pub limit: u32,
    pub page: u32,
    pub sort: SortOrder,
    pub category: Option<String>,
    pub availability: Option<bool>,
}

impl PageQuery {
    pub fn resolve(
        &self,
        default_limit: u32,
        max_limit: u32,
    ) -> Result<ResolvedPage, ApplicationError> {
        let limit = self.limit.unwrap_or(default_limit);
        if limit == 0 {
            return Err(ApplicationError::validation("limit must be greater than zero"));
        }
        if limit > max_limit {
            return Err(ApplicationError::validation(format!(
                "limit must not exceed {max_limit}"
            )));
        }

        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ApplicationError::validation("page numbers start at 1"));
        }

        // An empty `category=` means no filter; anything else matches exactly.
        let category = self.category.clone().filter(|value| !value.is_empty());

        Ok(ResolvedPage {
            limit,
            page,
            sort: self.sort.unwrap_or_default(),
            category,
            availability: self.availability,
        })
    }
}

impl ResolvedPage {
    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: self.category.clone(),
            status: self.availability.map(ProductStatus::from_availability),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn storage_query(&self) -> ProductQuery {
        ProductQuery {
            filter: self.filter(),
            sort: self.sort,
            skip: self.skip(),
            limit: Some(u64::from(self.limit)),
        }
    }

    /// Link to `page` carrying every other parameter of this query.
    pub fn link(&self, base_path: &str, page: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("limit", &self.limit.to_string());
        serializer.append_pair("page", &page.to_string());
        serializer.append_pair("sort", self.sort.as_str());
        if let Some(category) = &self.category {
            serializer.append_pair("category", category);
        }
        if let Some(availability) = self.availability {
            serializer.append_pair("availability", &availability.to_string());
        }
        format!("{base_path}?{}", serializer.finish())
    }

    /// Builds the page envelope.
    ///
    /// `has_next_page` is "this page came back full", so it also reports a
    /// next page when the last page happens to be exactly full.
    pub fn assemble(
        &self,
        products: Vec<Product>,
        total_count: u64,
        base_path: &str,
    ) -> ProductPage {
        let limit = u64::from(self.limit);
        let total_pages = total_count.div_ceil(limit);
        let has_prev_page = self.page > 1;
        let has_next_page = products.len() as u64 == limit;

        let prev_page = has_prev_page.then(|| self.page - 1);
        let next_page = has_next_page.then(|| self.page.saturating_add(1));

        ProductPage {
            prev_link: prev_page.map(|page| self.link(base_path, page)),
            next_link: next_page.map(|page| self.link(base_path, page)),
            products,
            total_count,
            total_pages,
            page: self.page,
            limit: self.limit,
            has_prev_page,
            has_next_page,
            prev_page,
            next_page,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_count: u64,
    pub total_pages: u64,
    pub page: u32,
    pub limit: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}
