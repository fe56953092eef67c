//! Shop route handlers: catalog listing and product detail.
//!
//! The listing handler is a thin shell around the catalog view engine: query
//! parameters become a [`ViewFilterState`], the live snapshot goes through
//! the pipeline, and the result is returned as JSON for the shop UI.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use urban_shoes_core::{ProductId, ProductRecord};

use crate::catalog::view::{self, PageLink, PriceBucket, SortKey, ViewFilterState};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Shop listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    /// Search text matched against product names.
    pub q: Option<String>,
    /// Category filter; "All" or absent passes everything.
    pub category: Option<String>,
    /// Price bucket token (e.g., "under-100", "200+").
    pub price: Option<String>,
    /// Sort token (e.g., "price-low", "name-desc").
    pub sort: Option<String>,
    /// Requested page, 1-based.
    pub page: Option<u32>,
}

/// Shop listing response.
#[derive(Debug, Serialize)]
pub struct ShopPageResponse {
    /// True until the feed has delivered its first snapshot.
    pub loading: bool,
    /// User-facing feed error, if the catalog subscription is failing.
    pub error: Option<String>,
    pub products: Vec<ProductRecord>,
    pub page: u32,
    pub total_pages: u32,
    pub filtered_count: usize,
    pub page_links: Vec<PageLink>,
    pub categories: Vec<String>,
}

/// Shop listing: filter, sort and paginate the live catalog snapshot.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<Json<ShopPageResponse>> {
    let snapshot = state.catalog_snapshot();

    let mut filter = ViewFilterState::new();
    if let Some(q) = query.q {
        filter.set_search(q);
    }
    if let Some(category) = query.category.as_deref() {
        filter.set_category(category);
    }
    if let Some(price) = query.price.as_deref() {
        filter.set_price(PriceBucket::from_query(price));
    }
    if let Some(sort) = query.sort.as_deref() {
        filter.set_sort(SortKey::from_query(sort));
    }

    let mut page_view = view::visible_page(&snapshot.products, &filter);

    if let Some(page) = query.page {
        if !filter.set_page(page, page_view.total_pages) {
            return Err(AppError::BadRequest(format!(
                "page {page} is out of range (1..={})",
                page_view.total_pages
            )));
        }
        page_view = view::visible_page(&snapshot.products, &filter);
    }

    Ok(Json(ShopPageResponse {
        loading: snapshot.is_loading(),
        error: snapshot.error().map(ToOwned::to_owned),
        page: page_view.page,
        total_pages: page_view.total_pages,
        filtered_count: page_view.filtered_count,
        page_links: view::page_links(page_view.page, page_view.total_pages),
        categories: view::categories(&snapshot.products),
        products: page_view.items,
    }))
}

/// Product detail: look up one product in the live snapshot.
#[instrument(skip(state), fields(id = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductRecord>> {
    let snapshot = state.catalog_snapshot();
    let id = ProductId::new(id);

    snapshot
        .find(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}
