//! Catalog view engine.
//!
//! A pure pipeline from `(catalog snapshot, filter state)` to the visible
//! page: search, category filter, price bucket, sort, pagination. The
//! category list and the windowed page-number list for the pagination
//! controls are derived here as well.

use rust_decimal::Decimal;
use serde::Serialize;

use urban_shoes_core::ProductRecord;

/// Products shown per page.
pub const PAGE_SIZE: usize = 10;

/// Sentinel category matching every product.
pub const ALL_CATEGORIES: &str = "All";

/// Price filter buckets offered by the shop UI.
///
/// Buckets are mutually exclusive. Boundary operators, for a price `p`:
/// `Under100` is `p < 100`; `From100To150` is `100 <= p <= 150`;
/// `From150To200` is `150 < p <= 200`; `Over200` is `p > 200`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceBucket {
    #[default]
    All,
    Under100,
    From100To150,
    From150To200,
    Over200,
}

impl PriceBucket {
    /// Parse the query-string token; anything unrecognized passes all.
    #[must_use]
    pub fn from_query(token: &str) -> Self {
        match token {
            "under-100" => Self::Under100,
            "100-150" => Self::From100To150,
            "150-200" => Self::From150To200,
            "200+" => Self::Over200,
            _ => Self::All,
        }
    }

    /// Whether a price falls inside this bucket.
    #[must_use]
    pub fn contains(self, price: Decimal) -> bool {
        match self {
            Self::All => true,
            Self::Under100 => price < Decimal::from(100),
            Self::From100To150 => price >= Decimal::from(100) && price <= Decimal::from(150),
            Self::From150To200 => price > Decimal::from(150) && price <= Decimal::from(200),
            Self::Over200 => price > Decimal::from(200),
        }
    }
}

/// Sort orders offered by the shop UI.
///
/// `FeedOrder` keeps the order products arrived in; it is also the fallback
/// for unrecognized query tokens. All sorts are stable, so products that
/// compare equal keep their feed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    FeedOrder,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    StockAsc,
}

impl SortKey {
    /// Parse the query-string token; anything unrecognized is feed order.
    #[must_use]
    pub fn from_query(token: &str) -> Self {
        match token {
            "price-low" => Self::PriceAsc,
            "price-high" => Self::PriceDesc,
            "name-asc" => Self::NameAsc,
            "name-desc" => Self::NameDesc,
            "stock-low" => Self::StockAsc,
            _ => Self::FeedOrder,
        }
    }

    fn apply(self, products: &mut [ProductRecord]) {
        match self {
            Self::FeedOrder => {}
            Self::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price)),
            Self::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price)),
            Self::NameAsc => products.sort_by(|a, b| a.name.cmp(&b.name)),
            Self::NameDesc => products.sort_by(|a, b| b.name.cmp(&a.name)),
            Self::StockAsc => products.sort_by(|a, b| a.stock.cmp(&b.stock)),
        }
    }
}

/// Filter state for one shop view session.
///
/// Never persisted. Changing anything except the page resets the page to 1.
#[derive(Debug, Clone, Default)]
pub struct ViewFilterState {
    search: String,
    category: Option<String>,
    price: PriceBucket,
    sort: SortKey,
    page: u32,
}

impl ViewFilterState {
    /// Fresh state: no filters, feed order, page 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            search: String::new(),
            category: None,
            price: PriceBucket::All,
            sort: SortKey::FeedOrder,
            page: 1,
        }
    }

    /// Current page, 1-based.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Set the search text. Resets the page.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Set the category filter; `"All"` (or empty) clears it. Resets the page.
    pub fn set_category(&mut self, category: &str) {
        self.category = if category.is_empty() || category == ALL_CATEGORIES {
            None
        } else {
            Some(category.to_owned())
        };
        self.page = 1;
    }

    /// Set the price bucket. Resets the page.
    pub fn set_price(&mut self, price: PriceBucket) {
        self.price = price;
        self.page = 1;
    }

    /// Set the sort order. Resets the page.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.page = 1;
    }

    /// Request a page change.
    ///
    /// Out-of-range requests are rejected, not clamped: the method returns
    /// `false` and the current page is unchanged.
    pub fn set_page(&mut self, page: u32, total_pages: u32) -> bool {
        if page == 0 || page > total_pages {
            return false;
        }
        self.page = page;
        true
    }
}

/// One token in the pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    /// A concrete page number.
    Page(u32),
    /// An ellipsis between page-number runs.
    Gap,
}

impl Serialize for PageLink {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(page) => serializer.serialize_u32(*page),
            Self::Gap => serializer.serialize_str("..."),
        }
    }
}

/// The visible page produced by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    /// Products on this page, in pipeline order.
    pub items: Vec<ProductRecord>,
    /// The page actually shown (the requested page clamped into range).
    pub page: u32,
    /// Number of pages after filtering. At least 1, even when empty.
    pub total_pages: u32,
    /// Number of products that survived the filters.
    pub filtered_count: usize,
}

/// Run the full pipeline: search, category, price bucket, sort, paginate.
#[must_use]
pub fn visible_page(products: &[ProductRecord], filter: &ViewFilterState) -> PageView {
    let mut filtered: Vec<ProductRecord> = products
        .iter()
        .filter(|product| matches_search(product, &filter.search))
        .filter(|product| {
            filter
                .category
                .as_ref()
                .is_none_or(|category| &product.category == category)
        })
        .filter(|product| filter.price.contains(product.price))
        .cloned()
        .collect();

    filter.sort.apply(&mut filtered);

    let filtered_count = filtered.len();
    let total_pages = page_count(filtered_count);
    let page = filter.page().min(total_pages);

    let start = usize::try_from(page - 1).unwrap_or(0) * PAGE_SIZE;
    let items = filtered
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();

    PageView {
        items,
        page,
        total_pages,
        filtered_count,
    }
}

/// Number of pages for a filtered count. Never zero.
#[must_use]
pub fn page_count(filtered_count: usize) -> u32 {
    let pages = filtered_count.div_ceil(PAGE_SIZE);
    u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
}

/// Distinct categories observed in the snapshot, prefixed with `"All"`.
///
/// Derived from the live snapshot, so it must be recomputed whenever the
/// snapshot changes. First-seen order is preserved.
#[must_use]
pub fn categories(products: &[ProductRecord]) -> Vec<String> {
    let mut result = vec![ALL_CATEGORIES.to_owned()];
    for product in products {
        if !result.contains(&product.category) {
            result.push(product.category.clone());
        }
    }
    result
}

/// Page-number tokens for the pagination control.
///
/// Seven or fewer pages are listed in full. Otherwise the list is windowed:
/// near the start `1..=5 … last`, near the end `1 … last-4..=last`, and in
/// the middle `1 … current-1..=current+1 … last`.
#[must_use]
pub fn page_links(current: u32, total: u32) -> Vec<PageLink> {
    if total <= 7 {
        return (1..=total).map(PageLink::Page).collect();
    }

    let mut links = Vec::with_capacity(9);
    if current <= 3 {
        links.extend((1..=5).map(PageLink::Page));
        links.push(PageLink::Gap);
        links.push(PageLink::Page(total));
    } else if current >= total - 2 {
        links.push(PageLink::Page(1));
        links.push(PageLink::Gap);
        links.extend((total - 4..=total).map(PageLink::Page));
    } else {
        links.push(PageLink::Page(1));
        links.push(PageLink::Gap);
        links.extend((current - 1..=current + 1).map(PageLink::Page));
        links.push(PageLink::Gap);
        links.push(PageLink::Page(total));
    }
    links
}

fn matches_search(product: &ProductRecord, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    product
        .name
        .to_lowercase()
        .contains(&search.to_lowercase())
}
