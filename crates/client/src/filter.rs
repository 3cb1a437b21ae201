//! Booking list filters and cache-key construction.
//!
//! A filter maps to exactly one cache key: `/api/bookings` plus a query string
//! whose parameters appear in field-declaration order. Changing a filter
//! produces a different key; existing entries are never rewritten in place.

use bookingsync_core::{BookingId, BookingStatus, BookingType};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Booking list route; also the prefix shared by every list cache key.
pub const BOOKINGS_ROUTE: &str = "/api/bookings";

/// Route of a single booking, with the id percent-encoded as one segment.
pub fn booking_path(id: &BookingId) -> String {
    let segment: String = form_urlencoded::byte_serialize(id.as_str().as_bytes()).collect();
    format!("{BOOKINGS_ROUTE}/{segment}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// List filter.
///
/// Either the calendar shorthand (`month` + `take`) or structured filters.
/// When `month` is set it wins and every structured field is ignored, which
/// keeps calendar callers to a one-liner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    pub month: Option<String>,
    pub take: Option<u32>,

    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    #[serde(rename = "type")]
    pub booking_type: Option<BookingType>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub client: Option<String>,
    pub keyword: Option<String>,
}

impl BookingFilter {
    /// Every booking, no query string.
    pub fn all() -> Self {
        Self::default()
    }

    /// Calendar shorthand for a `YYYY-MM` month.
    pub fn month(month: impl Into<String>) -> Self {
        Self {
            month: Some(month.into()),
            ..Self::default()
        }
    }

    pub fn with_take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(order);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_date_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.date_from = Some(from.into());
        self.date_to = Some(to.into());
        self
    }

    /// Query parameters in emission order.
    pub fn query_pairs(&self, default_take: u32) -> Vec<(&'static str, String)> {
        if let Some(month) = self.month.as_deref().filter(|m| !m.is_empty()) {
            return vec![
                ("month", month.to_string()),
                ("take", self.take.unwrap_or(default_take).to_string()),
            ];
        }

        let mut pairs = Vec::new();
        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(v) = value {
                pairs.push((name, v));
            }
        };

        push("page", self.page.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("sortBy", self.sort_by.clone());
        push("sortOrder", self.sort_order.map(|o| o.as_str().to_string()));
        push("type", self.booking_type.map(|t| t.as_str().to_string()));
        push("status", self.status.map(|s| s.as_str().to_string()));
        push("dateFrom", self.date_from.clone());
        push("dateTo", self.date_to.clone());
        push("startDate", self.start_date.clone());
        push("endDate", self.end_date.clone());
        push("client", self.client.clone());
        push("keyword", self.keyword.clone());
        push("take", self.take.map(|v| v.to_string()));

        pairs
    }

    /// Fully-qualified request path used as the cache key.
    pub fn cache_key(&self, default_take: u32) -> String {
        let pairs = self.query_pairs(default_take);
        if pairs.is_empty() {
            return BOOKINGS_ROUTE.to_string();
        }

        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &pairs {
            query.append_pair(name, value);
        }
        format!("{BOOKINGS_ROUTE}?{}", query.finish())
    }
}
