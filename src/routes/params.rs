use serde::Deserialize;
use utoipa::ToSchema;

/// Query parameters shared by the admin list endpoints. Page sizes are fixed
/// per resource, so only the page number is caller-controlled.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminListQuery {
    pub page: Option<i64>,
    /// Case-insensitive substring match on name / crop name.
    pub keyword: Option<String>,
    /// Exact status filter (products only).
    pub status: Option<String>,
}

impl AdminListQuery {
    pub fn page_offset(&self, page_size: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        (page, (page - 1) * page_size)
    }
}
