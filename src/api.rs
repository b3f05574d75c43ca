use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// Result body for writes, shaped like a document-store driver result so the
/// existing clients can keep reading `insertedId` / `modifiedCount` etc.
#[derive(Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<u64>,
}

impl WriteResult {
    pub fn inserted(id: i64) -> Self {
        WriteResult {
            acknowledged: true,
            inserted_id: Some(id),
            ..Default::default()
        }
    }

    pub fn updated(matched: u64, modified: u64) -> Self {
        WriteResult {
            acknowledged: true,
            matched_count: Some(matched),
            modified_count: Some(modified),
            ..Default::default()
        }
    }

    pub fn deleted(count: u64) -> Self {
        WriteResult {
            acknowledged: true,
            deleted_count: Some(count),
            ..Default::default()
        }
    }
}

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl PaginationParams {
    /// `None` when the caller asked for neither page nor size, meaning "everything".
    pub fn into_page(self) -> Option<Page> {
        if self.page.is_none() && self.size.is_none() {
            return None;
        }
        let page = self.page.unwrap_or(0);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        Some(Page {
            limit: size as i64,
            offset: page as i64 * size as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_optional_and_clamped() {
        let none = PaginationParams { page: None, size: None };
        assert_eq!(none.into_page(), None);

        let big = PaginationParams { page: Some(2), size: Some(1000) };
        assert_eq!(big.into_page(), Some(Page { limit: 100, offset: 200 }));

        let zero = PaginationParams { page: Some(0), size: Some(0) };
        assert_eq!(zero.into_page(), Some(Page { limit: 1, offset: 0 }));
    }

    #[test]
    fn write_result_skips_empty_counts() {
        let json = serde_json::to_value(WriteResult::updated(1, 0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"acknowledged": true, "matchedCount": 1, "modifiedCount": 0})
        );
    }
}
