use crate::{auth::Subject, errors::ServiceError, PaginatedResponse};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use uuid::Uuid;

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// One-based page number
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Builds the list envelope from one fetched page
pub fn paginated<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let limit = limit.max(1);
    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    }
}

/// Profile id of a signed-in caller
pub fn signed_in_user(subject: &Subject) -> Result<Uuid, ServiceError> {
    subject
        .user_id
        .ok_or_else(|| ServiceError::Unauthorized("Sign in required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_round_up() {
        let page = paginated(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(paginated::<u8>(vec![], 0, 1, 20).total_pages, 0);
    }

    #[test]
    fn guest_has_no_user_id() {
        assert!(signed_in_user(&Subject::guest()).is_err());
    }
}
