use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) const fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PageQuery {
    #[serde(default)]
    #[validate(range(min = 0))]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub(crate) limit: i64,
}

impl PageQuery {
    pub(crate) fn checked(self) -> Result<Self, ApiError> {
        self.validate()
            .map_err(|e| ApiError::BadRequest(format!("Invalid pagination parameters: {e}")))?;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}
