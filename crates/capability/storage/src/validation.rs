//! 查询参数校验
//!
//! - ensure_time_range：起止时间顺序
//! - clamp_limit：结果条数上限

use crate::error::StorageError;
use crate::models::ReadingQuery;

/// 单次查询最多返回的条数
pub const MAX_QUERY_LIMIT: usize = 10_000;

pub fn ensure_time_range(from_ms: Option<i64>, to_ms: Option<i64>) -> Result<(), StorageError> {
    if let (Some(from), Some(to)) = (from_ms, to_ms) {
        if from > to {
            return Err(StorageError::new("from must not be after to"));
        }
    }
    Ok(())
}

/// 0 或超限时取上限
pub fn clamp_limit(limit: usize) -> usize {
    if limit == 0 || limit > MAX_QUERY_LIMIT {
        MAX_QUERY_LIMIT
    } else {
        limit
    }
}

/// 校验并规范化读数查询
pub fn sanitize_query(mut query: ReadingQuery) -> Result<ReadingQuery, StorageError> {
    ensure_time_range(query.from_ms, query.to_ms)?;
    query.limit = clamp_limit(query.limit);
    Ok(query)
}
