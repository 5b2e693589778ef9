//! 查询参数校验，失败直接返回 400 响应。

use crate::utils::response::bad_request_error;
use axum::response::Response;
use domain::now_epoch_ms;
use ems_storage::{MAX_QUERY_LIMIT, TimeOrder};

pub const DEFAULT_READING_LIMIT: usize = 1_000;
pub const DEFAULT_EVENT_LIMIT: usize = 100;
pub const DEFAULT_STATS_WINDOW_MS: i64 = 24 * 3_600_000;

/// 可选字段：去除空格，空串视为非法。
pub fn normalize_optional(value: Option<String>, field: &str) -> Result<Option<String>, Response> {
    match value {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(bad_request_error(format!("{field} must not be empty")));
            }
            Ok(Some(trimmed.to_string()))
        }
        None => Ok(None),
    }
}

pub fn parse_order(value: Option<&str>) -> Result<TimeOrder, Response> {
    match value.map(str::trim) {
        None | Some("") => Ok(TimeOrder::Asc),
        Some(value) => TimeOrder::parse(value).ok_or_else(|| bad_request_error("order must be asc|desc")),
    }
}

/// 1..=max，缺省取 `default`。
pub fn parse_limit(value: Option<usize>, default: usize, max: usize) -> Result<usize, Response> {
    match value {
        None => Ok(default),
        Some(limit) if limit == 0 || limit > max => {
            Err(bad_request_error(format!("limit must be within 1..={max}")))
        }
        Some(limit) => Ok(limit),
    }
}

pub fn parse_reading_limit(value: Option<usize>) -> Result<usize, Response> {
    parse_limit(value, DEFAULT_READING_LIMIT, MAX_QUERY_LIMIT)
}

pub fn check_range(from: Option<i64>, to: Option<i64>) -> Result<(), Response> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(bad_request_error("from must not be after to")),
        _ => Ok(()),
    }
}

/// 统计区间：缺省截止到当前时刻，向前 24 小时。
pub fn stats_window(from: Option<i64>, to: Option<i64>) -> Result<(i64, i64), Response> {
    let to = to.unwrap_or_else(now_epoch_ms);
    let from = from.unwrap_or(to - DEFAULT_STATS_WINDOW_MS);
    check_range(Some(from), Some(to))?;
    Ok((from, to))
}
