use serde::{Deserialize, Serialize};

use super::{error::TypeError, form::Form};
use crate::constants::MAX_PAGE_SIZE;

/// Row window selected by the 1-based `page` and `limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, TypeError> {
        let limit = form
            .get_number::<i64>("limit")?
            .unwrap_or(default_limit)
            .clamp(1, MAX_PAGE_SIZE);
        let page = form.get_number::<i64>("page")?.unwrap_or(1);

        let offset = page
            .checked_sub(1)
            .filter(|skipped| *skipped >= 0)
            .and_then(|skipped| skipped.checked_mul(limit))
            .ok_or_else(|| TypeError::new("Invalid page"))?;

        Ok(Self { limit, offset })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub page_size: i64,
    pub offset: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        let next_offset = current_offset
            .checked_add(page_size)
            .filter(|next| !rows.is_empty() && *next < total_rows);
        let prev_offset = if current_offset > 0 {
            Some(current_offset.saturating_sub(page_size).max(0))
        } else {
            None
        };

        Self {
            rows,
            total_rows,
            page_size,
            offset: current_offset,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows(page_size: i64, current_offset: i64) -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            page_size,
            offset: current_offset,
            next_offset: None,
            prev_offset: None,
        }
    }
}
