use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows(total_rows);
        }

        let next = current_offset + page_size;
        let next_offset = (next < total_rows).then_some(next);
        let prev_offset = (current_offset > 0).then(|| (current_offset - page_size).max(0));

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
        }
    }

    pub fn no_rows(total_rows: i64) -> Self {
        Self {
            rows: vec![],
            total_rows,
            next_offset: None,
            prev_offset: None,
        }
    }
}

pub fn check_offset(offset: i64) -> Result<(), ApiError> {
    if offset < 0 {
        return Err(ApiError::validation("offset", "Must be a non-negative number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_previous() {
        let page = PageContext::from_rows(vec![1, 2, 3], 7, 3, 0);
        assert_eq!(page.next_offset, Some(3));
        assert_eq!(page.prev_offset, None);
    }

    #[test]
    fn last_page_has_no_next() {
        let page = PageContext::from_rows(vec![7], 7, 3, 6);
        assert_eq!(page.next_offset, None);
        assert_eq!(page.prev_offset, Some(3));
    }

    #[test]
    fn empty_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, 3, 0);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn negative_offset_is_a_validation_error() {
        assert!(matches!(
            check_offset(-6),
            Err(ApiError::Validation { field: "offset", .. })
        ));
        assert!(check_offset(0).is_ok());
        assert!(check_offset(12).is_ok());
    }
}
