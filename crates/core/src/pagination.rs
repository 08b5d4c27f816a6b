//! Page/offset arithmetic.
//!
//! Pages are 1-based. Page 0 is treated as page 1.

/// Offset of the first item of `page` for the given page size.
#[must_use]
pub const fn skip_for(page: u32, limit: u32) -> u64 {
    (page.saturating_sub(1) as u64) * (limit as u64)
}

/// Slice one page out of `items`.
///
/// Returns `min(limit, max(0, len - skip))` items; pages past the end yield an
/// empty vector.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> Vec<T> {
    let start = usize::try_from(skip_for(page, limit)).unwrap_or(usize::MAX);
    items
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_for() {
        assert_eq!(skip_for(1, 12), 0);
        assert_eq!(skip_for(3, 12), 24);
        assert_eq!(skip_for(0, 12), 0);
    }

    #[test]
    fn test_paginate_lengths() {
        let items: Vec<u32> = (0..30).collect();
        for (page, limit) in [(1_u32, 12_u32), (2, 12), (3, 12), (4, 12), (1, 50), (30, 1), (31, 1)] {
            let n = items.len() as u64;
            let expected = u64::from(limit).min(n.saturating_sub(skip_for(page, limit)));
            assert_eq!(
                paginate(&items, page, limit).len() as u64,
                expected,
                "page {page} limit {limit}"
            );
        }
    }

    #[test]
    fn test_paginate_window_contents() {
        let items: Vec<u32> = (0..30).collect();
        assert_eq!(paginate(&items, 3, 12), (24..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_paginate_past_end_is_empty() {
        let items = vec!['a', 'b', 'c'];
        assert!(paginate(&items, 5, 2).is_empty());
        assert!(paginate(&items, u32::MAX, u32::MAX).is_empty());
    }
}
