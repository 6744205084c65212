//! Range slicing of match lists.

use pagelink_protocols::Range;

/// Slice `items` the way `Array.prototype.slice(from, to)` would.
///
/// Negative bounds count from the end, out-of-range bounds clamp, and an
/// empty or inverted window yields nothing. Both bounds refer to the full
/// list.
pub fn apply_range<T>(mut items: Vec<T>, range: Option<&Range>) -> Vec<T> {
    let Some(range) = range else {
        return items;
    };
    let len = items.len();
    let start = clamp_index(range.from.unwrap_or(0), len);
    let end = range.to.map_or(len, |to| clamp_index(to, len));
    if start >= end {
        return Vec::new();
    }
    items.truncate(end);
    items.drain(..start);
    items
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { len_i + index } else { index };
    // Clamped into 0..=len, so the cast back is lossless.
    resolved.clamp(0, len_i) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> Vec<u32> {
        vec![0, 1, 2, 3, 4]
    }

    #[test]
    fn test_no_range_is_identity() {
        assert_eq!(apply_range(five(), None), five());
        assert_eq!(apply_range(five(), Some(&Range::default())), five());
    }

    #[test]
    fn test_from_only() {
        assert_eq!(apply_range(five(), Some(&Range::from(2))), vec![2, 3, 4]);
    }

    #[test]
    fn test_from_to_independent_of_length() {
        assert_eq!(apply_range(five(), Some(&Range::between(1, 3))), vec![1, 2]);
        assert_eq!(apply_range(vec![0, 1, 2], Some(&Range::between(1, 3))), vec![1, 2]);
    }

    #[test]
    fn test_negative_and_clamped_bounds() {
        assert_eq!(apply_range(five(), Some(&Range::from(-2))), vec![3, 4]);
        assert_eq!(apply_range(five(), Some(&Range::between(0, -1))), vec![0, 1, 2, 3]);
        assert_eq!(apply_range(five(), Some(&Range::between(3, 100))), vec![3, 4]);
        assert_eq!(apply_range(five(), Some(&Range::from(-100))), five());
    }

    #[test]
    fn test_empty_windows() {
        assert!(apply_range(five(), Some(&Range::between(3, 1))).is_empty());
        assert!(apply_range(five(), Some(&Range::from(7))).is_empty());
        assert!(apply_range(Vec::<u32>::new(), Some(&Range::from(0))).is_empty());
    }
}
