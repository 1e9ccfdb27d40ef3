/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use qlearn::assert_interval;
/// let value = 2.0;
/// assert_interval!(value, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`value\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Index of the largest value, ties going to the first occurrence
///
/// Returns `None` for an empty slice. NaN values are never selected over a number.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (ix, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if !(v > b) => {}
            _ if v.is_nan() => {}
            _ => best = Some((ix, v)),
        }
    }
    best.map(|(ix, _)| ix)
}

/// Largest value in the slice, or `None` if it is empty
pub fn max(values: &[f32]) -> Option<f32> {
    values.iter().copied().reduce(f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_breaks_ties_on_first_index() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1), "first of the tied maxima");
        assert_eq!(argmax(&[0.0, 0.0, 0.0]), Some(0), "all equal picks index 0");
        assert_eq!(argmax(&[-2.0, -1.0]), Some(1), "negative values");
        assert_eq!(argmax(&[]), None, "empty slice");
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 1.0]), Some(1), "NaN is never the argmax");
    }

    #[test]
    fn max_of_slice() {
        assert_eq!(max(&[0.5, 2.0, -1.0]), Some(2.0));
        assert_eq!(max(&[]), None);
    }
}
