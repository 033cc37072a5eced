/// Compares two byte slices for equality in constant time to prevent timing attacks.
#[must_use]
pub fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut c = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        c |= x ^ y;
    }
    c == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::equal(b"issued-state", b"issued-state", true)]
    #[case::different(b"issued-state", b"issued-stat3", false)]
    #[case::different_length(b"issued-state", b"issued", false)]
    #[case::empty(b"", b"", true)]
    fn test_constant_time_equal(#[case] a: &[u8], #[case] b: &[u8], #[case] want: bool) {
        assert_eq!(constant_time_equal(a, b), want);
    }
}
