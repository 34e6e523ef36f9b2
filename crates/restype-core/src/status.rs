//! Status-code families used to partition a route's declared responses.
//!
//! Declared keys are split into "successful" and "error" by convention, not by a
//! structural tag on the route.

use std::ops::RangeInclusive;

/// Successful statuses a route may declare
pub const SUCCESSFUL: RangeInclusive<u16> = 200..=207;

/// Error statuses a route may declare (sorted)
pub const ERROR_CODES: &[u16] = &[
    400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 417, 418,
    421, 422, 423, 424, 428, 429, 431, 451, 500, 501, 502, 503, 504, 505, 506, 507, 508, 510,
    511,
];

/// Whether `status` belongs to the successful family
pub fn is_successful(status: u16) -> bool {
    SUCCESSFUL.contains(&status)
}

/// Whether `status` belongs to the error family
pub fn is_error(status: u16) -> bool {
    ERROR_CODES.binary_search(&status).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families() {
        assert!(is_successful(200));
        assert!(is_successful(204));
        assert!(!is_successful(208));
        assert!(!is_successful(301));

        assert!(is_error(400));
        assert!(is_error(404));
        assert!(is_error(511));
        assert!(!is_error(416));
        assert!(!is_error(200));
    }

    #[test]
    fn test_error_codes_sorted() {
        assert!(ERROR_CODES.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
