//! Test support for the Howe Sound forecast workspace: canned upstream
//! bodies, tide CSV generators and float assertions.
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures::marine, write_tide_csv};
//! ```

pub mod fixtures;
pub mod generators;

pub use generators::*;

/// Tolerance used when `assert_approx_eq!` is given no epsilon.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert two numbers are within `epsilon` of each other.
///
/// ```ignore
/// assert_approx_eq!(doc_value, 1013.3);
/// assert_approx_eq!(hour, 14.5, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr) => {
        $crate::assert_approx_eq!($actual, $expected, $crate::DEFAULT_EPSILON)
    };
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        let (actual, expected, epsilon) = ($actual as f64, $expected as f64, $epsilon as f64);
        if !((actual - expected).abs() <= epsilon) {
            panic!(
                "assertion failed: {} ≈ {}\n  actual: {:?}\nexpected: {:?} (±{:?})",
                stringify!($actual),
                stringify!($expected),
                actual,
                expected,
                epsilon
            );
        }
    }};
}

/// Like `assert_approx_eq!` for an `Option<f64>` that must be `Some`.
#[macro_export]
macro_rules! assert_some_approx_eq {
    ($actual:expr, $expected:expr) => {
        $crate::assert_some_approx_eq!($actual, $expected, $crate::DEFAULT_EPSILON)
    };
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        match $actual {
            Some(value) => $crate::assert_approx_eq!(value, $expected, $epsilon),
            None => panic!("assertion failed: {} is None", stringify!($actual)),
        }
    }};
}
