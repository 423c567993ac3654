//! Helpers shared by the unit tests.

/// Returns a `Cursor` over the bytes of a file in the `test_files` folder
/// next to the invoking source file.
macro_rules! include_test_file {
    ($filename:expr) => {{
        let bytes = include_bytes!(concat!("test_files/", $filename)) as &[u8];
        std::io::Cursor::new(bytes)
    }}
}

/// Asserts that two float slices have the same length and are element-wise
/// equal up to `1e-9` (or both NaN).
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        crate::test_utils::assert_approx_eq_fn(&$left[..], &$right[..], file!(), line!())
    };
}

#[inline(never)]
pub(crate) fn assert_approx_eq_fn(left: &[f64], right: &[f64], file: &str, line: u32) {
    let same = left.len() == right.len() && left.iter().zip(right).all(|(&a, &b)| {
        (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-9
    });

    if !same {
        panic!(
            "assert_approx_eq failed:\n  left: `{:?}`,\n right: `{:?}`\nAt: {}:{}",
            left,
            right,
            file,
            line,
        );
    }
}

/// Routes `log` output of the library through the test harness.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
