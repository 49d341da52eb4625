//! Naming convention for predictive quantile columns of the target.
//!
//! A quantile column is named `target_` followed by an optional `q` and a decimal
//! number with a fractional part: `target_0.025`, `target_q0.9`.

/// Name of the primary forecast target column.
pub const TARGET_COLUMN: &str = "target";

const QUANTILE_PREFIX: &str = "target_";

/// Parse the quantile level encoded in a column name.
///
/// Returns `None` when the name does not follow the quantile convention.
pub fn parse_target_quantile(name: &str) -> Option<f64> {
    let rest = name.strip_prefix(QUANTILE_PREFIX)?;
    let number = rest.strip_prefix('q').unwrap_or(rest);

    let (whole, fraction) = number.split_once('.')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return None;
    }

    number.parse().ok()
}

/// Select the quantile columns of the target from a set of column names.
///
/// The result is sorted by name and free of duplicates.
pub fn match_target_quantiles<'a, I>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut matched: Vec<String> = columns
        .into_iter()
        .filter(|name| parse_target_quantile(name).is_some())
        .map(str::to_string)
        .collect();
    matched.sort();
    matched.dedup();
    matched
}
