use crate::{Error, Price, Result};

/// `numerator / denominator`, refusing a zero denominator.
///
/// `context` names the quantity for the error. Built-in indicators catch
/// the error and hold their previous output; custom indicators may let it
/// fault them instead.
///
/// # Errors
///
/// [`Error::DivisionSingularity`] when `denominator` is zero.
///
/// # Example
///
/// ```
/// use quantedge_series::{Error, ratio};
///
/// assert_eq!(ratio(3.0, 4.0, "spread"), Ok(0.75));
/// assert_eq!(
///     ratio(3.0, 0.0, "spread"),
///     Err(Error::DivisionSingularity { context: "spread" })
/// );
/// ```
#[inline]
pub fn ratio(numerator: Price, denominator: Price, context: &'static str) -> Result<Price> {
    if denominator == 0.0 {
        return Err(Error::DivisionSingularity { context });
    }

    Ok(numerator / denominator)
}
