use datalab_plugin::{InlineMutator, PluginError, PluginResult, Table};
use datalab_schema::ValueTree;
use tracing::info;

use super::target_columns;

/// Parameter naming the independent column
const X_COLUMN: &str = "x_column";

/// Parameter switching fit logging on
const PRINT_FIT: &str = "print_fit";

/// Least-squares line with standard errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Slope
    pub slope: f64,
    /// Intercept
    pub intercept: f64,
    /// Standard error of the slope
    pub slope_err: f64,
    /// Standard error of the intercept
    pub intercept_err: f64,
}

impl LineFit {
    /// Ordinary least squares of `y` against `x`
    ///
    /// Standard errors are zero for exactly two points.
    ///
    /// # Errors
    /// Returns error for fewer than two points or a constant `x`
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[f64], y: &[f64]) -> PluginResult<Self> {
        let n = x.len();
        if n < 2 || y.len() != n {
            return Err(PluginError::failed("linear fit needs at least two points"));
        }
        let count = n as f64;
        let x_mean = x.iter().sum::<f64>() / count;
        let y_mean = y.iter().sum::<f64>() / count;

        let (sxx, sxy) = x.iter().zip(y).fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
            let dx = xi - x_mean;
            (sxx + dx * dx, sxy + dx * (yi - y_mean))
        });
        if sxx <= 0.0 {
            return Err(PluginError::failed("linear fit needs more than one distinct x value"));
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let (slope_err, intercept_err) = if n > 2 {
            let residual: f64 = x
                .iter()
                .zip(y)
                .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
                .sum();
            let slope_err = (residual / (count - 2.0) / sxx).sqrt();
            (slope_err, slope_err * (sxx / count + x_mean * x_mean).sqrt())
        } else {
            (0.0, 0.0)
        };

        Ok(Self {
            slope,
            intercept,
            slope_err,
            intercept_err,
        })
    }

    /// Fitted value at `x`
    #[inline]
    #[must_use]
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Format a value with its uncertainty in parentheses, e.g. `1.235(12)`
///
/// The uncertainty keeps one significant digit, or two when it starts
/// with `1` followed by a non-zero digit; the value is rounded to match.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn with_uncertainty(value: f64, err: f64) -> String {
    if err == 0.0 || !err.is_finite() {
        return format!("{value}");
    }
    let err = err.abs();
    let magnitude = err.log10().floor() as i32;
    let scaled = err * 10f64.powi(-magnitude);
    let leading = scaled.trunc();
    let second = (10.0 * scaled - 10.0 * leading).trunc();
    let precision = if leading == 1.0 && second != 0.0 { 2 } else { 1 };

    let decimals = precision - (magnitude + 1);
    let err_out = round_to(err, decimals);
    let places = decimals.max(0) as usize;
    let err_text = if err_out < 1.0 {
        format!("{:.0}", (err_out * 10f64.powi(decimals)).round())
    } else {
        format!("{err_out:.places$}")
    };
    format!("{:.places$}({err_text})", round_to(value, decimals))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (value * scale).round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (value / scale).round() * scale
    }
}

/// Replaces target columns with a least-squares line against `x_column`
#[derive(Debug, Clone)]
pub struct LinearFit {
    x_column: String,
    columns: Vec<String>,
    print_fit: bool,
}

impl LinearFit {
    /// Build from bound parameters
    ///
    /// # Errors
    /// Returns [`PluginError::InvalidParam`] if `x_column` is not set
    pub fn from_params(params: &ValueTree) -> PluginResult<Self> {
        let x_column = params
            .text(X_COLUMN)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PluginError::invalid_param(X_COLUMN, "Invalid X-axis Column supplied: none"))?;
        Ok(Self {
            x_column: x_column.to_string(),
            columns: target_columns(params),
            print_fit: params.boolean(PRINT_FIT).unwrap_or(false),
        })
    }
}

impl InlineMutator for LinearFit {
    fn process(&self, mut table: Table) -> PluginResult<Option<Table>> {
        let x = table
            .column(&self.x_column)
            .ok_or_else(|| {
                PluginError::invalid_param(
                    X_COLUMN,
                    format!("Invalid X-axis Column supplied: {}", self.x_column),
                )
            })?
            .to_vec();

        for name in &self.columns {
            let fit = LineFit::fit(&x, table.require(name)?)?;
            table.insert_column(name.clone(), x.iter().map(|&xi| fit.at(xi)).collect())?;
            if self.print_fit {
                info!(
                    column = %name,
                    x_column = %self.x_column,
                    slope = %with_uncertainty(fit.slope, fit.slope_err),
                    intercept = %with_uncertainty(fit.intercept, fit.intercept_err),
                    "linear fit"
                );
            } else {
                info!(column = %name, x_column = %self.x_column, "applied linear fit");
            }
        }
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalab_schema::Scalar;
    use pretty_assertions::assert_eq;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn uncertainty_formatting() {
        assert_eq!(with_uncertainty(1.23456, 0.0123), "1.235(12)");
        assert_eq!(with_uncertainty(12.3, 2.3), "12(2)");
        assert_eq!(with_uncertainty(1234.0, 56.0), "1230(60)");
        assert_eq!(with_uncertainty(0.5, 0.0), "0.5");
    }

    #[test]
    fn exact_line_has_no_error() {
        let fit = LineFit::fit(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 1.0));
        assert!(close(fit.slope_err, 0.0));
    }

    #[test]
    fn standard_errors() {
        let fit = LineFit::fit(&[0.0, 1.0, 2.0, 3.0], &[0.5, 0.5, 2.5, 2.5]).unwrap();
        assert!(close(fit.slope, 0.8));
        assert!(close(fit.intercept, 0.3));
        // SSR = 0.8, Sxx = 5, n = 4
        let slope_err = (0.8_f64 / 2.0 / 5.0).sqrt();
        assert!(close(fit.slope_err, slope_err));
        assert!(close(fit.intercept_err, slope_err * (5.0_f64 / 4.0 + 2.25).sqrt()));
    }

    #[test]
    fn degenerate_inputs_fail() {
        assert!(LineFit::fit(&[1.0], &[1.0]).is_err());
        assert!(LineFit::fit(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
        let two = LineFit::fit(&[0.0, 2.0], &[1.0, 2.0]).unwrap();
        assert!(close(two.slope_err, 0.0));
    }

    #[test]
    fn replaces_targets_with_fit() {
        let params = ValueTree::new()
            .with("x_column", "t")
            .with("target_columns", vec![Scalar::from("V")])
            .with("print_fit", true);
        let table = Table::from_columns([("t", vec![0.0, 1.0, 2.0, 3.0]), ("V", vec![0.5, 0.5, 2.5, 2.5])]).unwrap();

        let out = LinearFit::from_params(&params).unwrap().process(table).unwrap().unwrap();

        let v = out.column("V").unwrap();
        assert!(close(v[0], 0.3));
        assert!(close(v[3], 2.7));
        assert_eq!(out.column("t"), Some(&[0.0, 1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn unknown_x_column_fails() {
        let params = ValueTree::new().with("x_column", "nope");
        let table = Table::from_columns([("t", vec![0.0, 1.0])]).unwrap();
        let err = LinearFit::from_params(&params).unwrap().process(table).unwrap_err();
        assert!(err.to_string().contains("Invalid X-axis Column supplied: nope"));
        assert!(LinearFit::from_params(&ValueTree::new()).is_err());
    }
}
