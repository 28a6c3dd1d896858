use datalab_plugin::{InlineMutator, PluginError, PluginResult, Table};
use datalab_schema::ValueTree;
use tracing::debug;

use super::target_columns;

/// Window length parameter
const WINDOW_LENGTH: &str = "window_length";

/// Polynomial order parameter
const POLYORDER: &str = "polyorder";

const DEFAULT_WINDOW: usize = 11;
const DEFAULT_POLYORDER: usize = 2;

/// Least-squares weights that evaluate a degree-`order` polynomial fit of
/// a `window`-point sample at offset `t` from the window centre
///
/// `t = 0` gives the smoothing coefficients; edge rows use the offsets of
/// their position in the first or last window.
///
/// # Errors
/// Returns error if `window` is not greater than `order` or the normal
/// equations are singular
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn savgol_coefficients(window: usize, order: usize, t: f64) -> PluginResult<Vec<f64>> {
    if window <= order {
        return Err(PluginError::invalid_param(
            POLYORDER,
            format!("polyorder {order} must be less than window_length {window}"),
        ));
    }
    let half = (window / 2) as f64;
    let offsets: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();
    let terms = order + 1;

    // normal equations (A^T A) z = e(t), A[i][j] = offset_i^j
    let mut matrix = vec![vec![0.0; terms + 1]; terms];
    for (a, row) in matrix.iter_mut().enumerate() {
        for b in 0..terms {
            row[b] = offsets.iter().map(|x| x.powi((a + b) as i32)).sum();
        }
        row[terms] = t.powi(a as i32);
    }
    let z = solve(matrix)?;

    Ok(offsets
        .iter()
        .map(|x| z.iter().enumerate().map(|(j, zj)| zj * x.powi(j as i32)).sum())
        .collect())
}

/// Gaussian elimination with partial pivoting on an augmented matrix
fn solve(mut m: Vec<Vec<f64>>) -> PluginResult<Vec<f64>> {
    let n = m.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < f64::EPSILON {
            return Err(PluginError::failed("savgol normal equations are singular"));
        }
        m.swap(col, pivot);
        for row in col + 1..n {
            let factor = m[row][col] / m[col][col];
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }
    Ok(x)
}

/// Savitzky-Golay smoothing of the target columns
///
/// Edge rows are taken from the polynomial fitted to the first and last
/// full window.
#[derive(Debug, Clone)]
pub struct SavgolFilter {
    columns: Vec<String>,
    window: usize,
    order: usize,
}

impl SavgolFilter {
    /// Build from bound parameters
    ///
    /// # Errors
    /// Returns [`PluginError::InvalidParam`] for a negative or even window,
    /// or a polynomial order not below the window length
    pub fn from_params(params: &ValueTree) -> PluginResult<Self> {
        let window = non_negative(params, WINDOW_LENGTH, DEFAULT_WINDOW)?;
        let order = non_negative(params, POLYORDER, DEFAULT_POLYORDER)?;
        if window % 2 == 0 {
            return Err(PluginError::invalid_param(WINDOW_LENGTH, format!("{window} is not odd")));
        }
        if order >= window {
            return Err(PluginError::invalid_param(
                POLYORDER,
                format!("polyorder {order} must be less than window_length {window}"),
            ));
        }
        Ok(Self {
            columns: target_columns(params),
            window,
            order,
        })
    }

    /// Smooth one series
    ///
    /// # Errors
    /// Returns [`PluginError::InvalidParam`] if the series is shorter than
    /// the window
    #[allow(clippy::cast_precision_loss)]
    pub fn smooth(&self, values: &[f64]) -> PluginResult<Vec<f64>> {
        let n = values.len();
        if self.window > n {
            return Err(PluginError::invalid_param(
                WINDOW_LENGTH,
                format!("{} exceeds the {n} available rows", self.window),
            ));
        }
        let half = self.window / 2;
        let centre = savgol_coefficients(self.window, self.order, 0.0)?;
        let apply = |weights: &[f64], start: usize| -> f64 {
            weights.iter().zip(&values[start..start + self.window]).map(|(w, v)| w * v).sum()
        };

        let mut out = vec![0.0; n];
        for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
            *slot = apply(&centre, i - half);
        }
        for k in 0..half {
            let offset = k as f64 - half as f64;
            let head = savgol_coefficients(self.window, self.order, offset)?;
            let tail = savgol_coefficients(self.window, self.order, -offset)?;
            out[k] = apply(&head, 0);
            out[n - 1 - k] = apply(&tail, n - self.window);
        }
        Ok(out)
    }
}

fn non_negative(params: &ValueTree, name: &str, default: usize) -> PluginResult<usize> {
    match params.integer(name) {
        None => Ok(default),
        Some(v) => usize::try_from(v)
            .map_err(|_| PluginError::invalid_param(name, format!("{v} is negative"))),
    }
}

impl InlineMutator for SavgolFilter {
    fn process(&self, mut table: Table) -> PluginResult<Option<Table>> {
        for name in &self.columns {
            let column = table
                .column_mut(name)
                .ok_or_else(|| PluginError::MissingColumn(name.clone()))?;
            let smoothed = self.smooth(column)?;
            column.copy_from_slice(&smoothed);
            debug!(column = %name, window = self.window, polyorder = self.order, "applied savgol filter");
        }
        Ok(Some(table))
    }
}
