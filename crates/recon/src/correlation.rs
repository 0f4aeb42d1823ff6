//! Pairwise Pearson correlation for the diagnostic numeric columns.

use crate::model::CorrelationMatrix;

/// Correlate every pair of columns. Returns `None` when fewer than two
/// columns are supplied; individual cells are `None` when undefined.
pub fn correlation_matrix(columns: &[(String, Vec<f64>)]) -> Option<CorrelationMatrix> {
    if columns.len() < 2 {
        return None;
    }

    let values = columns
        .iter()
        .map(|(_, xs)| columns.iter().map(|(_, ys)| pearson(xs, ys)).collect())
        .collect();

    Some(CorrelationMatrix {
        columns: columns.iter().map(|(name, _)| name.clone()).collect(),
        values,
    })
}

/// Pearson coefficient over the paired prefix of `xs` and `ys`.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}
