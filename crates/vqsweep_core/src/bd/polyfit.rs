//! Cubic least-squares fitting with analytic integration.
//!
//! Coefficients are stored ascending (`c[0] + c[1]x + c[2]x^2 + c[3]x^3`).
//! The fit solves the 4x4 normal equations with partial-pivot Gaussian
//! elimination; a singular system yields `None`.

/// Fit a cubic polynomial to `(x, y)` samples. Needs at least 4 points.
pub fn fit_cubic(x: &[f64], y: &[f64]) -> Option<[f64; 4]> {
    if x.len() != y.len() || x.len() < 4 {
        return None;
    }

    // Power sums for the normal-equation matrix and right-hand side.
    let mut sums = [0.0f64; 7];
    for &xi in x {
        let mut p = 1.0;
        for sum in sums.iter_mut() {
            *sum += p;
            p *= xi;
        }
    }
    let mut rhs = [0.0f64; 4];
    for (&xi, &yi) in x.iter().zip(y) {
        let mut p = 1.0;
        for r in rhs.iter_mut() {
            *r += yi * p;
            p *= xi;
        }
    }

    let mut matrix = [[0.0f64; 5]; 4];
    for (i, row) in matrix.iter_mut().enumerate() {
        for j in 0..4 {
            row[j] = sums[i + j];
        }
        row[4] = rhs[i];
    }

    solve_augmented(&mut matrix)
}

/// Gaussian elimination with partial pivoting on a 4x5 augmented matrix.
fn solve_augmented(m: &mut [[f64; 5]; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot_row = (col..4).max_by(|&a, &b| {
            m[a][col]
                .abs()
                .partial_cmp(&m[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if m[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot_row);
        for row in (col + 1)..4 {
            let factor = m[row][col] / m[col][col];
            for k in col..5 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut coeffs = [0.0f64; 4];
    for row in (0..4).rev() {
        let mut acc = m[row][4];
        for col in (row + 1)..4 {
            acc -= m[row][col] * coeffs[col];
        }
        coeffs[row] = acc / m[row][row];
    }
    if coeffs.iter().all(|c| c.is_finite()) {
        Some(coeffs)
    } else {
        None
    }
}

/// Evaluate an ascending-coefficient polynomial at `x`.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Definite integral of a cubic over `[a, b]` via the antiderivative.
pub fn integrate_cubic(coeffs: &[f64; 4], a: f64, b: f64) -> f64 {
    let antiderivative = [
        0.0,
        coeffs[0],
        coeffs[1] / 2.0,
        coeffs[2] / 3.0,
        coeffs[3] / 4.0,
    ];
    polyval(&antiderivative, b) - polyval(&antiderivative, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_through_four_points() {
        // y = 2x^3 - x + 5
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&v| 2.0 * v * v * v - v + 5.0).collect();
        let coeffs = fit_cubic(&x, &y).unwrap();
        assert!((coeffs[0] - 5.0).abs() < 1e-6);
        assert!((coeffs[1] + 1.0).abs() < 1e-6);
        assert!(coeffs[2].abs() < 1e-6);
        assert!((coeffs[3] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn least_squares_over_more_points() {
        // noiseless quadratic, 6 samples
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|&v| 3.0 * v * v + 1.0).collect();
        let coeffs = fit_cubic(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((polyval(&coeffs, *xi) - yi).abs() < 1e-6);
        }
    }

    #[test]
    fn degenerate_x_is_singular() {
        let x = [2.0, 2.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert!(fit_cubic(&x, &y).is_none());
    }

    #[test]
    fn too_few_points_rejected() {
        assert!(fit_cubic(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn integral_of_constant() {
        let coeffs = [2.0, 0.0, 0.0, 0.0];
        assert!((integrate_cubic(&coeffs, 1.0, 4.0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn integral_of_cubic_matches_closed_form() {
        // integral of x^3 over [0, 2] is 4
        let coeffs = [0.0, 0.0, 0.0, 1.0];
        assert!((integrate_cubic(&coeffs, 0.0, 2.0) - 4.0).abs() < 1e-12);
    }
}
