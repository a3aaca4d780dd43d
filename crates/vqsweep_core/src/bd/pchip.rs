//! Monotonic piecewise-cubic (PCHIP) interpolation.
//!
//! Fritsch-Carlson derivatives with the standard one-sided three-point
//! endpoint rule. Knot x values must be strictly increasing; callers
//! sort first and duplicates make the curve ill-defined (`None`).

/// Interpolate `samples` on the curve through `(x, y)`.
pub fn pchip_interpolate(x: &[f64], y: &[f64], samples: &[f64]) -> Option<Vec<f64>> {
    let derivatives = pchip_derivatives(x, y)?;
    Some(
        samples
            .iter()
            .map(|&xq| evaluate(x, y, &derivatives, xq))
            .collect(),
    )
}

/// Sort `(x, y)` pairs by x ascending.
pub fn sort_by_x(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    pairs.into_iter().unzip()
}

/// Shape-preserving knot derivatives per Fritsch-Carlson.
fn pchip_derivatives(x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return None;
    }

    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = h
        .iter()
        .enumerate()
        .map(|(i, &hi)| (y[i + 1] - y[i]) / hi)
        .collect();

    if n == 2 {
        return Some(vec![delta[0], delta[0]]);
    }

    let mut d = vec![0.0f64; n];
    for i in 1..n - 1 {
        if delta[i - 1] * delta[i] > 0.0 {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            d[i] = (w1 + w2) / (w1 / delta[i - 1] + w2 / delta[i]);
        }
    }
    d[0] = edge_derivative(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = edge_derivative(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    Some(d)
}

/// One-sided three-point endpoint estimate with monotonicity clamping.
fn edge_derivative(h0: f64, h1: f64, delta0: f64, delta1: f64) -> f64 {
    if delta0 == 0.0 {
        return 0.0;
    }
    let mut d = ((2.0 * h0 + h1) * delta0 - h0 * delta1) / (h0 + h1);
    if d.signum() != delta0.signum() {
        d = 0.0;
    } else if delta0.signum() != delta1.signum() && d.abs() > 3.0 * delta0.abs() {
        d = 3.0 * delta0;
    }
    d
}

/// Cubic Hermite evaluation on the interval containing `xq`.
fn evaluate(x: &[f64], y: &[f64], d: &[f64], xq: f64) -> f64 {
    let n = x.len();
    if xq <= x[0] {
        return hermite(x[0], x[1], y[0], y[1], d[0], d[1], xq);
    }
    if xq >= x[n - 1] {
        return hermite(x[n - 2], x[n - 1], y[n - 2], y[n - 1], d[n - 2], d[n - 1], xq);
    }
    let i = match x.binary_search_by(|v| v.partial_cmp(&xq).unwrap_or(std::cmp::Ordering::Less)) {
        Ok(i) => return y[i],
        Err(i) => i - 1,
    };
    hermite(x[i], x[i + 1], y[i], y[i + 1], d[i], d[i + 1], xq)
}

#[allow(clippy::too_many_arguments)]
fn hermite(x0: f64, x1: f64, y0: f64, y1: f64, d0: f64, d1: f64, xq: f64) -> f64 {
    let h = x1 - x0;
    let t = (xq - x0) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * y0 + h10 * h * d0 + h01 * y1 + h11 * h * d1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_passes_through_knots() {
        let x = [1.0, 2.0, 4.0, 7.0];
        let y = [10.0, 14.0, 15.0, 19.0];
        let values = pchip_interpolate(&x, &y, &x).unwrap();
        for (v, expected) in values.iter().zip(&y) {
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn monotonic_data_stays_monotonic() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 8.0, 9.0, 20.0];
        let samples: Vec<f64> = (0..=400).map(|i| i as f64 / 100.0).collect();
        let values = pchip_interpolate(&x, &y, &samples).unwrap();
        for pair in values.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
    }

    #[test]
    fn duplicate_x_is_rejected() {
        assert!(pchip_interpolate(&[1.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 3.0], &[1.5]).is_none());
    }

    #[test]
    fn linear_data_reproduces_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let values = pchip_interpolate(&x, &y, &[0.5, 1.5, 2.5]).unwrap();
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 4.0).abs() < 1e-9);
        assert!((values[2] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn sort_by_x_keeps_pairs_together() {
        let (x, y) = sort_by_x(&[3.0, 1.0, 2.0], &[30.0, 10.0, 20.0]);
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![10.0, 20.0, 30.0]);
    }
}
