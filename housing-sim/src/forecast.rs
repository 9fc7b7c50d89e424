// Linear trend extrapolation over a trailing window

/// Least-squares line through `(i, ys[i])`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares with an intercept. `None` for fewer than two
/// samples.
pub fn fit(ys: &[f64]) -> Option<LinearFit> {
    let n = ys.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let (sxy, sxx) = ys.iter().enumerate().fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
        let dx = i as f64 - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Forecast `horizon` steps past the last of the trailing `window`
/// samples of `history`. `None` until the window is full.
pub fn extrapolate(history: &[f64], window: usize, horizon: u32) -> Option<f64> {
    if window < 2 || history.len() < window {
        return None;
    }
    let recent = &history[history.len() - window..];
    let line = fit(recent)?;
    Some(line.predict((window - 1) as f64 + horizon as f64))
}
