//! Sliding-window batching of feature rows

use ndarray::{s, Array3, ArrayView2};

/// Slices an ordered feature matrix into overlapping fixed-length windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBatcher {
    timesteps: usize,
}

impl WindowBatcher {
    pub fn new(timesteps: usize) -> Self {
        Self { timesteps }
    }

    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    /// `max(0, rows - timesteps + 1)`
    pub fn window_count(&self, rows: usize) -> usize {
        (rows + 1).saturating_sub(self.timesteps)
    }

    /// Stride-1 windows of shape `(windows, timesteps, width)`.
    /// Yields an empty batch when there are fewer rows than `timesteps`.
    pub fn batch(&self, features: ArrayView2<'_, f64>) -> Array3<f64> {
        let count = self.window_count(features.nrows());
        self.stack(features, count)
    }

    /// Windows paired with the rows that follow them.
    ///
    /// Window *i* covers rows `i..i+timesteps` of `features`; its truth block
    /// is rows `i+timesteps..i+timesteps+horizon` of `targets`. Only windows
    /// with a complete truth block are produced.
    pub fn batch_with_horizon(
        &self,
        features: ArrayView2<'_, f64>,
        targets: ArrayView2<'_, f64>,
        horizon: usize,
    ) -> (Array3<f64>, Array3<f64>) {
        let rows = features.nrows().min(targets.nrows());
        let count = (rows + 1).saturating_sub(self.timesteps + horizon);

        let inputs = self.stack(features, count);
        let truth = Array3::from_shape_fn((count, horizon, targets.ncols()), |(i, j, k)| {
            targets[[i + self.timesteps + j, k]]
        });
        (inputs, truth)
    }

    fn stack(&self, features: ArrayView2<'_, f64>, count: usize) -> Array3<f64> {
        let width = features.ncols();
        let mut windows = Array3::zeros((count, self.timesteps, width));
        for i in 0..count {
            windows
                .slice_mut(s![i, .., ..])
                .assign(&features.slice(s![i..i + self.timesteps, ..]));
        }
        windows
    }
}
