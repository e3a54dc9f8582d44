use async_trait::async_trait;
use vecscope_core::{EmbeddingVector, Point2, Projector, Result, VecscopeError};
use vecscope_stats::cosine_similarity;

/// Default number of power-iteration rounds per principal axis.
pub const DEFAULT_PCA_ITERATIONS: usize = 100;

const NORM_EPSILON: f64 = 1e-12;

/// In-process projector based on principal component analysis.
///
/// The two leading principal axes are found by power iteration with
/// deflation, starting from a fixed pseudo-random direction, so the same
/// input always yields the same layout.
///
/// Centered requests first scale every vector by `1 / (1 + d)`, where `d` is
/// its cosine distance to the center, and then translate the layout so the
/// vector nearest the center lands on the origin.
#[derive(Debug, Clone)]
pub struct PcaProjector {
    iterations: usize,
}

impl PcaProjector {
    pub fn new() -> Self {
        Self::with_iterations(DEFAULT_PCA_ITERATIONS)
    }

    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn reduce(&self, rows: &[Vec<f64>]) -> Vec<Point2> {
        let Some(dims) = rows.first().map(Vec::len) else {
            return Vec::new();
        };
        let n = rows.len() as f64;

        let mut mean = vec![0.0; dims];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let centered: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| row.iter().zip(&mean).map(|(v, m)| v - m).collect())
            .collect();

        let mut axes: Vec<Vec<f64>> = Vec::with_capacity(2);
        for k in 0..2 {
            let axis = self.principal_axis(&centered, &axes, k, dims);
            axes.push(axis);
        }

        centered
            .iter()
            .map(|row| [dot(row, &axes[0]), dot(row, &axes[1])])
            .collect()
    }

    fn principal_axis(
        &self,
        rows: &[Vec<f64>],
        previous: &[Vec<f64>],
        k: usize,
        dims: usize,
    ) -> Vec<f64> {
        let start: Vec<f64> = (0..dims)
            .map(|i| ((k + i + 7) as f64 * 0.123).sin() + ((k * i) as f64 * 0.456).cos())
            .collect();
        let Some(mut axis) = orthonormalize(start, previous) else {
            return vec![0.0; dims];
        };

        for _ in 0..self.iterations {
            let mut next = vec![0.0; dims];
            for row in rows {
                let score = dot(row, &axis);
                for (n, v) in next.iter_mut().zip(row) {
                    *n += score * v;
                }
            }
            match orthonormalize(next, previous) {
                Some(next) => axis = next,
                // No variance left outside the previous axes.
                None => break,
            }
        }

        // Pin the sign so the largest component is positive.
        let pivot = axis
            .iter()
            .copied()
            .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            axis.iter_mut().for_each(|v| *v = -*v);
        }
        axis
    }
}

impl Default for PcaProjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projector for PcaProjector {
    async fn project(
        &self,
        vectors: &[EmbeddingVector],
        center: Option<&EmbeddingVector>,
    ) -> Result<Vec<Point2>> {
        let projector = self.clone();
        let vectors = vectors.to_vec();
        let center = center.cloned();
        tokio::task::spawn_blocking(move || projector.project_blocking(&vectors, center.as_ref()))
            .await
            .map_err(|e| VecscopeError::ProjectionFailed(format!("PCA task failed: {e}")))?
    }
}

impl PcaProjector {
    fn project_blocking(
        &self,
        vectors: &[EmbeddingVector],
        center: Option<&EmbeddingVector>,
    ) -> Result<Vec<Point2>> {
        let rows: Vec<Vec<f64>> = vectors
            .iter()
            .map(|v| v.as_slice().iter().map(|&c| c as f64).collect())
            .collect();

        let Some(center) = center else {
            return Ok(self.reduce(&rows));
        };

        let mut distances = Vec::with_capacity(vectors.len());
        for v in vectors {
            distances.push(1.0 - cosine_similarity(v.as_slice(), center.as_slice())?);
        }

        let weighted: Vec<Vec<f64>> = rows
            .into_iter()
            .zip(&distances)
            .map(|(row, d)| {
                let w = 1.0 / (1.0 + d);
                row.into_iter().map(|v| v * w).collect()
            })
            .collect();

        let mut points = self.reduce(&weighted);
        let anchor = distances
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| points[i]);
        if let Some([ax, ay]) = anchor {
            for p in &mut points {
                p[0] -= ax;
                p[1] -= ay;
            }
        }
        Ok(points)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Remove the components along `previous` (assumed orthonormal) and
/// normalize; `None` if nothing is left.
fn orthonormalize(mut v: Vec<f64>, previous: &[Vec<f64>]) -> Option<Vec<f64>> {
    for p in previous {
        let overlap = dot(&v, p);
        for (x, y) in v.iter_mut().zip(p) {
            *x -= overlap * y;
        }
    }
    let norm = dot(&v, &v).sqrt();
    if norm <= NORM_EPSILON {
        return None;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthonormalize_removes_previous_axes() {
        let previous = vec![vec![1.0, 0.0, 0.0]];
        let v = orthonormalize(vec![2.0, 3.0, 0.0], &previous).unwrap();
        assert!(v[0].abs() < 1e-12);
        assert!((v[1] - 1.0).abs() < 1e-12);
        assert!(orthonormalize(vec![5.0, 0.0, 0.0], &previous).is_none());
    }

    #[test]
    fn reduce_of_single_row_is_origin() {
        let points = PcaProjector::new().reduce(&[vec![3.0, 4.0, 5.0]]);
        assert_eq!(points, vec![[0.0, 0.0]]);
    }

    #[test]
    fn reduce_of_one_dimensional_data_has_flat_second_axis() {
        let rows: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let points = PcaProjector::new().reduce(&rows);
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p[1] == 0.0));
        assert!(points.windows(2).all(|w| w[1][0] > w[0][0]));
    }
}
