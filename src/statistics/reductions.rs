//! NaN-skipping reduction kernels

use super::operations::ReduceOp;
use ndarray::{ArrayD, ArrayView1, Axis};

/// Reduce `data` along `axis`; the axis must exist
pub fn reduce_axis(data: &ArrayD<f64>, axis: usize, operation: ReduceOp) -> ArrayD<f64> {
    data.map_axis(Axis(axis), |lane| reduce_lane(lane, operation))
}

/// Reduce one lane, ignoring NaN entries
pub fn reduce_lane(lane: ArrayView1<'_, f64>, operation: ReduceOp) -> f64 {
    let mut valid: Vec<f64> = lane.iter().copied().filter(|x| !x.is_nan()).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    match operation {
        ReduceOp::Mean => mean(&valid),
        ReduceOp::Sum => valid.iter().sum(),
        ReduceOp::Min => valid.iter().copied().fold(f64::INFINITY, f64::min),
        ReduceOp::Max => valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ReduceOp::Ptp => {
            let (lo, hi) = valid
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
            hi - lo
        }
        ReduceOp::Var => variance(&valid),
        ReduceOp::Std => variance(&valid).sqrt(),
        ReduceOp::Median => {
            valid.sort_by(f64::total_cmp);
            let mid = valid.len() / 2;
            if valid.len() % 2 == 0 {
                (valid[mid - 1] + valid[mid]) / 2.0
            } else {
                valid[mid]
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (`ddof = 0`)
#[allow(clippy::cast_precision_loss)]
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn lanes_skip_nan() {
        let lane = array![1.0, f64::NAN, 3.0, 4.0];
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Mean), 8.0 / 3.0);
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Median), 3.0);
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Ptp), 3.0);
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Sum), 8.0);
    }

    #[test]
    fn empty_lane_is_nan() {
        let lane = array![f64::NAN, f64::NAN];
        for op in ReduceOp::ALL {
            assert!(reduce_lane(lane.view(), op).is_nan(), "{op}");
        }
    }

    #[test]
    fn population_statistics() {
        let lane = array![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Var), 4.0);
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Std), 2.0);
        assert_eq!(reduce_lane(lane.view(), ReduceOp::Median), 4.5);
    }
}
