//! 列级窗口统计与平滑工具。
//!
//! 所有函数输入输出等长；窗口内只要有一个缺失值，该位置结果即为缺失，
//! 前 `window - 1` 个位置恒为缺失。

/// 一列可能缺失的数值
pub type Cells = Vec<Option<f64>>;

/// # Summary
/// 在尾随窗口上执行聚合函数。
///
/// # Logic
/// 1. `window` 为 0 或大于序列长度时全部为缺失。
/// 2. 窗口内全部有值时才调用 `f`，`f` 可返回 None 表示无定义。
fn rolling_apply(values: &[Option<f64>], window: usize, f: impl Fn(&[f64]) -> Option<f64>) -> Cells {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    let mut buf = Vec::with_capacity(window);
    for (offset, slice) in values.windows(window).enumerate() {
        buf.clear();
        buf.extend(slice.iter().map_while(|v| *v));
        if buf.len() == window {
            out[offset + window - 1] = f(&buf);
        }
    }
    out
}

fn mean(cells: &[f64]) -> f64 {
    cells.iter().sum::<f64>() / cells.len() as f64
}

/// 尾随窗口算术平均
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Cells {
    rolling_apply(values, window, |c| Some(mean(c)))
}

/// 尾随窗口求和
pub fn rolling_sum(values: &[Option<f64>], window: usize) -> Cells {
    rolling_apply(values, window, |c| Some(c.iter().sum()))
}

/// 尾随窗口样本标准差（自由度 n - 1），窗口为 1 时无定义
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Cells {
    rolling_apply(values, window, |c| {
        if c.len() < 2 {
            return None;
        }
        let m = mean(c);
        let ss = c.iter().map(|x| (x - m).powi(2)).sum::<f64>();
        Some((ss / (c.len() - 1) as f64).sqrt())
    })
}

/// 尾随窗口最小值
pub fn rolling_min(values: &[Option<f64>], window: usize) -> Cells {
    rolling_apply(values, window, |c| c.iter().copied().reduce(f64::min))
}

/// 尾随窗口最大值
pub fn rolling_max(values: &[Option<f64>], window: usize) -> Cells {
    rolling_apply(values, window, |c| c.iter().copied().reduce(f64::max))
}

/// # Summary
/// 递推式指数加权平均，平滑系数 `alpha = 2 / (span + 1)`。
///
/// # Logic
/// 1. 第一个有值位置的结果等于该值本身。
/// 2. 之后 `y_t = alpha * x_t + (1 - alpha) * y_{t-1}`。
/// 3. 中途缺失时沿用上一个平滑值；首个有值位置之前为缺失。
pub fn ewm(values: &[Option<f64>], span: usize) -> Cells {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut state: Option<f64> = None;
    values
        .iter()
        .map(|v| {
            if let Some(x) = v {
                state = Some(match state {
                    None => *x,
                    Some(prev) => alpha * x + (1.0 - alpha) * prev,
                });
            }
            state
        })
        .collect()
}

/// 一阶差分，首行缺失
pub fn diff(values: &[Option<f64>]) -> Cells {
    let prev = shift(values);
    zip_with(values, &prev, |x, p| x - p)
}

/// 整体后移一行，首行缺失
pub fn shift(values: &[Option<f64>]) -> Cells {
    std::iter::once(None)
        .chain(values.iter().copied())
        .take(values.len())
        .collect()
}

/// 逐元素组合两列，任一缺失则结果缺失
pub fn zip_with(a: &[Option<f64>], b: &[Option<f64>], f: impl Fn(f64, f64) -> f64) -> Cells {
    a.iter()
        .zip(b)
        .map(|(x, y)| Some(f((*x)?, (*y)?)))
        .collect()
}

/// 将非有限值（NaN、无穷）视为缺失
pub fn finite(values: Cells) -> Cells {
    values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(xs: &[f64]) -> Cells {
        xs.iter().map(|x| Some(*x)).collect()
    }

    #[test]
    fn test_rolling_mean_warmup_is_missing() {
        let out = rolling_mean(&cells(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_window_longer_than_series() {
        assert_eq!(rolling_mean(&cells(&[1.0, 2.0]), 5), vec![None, None]);
        assert_eq!(rolling_sum(&cells(&[1.0]), 0), vec![None]);
    }

    #[test]
    fn test_missing_cell_poisons_window() {
        let values = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        assert_eq!(rolling_sum(&values, 2), vec![None, None, None, Some(7.0), Some(9.0)]);
    }

    #[test]
    fn test_rolling_std_is_sample_std() {
        let out = rolling_std(&cells(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        // 样本方差 = 32 / 7
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((out[7].unwrap() - expected).abs() < 1e-12);
        assert_eq!(rolling_std(&cells(&[1.0, 2.0]), 1), vec![None, None]);
    }

    #[test]
    fn test_rolling_min_max() {
        let values = cells(&[3.0, 1.0, 2.0, 5.0]);
        assert_eq!(rolling_min(&values, 2), vec![None, Some(1.0), Some(1.0), Some(2.0)]);
        assert_eq!(rolling_max(&values, 2), vec![None, Some(3.0), Some(2.0), Some(5.0)]);
    }

    #[test]
    fn test_ewm_recurrence() {
        let out = ewm(&cells(&[10.0, 13.0, 7.0]), 2);
        let alpha = 2.0 / 3.0;
        let y1 = alpha * 13.0 + (1.0 - alpha) * 10.0;
        let y2 = alpha * 7.0 + (1.0 - alpha) * y1;
        assert_eq!(out[0], Some(10.0));
        assert!((out[1].unwrap() - y1).abs() < 1e-12);
        assert!((out[2].unwrap() - y2).abs() < 1e-12);
    }

    #[test]
    fn test_ewm_leading_and_interior_gaps() {
        let out = ewm(&[None, Some(4.0), None, Some(4.0)], 3);
        assert_eq!(out, vec![None, Some(4.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn test_diff_and_shift() {
        let values = cells(&[1.0, 4.0, 2.0]);
        assert_eq!(shift(&values), vec![None, Some(1.0), Some(4.0)]);
        assert_eq!(diff(&values), vec![None, Some(3.0), Some(-2.0)]);
        assert!(shift(&[]).is_empty());
    }

    #[test]
    fn test_finite_drops_nan_and_inf() {
        let out = finite(vec![Some(f64::NAN), Some(f64::INFINITY), Some(1.0), None]);
        assert_eq!(out, vec![None, None, Some(1.0), None]);
    }
}
