use crate::market::entity::Bar;
use crate::market::error::FrameError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 原始行情列名
pub mod columns {
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const CLOSE: &str = "Close";
    pub const VOLUME: &str = "Volume";
}

/// # Summary
/// 单个命名列，单元格为 None 表示缺失值。
#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Option<f64>>,
}

/// # Summary
/// 以交易日为索引的列式序列表，承载原始 OHLCV 及派生指标。
///
/// # Invariants
/// - 每一列的长度始终等于 `index` 的长度。
/// - 列名唯一，列顺序即插入顺序。
/// - 序列化为 split 结构：`{"columns": [...], "index": [...], "data": [[...]]}`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SplitTable", into = "SplitTable")]
pub struct SeriesFrame {
    // 日期索引，严格递增
    index: Vec<NaiveDate>,
    // 有序列集合
    columns: Vec<Column>,
}

impl SeriesFrame {
    /// 创建只有日期索引、尚无任何列的表。
    pub fn with_index(index: Vec<NaiveDate>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// # Summary
    /// 由 OHLCV 记录构造原始序列表。
    ///
    /// # Logic
    /// 1. 以每条记录的日期作为索引。
    /// 2. 依次生成 Open、High、Low、Close、Volume 五列。
    ///
    /// # Arguments
    /// * `bars`: 按日期升序排列的行情记录。
    ///
    /// # Returns
    /// 原始序列表；输入为空时返回空表。
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut frame = Self::with_index(bars.iter().map(|b| b.date).collect());
        let extract = |f: fn(&Bar) -> f64| bars.iter().map(|b| Some(f(b))).collect::<Vec<_>>();

        frame.push_unchecked(columns::OPEN, extract(|b| b.open));
        frame.push_unchecked(columns::HIGH, extract(|b| b.high));
        frame.push_unchecked(columns::LOW, extract(|b| b.low));
        frame.push_unchecked(columns::CLOSE, extract(|b| b.close));
        frame.push_unchecked(columns::VOLUME, extract(volume_as_f64));
        frame
    }

    fn push_unchecked(&mut self, name: &str, values: Vec<Option<f64>>) {
        self.columns.push(Column {
            name: name.to_string(),
            values,
        });
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// 是否没有任何行
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 日期索引
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// 按插入顺序返回全部列名
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// 按列名读取整列
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// 读取单个单元格，列不存在、越界或缺失均返回 None
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|v| v.get(row).copied().flatten())
    }

    /// 指定列最后一行的值
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.len().checked_sub(1).and_then(|row| self.value(name, row))
    }

    /// # Summary
    /// 写入一列；同名列存在时整体替换，否则追加到末尾。
    ///
    /// # Arguments
    /// * `name`: 列名。
    /// * `values`: 单元格，长度必须等于行数。
    ///
    /// # Returns
    /// 长度不一致时返回 `FrameError::LengthMismatch`。
    pub fn set_column(
        &mut self,
        name: &str,
        values: Vec<Option<f64>>,
    ) -> Result<(), FrameError> {
        if values.len() != self.index.len() {
            return Err(FrameError::LengthMismatch {
                column: name.to_string(),
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.push_unchecked(name, values),
        }
        Ok(())
    }

    /// # Summary
    /// 按闭区间 `[start, end]` 截取行。
    ///
    /// # Logic
    /// 1. 索引有序，使用二分查找定位上下界。
    /// 2. `start > end` 时得到空表（保留列结构）。
    ///
    /// # Returns
    /// 截取后的新表，已计算的指标值原样保留、不重新计算。
    pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.index.partition_point(|d| *d < start);
        let hi = self.index.partition_point(|d| *d <= end).max(lo);
        Self {
            index: self.index[lo..hi].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[lo..hi].to_vec(),
                })
                .collect(),
        }
    }

    /// # Summary
    /// 选出指定列组成新表，供图表层按指标选择消费。
    ///
    /// # Returns
    /// 任一列不存在时返回 `FrameError::UnknownColumn`。
    pub fn select(&self, names: &[&str]) -> Result<Self, FrameError> {
        let mut selected = Self::with_index(self.index.clone());
        for name in names {
            let values = self
                .column(name)
                .ok_or_else(|| FrameError::UnknownColumn((*name).to_string()))?;
            selected.set_column(name, values.to_vec())?;
        }
        Ok(selected)
    }
}

// u64 到 f64 在 2^53 以上会丢精度，成交量远低于此范围
#[allow(clippy::cast_precision_loss)]
fn volume_as_f64(bar: &Bar) -> f64 {
    bar.volume as f64
}

/// # Summary
/// `SeriesFrame` 的持久化形态（split 方向的表格 JSON）。
///
/// # Invariants
/// - `data[i]` 为第 i 个日期对应的一行，长度等于 `columns` 长度。
/// - 缺失值与非有限浮点数均以 `null` 表示。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitTable {
    pub columns: Vec<String>,
    pub index: Vec<NaiveDate>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl From<SeriesFrame> for SplitTable {
    fn from(frame: SeriesFrame) -> Self {
        let data = (0..frame.index.len())
            .map(|row| {
                frame
                    .columns
                    .iter()
                    .map(|c| c.values[row].filter(|v| v.is_finite()))
                    .collect()
            })
            .collect();
        Self {
            columns: frame.columns.into_iter().map(|c| c.name).collect(),
            index: frame.index,
            data,
        }
    }
}

impl TryFrom<SplitTable> for SeriesFrame {
    type Error = FrameError;

    fn try_from(table: SplitTable) -> Result<Self, Self::Error> {
        let width = table.columns.len();
        if table.data.len() != table.index.len() {
            return Err(FrameError::LengthMismatch {
                column: "data".to_string(),
                expected: table.index.len(),
                actual: table.data.len(),
            });
        }

        // 区间切片依赖二分查找，索引必须严格递增
        if let Some(row) = table.index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(FrameError::UnorderedIndex {
                row: row + 1,
                date: table.index[row + 1],
            });
        }

        let mut names = HashSet::new();
        for name in &table.columns {
            if !names.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
        }

        let mut columns: Vec<Column> = table
            .columns
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::with_capacity(table.index.len()),
            })
            .collect();

        for (row, cells) in table.data.into_iter().enumerate() {
            if cells.len() != width {
                return Err(FrameError::RaggedRow {
                    row,
                    expected: width,
                    actual: cells.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(cells) {
                column.values.push(cell);
            }
        }

        Ok(Self {
            index: table.index,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn bars() -> Vec<Bar> {
        (1..=5)
            .map(|day| Bar {
                date: d(day),
                open: 10.0,
                high: 12.0,
                low: 9.0,
                close: 10.0 + f64::from(day),
                volume: 1_000 * u64::from(day),
            })
            .collect()
    }

    #[test]
    fn test_from_bars_layout() {
        let frame = SeriesFrame::from_bars(&bars());
        assert_eq!(frame.len(), 5);
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            vec!["Open", "High", "Low", "Close", "Volume"]
        );
        assert_eq!(frame.last_value(columns::CLOSE), Some(15.0));
        assert_eq!(frame.value(columns::VOLUME, 1), Some(2_000.0));
    }

    #[test]
    fn test_slice_dates_inclusive() {
        let frame = SeriesFrame::from_bars(&bars());
        let slice = frame.slice_dates(d(2), d(4));
        assert_eq!(slice.index(), &[d(2), d(3), d(4)]);
        assert_eq!(slice.column(columns::CLOSE).unwrap(), &[Some(12.0), Some(13.0), Some(14.0)]);
    }

    #[test]
    fn test_slice_dates_inverted_range_is_empty() {
        let frame = SeriesFrame::from_bars(&bars());
        let slice = frame.slice_dates(d(4), d(2));
        assert!(slice.is_empty());
        assert!(slice.has_column(columns::CLOSE));
    }

    #[test]
    fn test_set_column_rejects_wrong_length() {
        let mut frame = SeriesFrame::from_bars(&bars());
        let err = frame.set_column("X", vec![None; 3]).unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 5, actual: 3, .. }));
    }

    #[test]
    fn test_split_payload_shape_and_missing_cells() {
        let mut frame = SeriesFrame::from_bars(&bars()[..2]);
        frame.set_column("SMA_2", vec![None, Some(11.5)]).unwrap();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["index"][0], "2024-03-01");
        assert_eq!(json["columns"][5], "SMA_2");
        assert!(json["data"][0][5].is_null());

        let back: SeriesFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_deserialize_rejects_ragged_rows() {
        let raw = r#"{"columns":["A","B"],"index":["2024-03-01"],"data":[[1.0]]}"#;
        assert!(serde_json::from_str::<SeriesFrame>(raw).is_err());
    }

    #[test]
    fn test_deserialize_rejects_unordered_index() {
        let unsorted = r#"{"columns":["Close"],"index":["2024-03-02","2024-03-01"],"data":[[1.0],[2.0]]}"#;
        let err = serde_json::from_str::<SeriesFrame>(unsorted).unwrap_err();
        assert!(err.to_string().contains("not strictly increasing at row 1"), "{}", err);

        let duplicated = r#"{"columns":["Close"],"index":["2024-03-01","2024-03-02","2024-03-02"],"data":[[1.0],[2.0],[3.0]]}"#;
        assert!(serde_json::from_str::<SeriesFrame>(duplicated).is_err());

        let sorted = r#"{"columns":["Close"],"index":["2024-03-01","2024-03-04"],"data":[[1.0],[2.0]]}"#;
        let frame: SeriesFrame = serde_json::from_str(sorted).unwrap();
        assert_eq!(frame.slice_dates(d(2), d(4)).len(), 1);
    }

    #[test]
    fn test_select_unknown_column() {
        let frame = SeriesFrame::from_bars(&bars());
        assert!(frame.select(&["Close"]).is_ok());
        assert_eq!(
            frame.select(&["RSI"]).unwrap_err(),
            FrameError::UnknownColumn("RSI".to_string())
        );
    }
}
