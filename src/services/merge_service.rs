//! 合并各标的 CSV 为一个宽表 `merged.csv`。
//!
//! Rows are aligned by position after each record is sorted newest first,
//! not by date. Tickers with different trading calendars or listing dates
//! can therefore put different dates on the same merged row.

use crate::config::Config;
use crate::errors::{Result, AutoloaderError};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Blank columns appended after every ticker block for the sheet's formulas.
pub const PADDING_FIELDS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub rows: usize,
    pub datasets: usize,
}

struct Dataset {
    path: PathBuf,
    rows: Vec<StringRecord>,
}

// 按首列降序；首列相同时比较整行，保证输出与输入顺序无关
fn newest_first(a: &StringRecord, b: &StringRecord) -> Ordering {
    let key_a = a.get(0).unwrap_or("");
    let key_b = b.get(0).unwrap_or("");
    key_b.cmp(key_a).then_with(|| b.iter().cmp(a.iter()))
}

/// Reads a whole record file once and sorts its rows newest first.
fn load_sorted(path: &Path) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AutoloaderError::csv(path, e))?;

    let mut rows = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AutoloaderError::csv(path, e))?;
    rows.sort_by(newest_first);

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(Dataset { path: path.to_path_buf(), rows })
}

fn write_merged(datasets: &[Dataset], row_budget: usize, output: &Path) -> Result<MergeSummary> {
    let available = datasets.iter().map(|d| d.rows.len()).min().unwrap_or(0);
    let rows = if available < row_budget {
        let short = datasets.iter().min_by_key(|d| d.rows.len()).map(|d| d.path.display().to_string());
        warn!(
            "Row budget {} exceeds available rows {} ({}), truncating",
            row_budget, available, short.unwrap_or_default()
        );
        available
    } else {
        row_budget
    };

    info!("Minimum rows: {}", rows);

    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_path(output)
        .map_err(|e| AutoloaderError::csv(output, e))?;

    let mut merged = StringRecord::new();
    for row in 0..rows {
        merged.clear();
        for dataset in datasets {
            merged.extend(dataset.rows[row].iter());
            for _ in 0..PADDING_FIELDS {
                merged.push_field("");
            }
        }
        writer.write_record(&merged).map_err(|e| AutoloaderError::csv(output, e))?;
    }
    writer.flush().map_err(|e| AutoloaderError::io(output, e))?;

    info!("Wrote {} rows to {}", rows, output.display());
    Ok(MergeSummary { output: output.to_path_buf(), rows, datasets: datasets.len() })
}

/// Merges the given record files column-wise, in the given order, into `output`.
///
/// Every file is read once and sorted newest first by its first field. The
/// merged file holds `row_budget` rows, or fewer if some file turns out to be
/// shorter than that.
pub fn merge_records<P: AsRef<Path>>(datasets: &[P], row_budget: usize, output: &Path) -> Result<MergeSummary> {
    let loaded = datasets
        .iter()
        .map(|p| load_sorted(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    write_merged(&loaded, row_budget, output)
}

/// 直接合并磁盘上已有的记录文件，行数取最短文件的行数
pub fn merge_universe(config: &Config) -> Result<MergeSummary> {
    config.validate()?;
    let loaded = config
        .universe
        .iter()
        .map(|t| load_sorted(&config.record_path(t)))
        .collect::<Result<Vec<_>>>()?;
    let budget = loaded.iter().map(|d| d.rows.len()).min().unwrap_or(0);
    write_merged(&loaded, budget, &config.merged_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetch_service::tests::history_body;
    use std::fs;

    fn read_rows(path: &Path) -> Vec<StringRecord> {
        ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap())
            .collect()
    }

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_merge_truncates_to_shortest() {
        let dir = tempfile::tempdir().unwrap();
        // 100 and 80 rows, no header
        let spy = history_body(100, 300.0);
        let qqq = history_body(80, 200.0);
        let spy_rows: String = spy.lines().skip(1).map(|l| format!("{}\n", l)).collect();
        let qqq_rows: String = qqq.lines().skip(1).map(|l| format!("{}\n", l)).collect();
        let spy_path = write(dir.path(), "SPY.csv", &spy_rows);
        let qqq_path = write(dir.path(), "QQQ.csv", &qqq_rows);
        let output = dir.path().join("merged.csv");

        let summary = merge_records(&[spy_path, qqq_path], 80, &output).unwrap();
        assert_eq!(summary.rows, 80);
        assert_eq!(summary.datasets, 2);

        let rows = read_rows(&output);
        assert_eq!(rows.len(), 80);
        for row in &rows {
            assert_eq!(row.len(), 18);
            assert_eq!(&row[7], "");
            assert_eq!(&row[8], "");
            assert_eq!(&row[16], "");
            assert_eq!(&row[17], "");
        }
        // newest first in both blocks
        assert_eq!(&rows[0][0], "2020-04-09");
        assert_eq!(&rows[0][9], "2020-03-20");
        assert_eq!(&rows[79][0], "2020-01-21");
    }

    #[test]
    fn test_header_stays_on_top() {
        let dir = tempfile::tempdir().unwrap();
        let spy = write(dir.path(), "SPY.csv", &history_body(5, 1.0));
        let agg = write(dir.path(), "AGG.csv", &history_body(3, 1.0));
        let output = dir.path().join("merged.csv");

        merge_records(&[spy, agg], 4, &output).unwrap();
        let rows = read_rows(&output);
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[0][0], "Date");
        assert_eq!(&rows[0][9], "Date");
        assert_eq!(&rows[1][0], "2020-01-05");
        assert_eq!(&rows[1][9], "2020-01-03");
    }

    #[test]
    fn test_merge_ignores_input_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let body = history_body(20, 10.0);
        let mut shuffled: Vec<&str> = body.lines().collect();
        shuffled.reverse();
        shuffled.swap(3, 11);
        let shuffled = shuffled.join("\n");

        let a = write(dir.path(), "A.csv", &body);
        let b = write(dir.path(), "B.csv", &shuffled);
        let out_a = dir.path().join("a.csv");
        let out_b = dir.path().join("b.csv");

        merge_records(&[a], 21, &out_a).unwrap();
        merge_records(&[b], 21, &out_b).unwrap();
        assert_eq!(fs::read_to_string(out_a).unwrap(), fs::read_to_string(out_b).unwrap());
    }

    #[test]
    fn test_field_count_follows_each_block() {
        let dir = tempfile::tempdir().unwrap();
        let wide = write(dir.path(), "W.csv", "2020-01-02,1,2,3\n2020-01-01,1,2,3\n");
        let narrow = write(dir.path(), "N.csv", "2020-01-02,9\n2020-01-01,8\n");
        let output = dir.path().join("merged.csv");

        merge_records(&[wide, narrow], 2, &output).unwrap();
        let rows = read_rows(&output);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == (4 + 2) + (2 + 2)));
        assert_eq!(rows[1].iter().collect::<Vec<_>>(), vec!["2020-01-01", "1", "2", "3", "", "", "2020-01-01", "8", "", ""]);
    }

    #[test]
    fn test_header_only_and_empty_records() {
        let dir = tempfile::tempdir().unwrap();
        let full = write(dir.path(), "SPY.csv", &history_body(10, 1.0));
        let header_only = write(dir.path(), "QQQ.csv", &history_body(0, 1.0));
        let empty = write(dir.path(), "AGG.csv", "");
        let output = dir.path().join("merged.csv");

        let summary = merge_records(&[full.clone(), header_only], 1, &output).unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(read_rows(&output).len(), 1);

        let summary = merge_records(&[full, empty], 0, &output).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(read_rows(&output).is_empty());
    }

    #[test]
    fn test_budget_larger_than_file_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let short = write(dir.path(), "SPY.csv", &history_body(2, 1.0));
        let output = dir.path().join("merged.csv");

        let summary = merge_records(&[short], 50, &output).unwrap();
        assert_eq!(summary.rows, 3);
    }

    #[test]
    fn test_missing_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.csv");
        let err = merge_records(&[dir.path().join("NOPE.csv")], 1, &output).unwrap_err();
        assert!(matches!(err, AutoloaderError::FilesystemError { .. }));
        assert!(err.to_string().contains("NOPE.csv"));
        assert!(!output.exists());
    }

    #[test]
    fn test_unwritable_output_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let spy = write(dir.path(), "SPY.csv", &history_body(3, 1.0));
        let output = dir.path().join("missing").join("merged.csv");

        let err = merge_records(&[spy], 2, &output).unwrap_err();
        assert!(matches!(err, AutoloaderError::FilesystemError { .. }));
        assert!(err.to_string().contains("merged.csv"));
    }

    #[test]
    fn test_malformed_record_is_record_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BAD.csv");
        fs::write(&path, b"Date,Close\n2020-01-01,\xff\xfe\n").unwrap();
        let output = dir.path().join("merged.csv");

        let err = merge_records(&[path], 1, &output).unwrap_err();
        assert!(matches!(err, AutoloaderError::RecordError { .. }));
        assert!(err.to_string().contains("BAD.csv"));
    }

    #[test]
    fn test_merge_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let spy = write(dir.path(), "SPY.csv", &history_body(3, 1.0));
        let output = write(dir.path(), "merged.csv", &"stale,row\n".repeat(50));

        merge_records(&[spy], 2, &output).unwrap();
        assert_eq!(read_rows(&output).len(), 2);
    }

    #[test]
    fn test_merge_universe_uses_shortest_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "SPY.csv", &history_body(30, 1.0));
        write(dir.path(), "QQQ.csv", &history_body(12, 1.0));
        let config = Config::new().with_universe(&["SPY", "QQQ"]).with_data_dir(dir.path());

        let summary = merge_universe(&config).unwrap();
        assert_eq!(summary.rows, 13);
        assert_eq!(summary.output, dir.path().join("merged.csv"));
        assert_eq!(read_rows(&summary.output).len(), 13);
    }

    #[test]
    fn test_merge_universe_rejects_duplicate_tickers() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "SPY.csv", &history_body(3, 1.0));
        let config = Config::new().with_universe(&["SPY", "spy"]).with_data_dir(dir.path());

        assert!(matches!(merge_universe(&config), Err(AutoloaderError::ConfigError(_))));
        assert!(!dir.path().join("merged.csv").exists());
    }
}
