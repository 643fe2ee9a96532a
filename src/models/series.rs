use std::fmt;

/// 标的代码，例如 `SPY`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: &str) -> Self {
        Self(symbol.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Per-ticker record file name, `{TICKER}.csv`.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.0)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider timestamp: seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeBound(pub i64);

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 每个标的下载后的行数，按 universe 顺序保存
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCounts {
    entries: Vec<(Ticker, usize)>,
}

impl RowCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ticker: Ticker, rows: usize) {
        self.entries.push((ticker, rows));
    }

    pub fn get(&self, ticker: &Ticker) -> Option<usize> {
        self.entries.iter().find(|(t, _)| t == ticker).map(|(_, n)| *n)
    }

    /// Row budget for the merge step. `None` when nothing was fetched.
    pub fn min(&self) -> Option<usize> {
        self.entries.iter().map(|(_, n)| *n).min()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.entries.iter().map(|(t, _)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ticker, usize)> {
        self.entries.iter().map(|(t, n)| (t, *n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_normalizes_case() {
        let ticker = Ticker::new(" spy ");
        assert_eq!(ticker.as_str(), "SPY");
        assert_eq!(ticker.file_name(), "SPY.csv");
    }

    #[test]
    fn test_row_counts_keep_insertion_order() {
        let mut counts = RowCounts::new();
        counts.push(Ticker::new("SPY"), 100);
        counts.push(Ticker::new("QQQ"), 80);
        counts.push(Ticker::new("AGG"), 90);

        let order: Vec<&str> = counts.tickers().map(|t| t.as_str()).collect();
        assert_eq!(order, vec!["SPY", "QQQ", "AGG"]);
        assert_eq!(counts.min(), Some(80));
        assert_eq!(counts.get(&Ticker::new("AGG")), Some(90));
        assert_eq!(counts.get(&Ticker::new("EEM")), None);
    }

    #[test]
    fn test_empty_row_counts_have_no_budget() {
        assert_eq!(RowCounts::new().min(), None);
    }
}
