use chrono::{Local, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use csv::ReaderBuilder;
use crate::models::series::TimeBound;
use crate::errors::{Result, AutoloaderError};

pub const CALENDAR_FORMAT: &str = "%m/%d/%Y:%H:%M";

// 日期转换工具：MM/DD/YYYY:HH -> 时间戳
pub fn parse_calendar(date_str: &str) -> Result<NaiveDateTime> {
    // chrono 需要分钟字段，补齐为整点
    NaiveDateTime::parse_from_str(&format!("{}:00", date_str.trim()), CALENDAR_FORMAT)
        .map_err(|e| AutoloaderError::ParseError {
            input: date_str.to_string(),
            reason: e.to_string(),
        })
}

/// Encodes a calendar string as seconds since the epoch in the given zone.
pub fn encode_in<Z: TimeZone>(date_str: &str, tz: &Z) -> Result<TimeBound> {
    let naive = parse_calendar(date_str)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(TimeBound(dt.timestamp())),
        LocalResult::Ambiguous(earliest, _) => Ok(TimeBound(earliest.timestamp())),
        LocalResult::None => Err(AutoloaderError::ParseError {
            input: date_str.to_string(),
            reason: "local time does not exist in this timezone".to_string(),
        }),
    }
}

pub fn encode_local(date_str: &str) -> Result<TimeBound> {
    encode_in(date_str, &Local)
}

/// 配置了时区则按该时区解析，否则使用本机时区
pub fn encode_time_bound(date_str: &str, tz: Option<Tz>) -> Result<TimeBound> {
    match tz {
        Some(tz) => encode_in(date_str, &tz),
        None => encode_local(date_str),
    }
}

pub fn ensure_ordered(start: TimeBound, end: TimeBound) -> Result<()> {
    if start < end {
        Ok(())
    } else {
        Err(AutoloaderError::InvalidRange { start: start.0, end: end.0 })
    }
}

// 统计 CSV 记录数（包含表头），与合并时读取的记录一致
pub fn count_rows(body: &str) -> usize {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes())
        .byte_records()
        .take_while(|record| record.is_ok())
        .count()
}

pub fn clear_screen() {
    print!("\x1bc\x1b[3J");
}
