//! Formatter Module
//!
//! 対象者の値を文書に差し込む表示用文字列へ正規化する関数群を提供するモジュール。
//!
//! - 日付: `MM/DD/YYYY` 形式。解析できない値は空文字列へフォールバックします。
//! - 数値ID（Medicaid番号, CID）: 区切り文字・小数点なしの10進数字列。
//!   数値として解釈できない値はデータ品質エラーとして呼び出し元へ返します。

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::error::HcpError;
use crate::types::FieldValue;

/// 文書に書き込む日付の形式
pub const DISPLAY_DATE_FORMAT: &str = "%m/%d/%Y";

/// Excelシリアル値の上限（9999-12-31）
const MAX_SERIAL: f64 = 2_958_465.0;

/// 文字列の日付として受け付ける形式（先に一致したものを採用）
const DATE_TEXT_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%B %d, %Y",
];

/// 文字列の日時として受け付ける形式
const DATETIME_TEXT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

/// Excelのシリアル日付値を日時に変換
///
/// 1900年システム（1899年12月30日起算）として扱います。
/// 1900年3月1日以降の値はExcelの表示と一致します。
///
/// # 戻り値
///
/// * `Some(NaiveDateTime)` - 変換に成功した場合
/// * `None` - 負の値、非有限値、または9999年を超える値の場合
pub(crate) fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.floor() as i64;
    let seconds = ((serial - serial.floor()) * 86_400.0).round() as i64;

    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// 日付文字列を解析
///
/// 複数の一般的な形式を順に試します。前後の空白は無視します。
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_TEXT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_TEXT_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .filter(|date| (1..=9999).contains(&date.year()))
}

/// 日付を表示形式（`MM/DD/YYYY`）に変換
pub fn render_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// 日付値を `MM/DD/YYYY` 形式に変換
///
/// この関数はエラーを返しません。欠損値と解析できない値はいずれも空文字列になり、
/// 後者は警告として記録されます。
///
/// # 引数
///
/// * `value` - スプレッドシートから読み込んだ値
///
/// # 戻り値
///
/// `MM/DD/YYYY` 形式の文字列、または空文字列
pub fn format_date(value: &FieldValue) -> String {
    let date = match value {
        FieldValue::Empty => return String::new(),
        FieldValue::Text(s) if s.trim().is_empty() => return String::new(),
        FieldValue::Text(s) => parse_date_text(s),
        FieldValue::DateTime(serial) | FieldValue::Number(serial) => {
            serial_to_datetime(*serial).map(|dt| dt.date())
        }
        FieldValue::Bool(_) => None,
    };

    match date {
        Some(date) => render_date(date),
        None => {
            warn!(value = ?value, "Unparsable date value, rendering as empty");
            String::new()
        }
    }
}

/// Medicaid番号を整数の数字列に変換
///
/// 欠損値は空文字列になります。数値として解釈できない値は
/// `HcpError::InvalidNumber` を返します。
///
/// ```
/// use hcpgen::{format_medicaid, FieldValue};
///
/// assert_eq!(format_medicaid(&FieldValue::Number(123456.0)).unwrap(), "123456");
/// assert_eq!(format_medicaid(&FieldValue::Empty).unwrap(), "");
/// ```
pub fn format_medicaid(value: &FieldValue) -> Result<String, HcpError> {
    format_identifier("Medicaid", value)
}

/// CID（ケース/クライアントID）を整数の数字列に変換
///
/// 振る舞いは [`format_medicaid`] と同じです。
pub fn format_cid(value: &FieldValue) -> Result<String, HcpError> {
    format_identifier("CID", value)
}

/// 数値IDの共通変換処理
///
/// - 数値: 小数部を切り捨てた整数（`123456.0` -> `"123456"`）
/// - 数字のみの文字列: そのまま（先頭のゼロを保持）
/// - 整数値を表す文字列（`"123456.0"`）: 整数部
/// - それ以外: `HcpError::InvalidNumber`
pub(crate) fn format_identifier(column: &str, value: &FieldValue) -> Result<String, HcpError> {
    let invalid = |raw: String| HcpError::InvalidNumber {
        column: column.to_string(),
        value: raw,
    };

    match value {
        FieldValue::Empty => Ok(String::new()),
        FieldValue::Number(n) => {
            if !n.is_finite() || n.abs() >= 9.0e18 {
                return Err(invalid(n.to_string()));
            }
            Ok(format!("{}", n.trunc() as i64))
        }
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(String::new());
            }
            if trimmed.chars().all(|c| c.is_ascii_digit()) {
                return Ok(trimmed.to_string());
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e18 => {
                    Ok(format!("{}", n as i64))
                }
                _ => Err(invalid(s.clone())),
            }
        }
        FieldValue::Bool(b) => Err(invalid(b.to_string())),
        FieldValue::DateTime(serial) => Err(invalid(serial.to_string())),
    }
}
