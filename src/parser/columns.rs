//! 列名の正規化

/// 列名を正規化する
///
/// 前後の空白を取り除き、英字・数字以外の文字をすべて削除します。
/// 正規化後の名前が、以降の列参照に使われる識別子になります。
///
/// ```
/// use hcpgen::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Primary Dx "), "PrimaryDx");
/// assert_eq!(normalize_column_name("Risk-HIGH ALERT"), "RiskHIGHALERT");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    name.trim().chars().filter(|c| c.is_alphanumeric()).collect()
}
