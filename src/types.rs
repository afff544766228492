//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::collections::HashMap;

use chrono::Timelike;

/// セルの値を表す列挙型
///
/// スプレッドシートから読み込んだ値を、書式変換前の形で保持します。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// 空セル（欠損値）
    #[default]
    Empty,

    /// 文字列
    Text(String),

    /// 数値（f64）
    Number(f64),

    /// 論理値
    Bool(bool),

    /// 日時（Excelのシリアル値、1900年エポック）
    DateTime(f64),
}

impl FieldValue {
    /// 値が欠損しているかどうかを判定
    ///
    /// 空セルと長さ0の文字列を欠損として扱います。
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 値を表示用の文字列に変換
    ///
    /// 欠損値は`None`になります。整数値の数値は小数点なしで表現します
    /// （例: `7.0` -> `"7"`）。
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Empty => None,
            FieldValue::Text(s) if s.is_empty() => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
            FieldValue::DateTime(serial) => crate::formatter::serial_to_datetime(*serial)
                .map(|dt| {
                    if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                        dt.format("%Y-%m-%d").to_string()
                    } else {
                        dt.format("%Y-%m-%d %H:%M:%S").to_string()
                    }
                })
                .or_else(|| Some(format_number(*serial))),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// 正規化済み列名で値を引ける1行分のデータ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// スプレッドシート上の行番号（1始まり、ヘッダー行を含む）
    pub row_number: usize,
    fields: HashMap<String, FieldValue>,
}

static EMPTY_FIELD: FieldValue = FieldValue::Empty;

impl Record {
    /// 新しいレコードを生成
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            fields: HashMap::new(),
        }
    }

    /// 値を設定（ビルダー形式）
    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// 値を設定
    pub fn insert(&mut self, column: &str, value: FieldValue) {
        self.fields.insert(column.to_string(), value);
    }

    /// 列の値を取得（列が存在しない場合は空値）
    pub fn get(&self, column: &str) -> &FieldValue {
        self.fields.get(column).unwrap_or(&EMPTY_FIELD)
    }

    /// 列の値を表示用文字列として取得
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).as_text()
    }
}

/// 対象者（Subject）の1行
///
/// 索引名がない行はファイルの保存先を決められないため、生成対象外です。
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    record: Record,
}

impl SubjectRecord {
    /// レコードから対象者を生成
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    /// 元のレコード
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// スプレッドシート上の行番号
    pub fn row_number(&self) -> usize {
        self.record.row_number
    }

    /// 索引名（空白のみの場合も欠損として扱う）
    pub fn index_name(&self) -> Option<String> {
        self.record
            .text("IndexName")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// 一意識別子（欠損時は `"Unknown"`）
    pub fn unique_identifier(&self) -> String {
        self.record
            .text("UniqueIdentifier")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// 計画内容表（計画種別ごとの目標・介入テキスト）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanContentTable {
    rows: Vec<Record>,
}

impl PlanContentTable {
    /// 行リストから表を生成
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 行が存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 計画種別名で行を検索（完全一致、重複時は最初の行）
    pub fn lookup(&self, plan_type: &str) -> Option<&Record> {
        self.rows
            .iter()
            .find(|row| row.text("HCPName").as_deref() == Some(plan_type))
    }
}

/// 治療データベースの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentRecord {
    /// 生成ファイル名と照合するキー（A列）
    pub key: String,
    /// 箇条書きとして差し込むメモ（F列, "MedRecSTART"）
    pub note: String,
}

impl TreatmentRecord {
    /// 新しい治療レコードを生成
    pub fn new(key: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            note: note.into(),
        }
    }
}

/// キーごとにまとめた治療メモの索引
///
/// 読み込み後に一度だけ構築し、キーごとのメモを元の行順で保持します。
/// 結果は行リストを毎回線形に走査した場合と同じです。
#[derive(Debug, Clone, Default)]
pub struct TreatmentIndex {
    by_key: HashMap<String, Vec<String>>,
    total: usize,
}

impl TreatmentIndex {
    /// レコードリストから索引を構築
    pub fn new(records: &[TreatmentRecord]) -> Self {
        let mut by_key: HashMap<String, Vec<String>> = HashMap::new();
        for record in records {
            by_key
                .entry(record.key.clone())
                .or_default()
                .push(record.note.clone());
        }
        Self {
            by_key,
            total: records.len(),
        }
    }

    /// キーに一致するメモを元の順序で取得
    pub fn notes_for(&self, key: &str) -> &[String] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 索引に含まれるレコード総数
    pub fn len(&self) -> usize {
        self.total
    }

    /// レコードが存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
