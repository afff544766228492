//! Workbook Reader
//!
//! calamineのラッパーとして、シート単位の読み込みを提供します。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::SheetSelector;
use crate::builder::GeneratorConfig;
use crate::error::HcpError;
use crate::fields::{REQUIRED_PLAN_CONTENT_COLUMNS, REQUIRED_SUBJECT_COLUMNS};
use crate::parser::normalize_column_name;
use crate::security::SecurityConfig;
use crate::types::{
    FieldValue, PlanContentTable, Record, SubjectRecord, TreatmentIndex, TreatmentRecord,
};

/// 治療データベースのキー列（A列、0始まり）
pub const TREATMENT_KEY_COLUMN: u32 = 0;

/// 治療データベースのメモ列（F列 "MedRecSTART"、0始まり）
pub const TREATMENT_NOTE_COLUMN: u32 = 5;

/// 治療データベースのデータ開始行（2行目、0始まり）
pub const TREATMENT_FIRST_ROW: u32 = 1;

/// ワークブックリーダー
///
/// ファイル全体をメモリに読み込んでからcalamineで開きます。
pub(crate) struct WorkbookReader {
    path: PathBuf,
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl WorkbookReader {
    /// ワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookReader)` - 読み込みに成功した場合
    /// * `Err(HcpError::Open)` - ファイルが存在しない、または読めない場合
    /// * `Err(HcpError::Parse)` - スプレッドシートとして解析できない場合
    pub fn open(path: &Path) -> Result<Self, HcpError> {
        let mut file = File::open(path).map_err(|e| HcpError::open(path, e))?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| HcpError::open(path, e))?;
        SecurityConfig::default().check_input_size(buffer.len())?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(HcpError::Parse)?;
        debug!(path = %path.display(), sheets = ?sheets.sheet_names(), "Workbook opened");

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    /// シート選択方式に基づいてシート名を解決
    fn resolve_sheet(&self, selector: &SheetSelector) -> Result<String, HcpError> {
        let names = self.sheets.sheet_names();
        match selector {
            SheetSelector::Index(index) => names.get(*index).cloned().ok_or_else(|| {
                HcpError::Config(format!(
                    "Sheet index {} is out of range in '{}' (total: {})",
                    index,
                    self.path.display(),
                    names.len()
                ))
            }),
            SheetSelector::Name(name) => {
                if names.iter().any(|n| n == name) {
                    Ok(name.clone())
                } else {
                    Err(HcpError::Config(format!(
                        "Sheet '{}' not found in '{}'",
                        name,
                        self.path.display()
                    )))
                }
            }
        }
    }

    fn range(&mut self, selector: &SheetSelector) -> Result<(String, Range<Data>), HcpError> {
        let name = self.resolve_sheet(selector)?;
        let range = self.sheets.worksheet_range(&name)?;
        Ok((name, range))
    }

    /// 見出し行付きの表を読み込む
    ///
    /// 1行目を見出しとして列名を正規化し、以降の各行を`Record`に変換します。
    /// すべてのセルが空の行は読み飛ばします。`required`に挙げた列が
    /// 見出しに存在しない場合は`HcpError::MissingColumn`を返します。
    pub fn read_table(
        &mut self,
        selector: &SheetSelector,
        required: &[&str],
    ) -> Result<Vec<Record>, HcpError> {
        let (sheet_name, range) = self.range(selector)?;
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut rows = range.rows();
        let columns: Vec<Option<String>> = match rows.next() {
            Some(header) => header_columns(header, &sheet_name),
            None => Vec::new(),
        };

        for column in required {
            if !columns.iter().flatten().any(|c| c == column) {
                return Err(HcpError::MissingColumn {
                    table: sheet_name.clone(),
                    column: (*column).to_string(),
                });
            }
        }

        let mut records = Vec::new();
        for (offset, row) in rows.enumerate() {
            // 見出し行の次から数えて、スプレッドシート上の1始まりの行番号
            let row_number = first_row + offset + 2;
            if row.iter().all(|cell| matches!(cell, Data::Empty)) {
                debug!(sheet = %sheet_name, row = row_number, "Skipping blank row");
                continue;
            }

            let mut record = Record::new(row_number);
            for (col, cell) in row.iter().enumerate() {
                if let Some(Some(column)) = columns.get(col) {
                    record.insert(column, field_value(cell));
                }
            }
            records.push(record);
        }

        info!(
            path = %self.path.display(),
            sheet = %sheet_name,
            rows = records.len(),
            "Table loaded"
        );
        Ok(records)
    }

    /// 治療データベースを位置指定で読み込む
    ///
    /// 見出しは使わず、A列をキー、F列をメモとして2行目以降を読みます。
    /// メモが空の行は収集しません。
    pub fn read_treatments(
        &mut self,
        selector: &SheetSelector,
    ) -> Result<Vec<TreatmentRecord>, HcpError> {
        let (sheet_name, range) = self.range(selector)?;
        let last_row = match range.end() {
            Some((row, _)) => row,
            None => {
                warn!(path = %self.path.display(), sheet = %sheet_name, "Treatment sheet is empty");
                return Ok(Vec::new());
            }
        };

        let mut records = Vec::new();
        for row in TREATMENT_FIRST_ROW..=last_row {
            let key = range
                .get_value((row, TREATMENT_KEY_COLUMN))
                .map(field_value)
                .and_then(|v| v.as_text());
            let note = range
                .get_value((row, TREATMENT_NOTE_COLUMN))
                .map(field_value)
                .and_then(|v| v.as_text());

            if let (Some(key), Some(note)) = (key, note) {
                records.push(TreatmentRecord::new(key, note));
            }
        }

        info!(
            path = %self.path.display(),
            sheet = %sheet_name,
            records = records.len(),
            "Treatment records loaded"
        );
        Ok(records)
    }
}

/// 見出し行から正規化済み列名を作る
///
/// 正規化後に空になる列は`None`、重複した列名は最初の列のみ採用します。
fn header_columns(header: &[Data], sheet_name: &str) -> Vec<Option<String>> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(col, cell)| {
            let raw = field_value(cell).as_text()?;
            let name = normalize_column_name(&raw);
            if name.is_empty() {
                return None;
            }
            if let Some(first) = seen.get(&name) {
                warn!(
                    sheet = %sheet_name,
                    column = %name,
                    first = first,
                    duplicate = col,
                    "Duplicate column after normalization, keeping the first"
                );
                return None;
            }
            seen.insert(name.clone(), col);
            Some(name)
        })
        .collect()
}

/// calamineのセル値を`FieldValue`に変換
pub(crate) fn field_value(cell: &Data) -> FieldValue {
    match cell {
        Data::Int(i) => FieldValue::Number(*i as f64),
        Data::Float(f) => FieldValue::Number(*f),
        Data::String(s) if s.is_empty() => FieldValue::Empty,
        Data::String(s) => FieldValue::Text(s.clone()),
        Data::Bool(b) => FieldValue::Bool(*b),
        Data::DateTime(dt) => FieldValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => FieldValue::Text(s.clone()),
        _ => FieldValue::Empty,
    }
}

/// 1回の実行で使うすべての表データ
///
/// 読み込み後は変更されません。
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    /// 対象者（行順を保持）
    pub subjects: Vec<SubjectRecord>,
    /// 計画内容表
    pub plan_content: PlanContentTable,
    /// キーごとにまとめた治療メモ（行順を保持）
    pub treatment_index: TreatmentIndex,
}

impl SourceTables {
    /// 既に読み込んだデータから生成
    pub fn new(
        subjects: Vec<SubjectRecord>,
        plan_content: PlanContentTable,
        treatments: Vec<TreatmentRecord>,
    ) -> Self {
        let treatment_index = TreatmentIndex::new(&treatments);
        Self {
            subjects,
            plan_content,
            treatment_index,
        }
    }

    /// 設定に従って3つの表を読み込む
    ///
    /// いずれかのファイルが開けない、または必須列が欠けている場合は
    /// 実行を中断するエラーを返します。
    pub fn load(config: &GeneratorConfig) -> Result<Self, HcpError> {
        let mut subject_book = WorkbookReader::open(&config.subject_workbook)?;
        let subjects = subject_book
            .read_table(&config.subject_sheet, REQUIRED_SUBJECT_COLUMNS)?
            .into_iter()
            .map(SubjectRecord::new)
            .collect();

        // 計画内容表が対象者表と同じファイルなら、開いたワークブックを再利用する
        let plan_path = config.plan_content_workbook();
        let plan_rows = if plan_path == config.subject_workbook.as_path() {
            subject_book.read_table(&config.plan_content_sheet, REQUIRED_PLAN_CONTENT_COLUMNS)?
        } else {
            WorkbookReader::open(plan_path)?
                .read_table(&config.plan_content_sheet, REQUIRED_PLAN_CONTENT_COLUMNS)?
        };

        let treatments = WorkbookReader::open(&config.treatment_workbook)?
            .read_treatments(&config.treatment_sheet)?;

        Ok(Self::new(
            subjects,
            PlanContentTable::new(plan_rows),
            treatments,
        ))
    }
}


// 実際のXLSXファイルを使う読み込みテストは統合テスト（tests/）で実装します。
