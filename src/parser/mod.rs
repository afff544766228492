//! Parser Module
//!
//! calamineを使用した表データ（対象者表・計画内容表・治療データベース）の読み込み。

mod columns;
mod workbook;

pub use columns::normalize_column_name;
pub use workbook::{SourceTables, TREATMENT_FIRST_ROW, TREATMENT_KEY_COLUMN, TREATMENT_NOTE_COLUMN};
