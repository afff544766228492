//! Public API Types
//!
//! 公開APIで使用する列挙型と既定値を定義するモジュール。

use serde::{Deserialize, Serialize};

/// 既定の計画種別リスト
///
/// 出力順はこのリストの順序に従います。
/// "Neurological Management Health Care Plan" は2回現れ、2回目の生成が
/// 同じパスの1回目の出力を上書きします。
pub const DEFAULT_PLAN_TYPES: [&str; 7] = [
    "Preventative and Routine Healthcare Maintenance Healthcare Plan",
    "Reproductive System Management Healthcare Plan",
    "Musculoskeletal Management and Falls Risk Healthcare Plan",
    "Skin Integumentary Management Healthcare Plan",
    "Neurological Management Health Care Plan",
    "Bowel and Bladder Management Healthcare Plan",
    "Neurological Management Health Care Plan",
];

/// 治療項目を差し込むセルを示すラベル（既定値）
pub const DEFAULT_TREATMENT_LABEL: &str = "Treatments and Interventions";

/// 治療項目の各段落に付ける箇条書き記号（既定値）
pub const DEFAULT_BULLET: &str = "• ";

/// 有効日を書き込む行を示すラベル
pub const EFFECTIVE_DATE_LABEL: &str = "Effective Date";

/// シート選択方式
///
/// 読み込むシートを選択する方法を指定します。
///
/// JSON設定では `{"name": "Sheet1"}` または `{"index": 0}` と記述します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelector {
    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetSelector::Index(0)` は最初のシート（通常はアクティブシート）を選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),
}

impl SheetSelector {
    /// シート名で選択するセレクターを生成
    pub fn name(name: impl Into<String>) -> Self {
        SheetSelector::Name(name.into())
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

/// 数値ID列（Medicaid, CID）に数値以外の値があった場合の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NumericErrorPolicy {
    /// 対象者の行をスキップし、エラーを記録して次の行へ進む（デフォルト）
    #[default]
    SkipSubject,

    /// 実行全体を中断し、`HcpError::InvalidNumber`を返す
    Abort,
}

/// 治療項目差し込みの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOutcome {
    /// ラベルの隣のセルを書き換えた（`notes`は書き込んだ項目数、0の場合はセルを空にした）
    Injected {
        /// 書き込んだ箇条書き段落の数
        notes: usize,
    },

    /// ラベルは見つかったが、同じ行に次のセルが存在しなかった
    NoAdjacentCell,

    /// どの表にもラベルが見つからなかった
    LabelNotFound,
}

/// 有効日書き込みの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StampOutcome {
    /// 有効日を書き込んだ
    Stamped,

    /// 文書本体に表が存在しない
    NoTable,

    /// 最初の表に "Effective Date" 行が存在しない（または2列目がない）
    RowNotFound,
}
