//! Field Bindings
//!
//! テンプレートのプレースホルダーと、表の正規化済み列名との対応表。

use crate::error::HcpError;
use crate::formatter::{format_cid, format_date, format_medicaid};
use crate::types::{Record, SubjectRecord};

/// 計画種別名のプレースホルダー
pub const PLAN_NAME_TOKEN: &str = "<<HCP Name>>";

/// 索引名のプレースホルダー
pub const INDEX_NAME_TOKEN: &str = "<<Index Name>>";

/// 値の変換方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// 表示用文字列をそのまま使用
    Text,
    /// `MM/DD/YYYY` 形式の日付
    Date,
    /// Medicaid番号
    Medicaid,
    /// CID
    Cid,
}

/// プレースホルダーと列の対応
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldBinding {
    pub token: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

const fn bind(token: &'static str, column: &'static str, kind: FieldKind) -> FieldBinding {
    FieldBinding {
        token,
        column,
        kind,
    }
}

/// 対象者表の列に対応するプレースホルダー（索引名を除く）
///
/// `<<PrimaryDx >>` は既存テンプレートの表記（閉じ括弧の前に空白）に合わせたもの。
pub(crate) const SUBJECT_FIELDS: &[FieldBinding] = &[
    bind("<<CID>>", "CID", FieldKind::Cid),
    bind("<<DOB>>", "DOB", FieldKind::Date),
    bind("<<Gender>>", "Gender", FieldKind::Text),
    bind("<<Race>>", "Race", FieldKind::Text),
    bind("<<PrimaryDx >>", "PrimaryDx", FieldKind::Text),
    bind("<<PrimaryDx>>", "PrimaryDx", FieldKind::Text),
    bind("<<AdmitCode>>", "AdmitCode", FieldKind::Text),
    bind("<<Allergy>>", "Allergy", FieldKind::Text),
    bind("<<Medicaid>>", "Medicaid", FieldKind::Medicaid),
    bind("<<Res Pro>>", "ResPro", FieldKind::Text),
    bind("<<SVC Admit Criteria>>", "SVCAdmitCriteria", FieldKind::Text),
    bind("<<Risk-HIGH ALERT>>", "RiskHIGHALERT", FieldKind::Text),
    bind("<<Psych Med Risk>>", "PsychMedRisk", FieldKind::Text),
    bind("<<Cardiac Med Risk>>", "CardiacMedRisk", FieldKind::Text),
    bind("<<Neuro Risk>>", "NeuroRisk", FieldKind::Text),
    bind("<<Aspiration Risk>>", "AspirationRisk", FieldKind::Text),
];

/// 計画内容表の列に対応するプレースホルダー（9個）
pub(crate) const PLAN_CONTENT_FIELDS: &[FieldBinding] = &[
    bind("<<HCPGoal>>", "HCPGoal", FieldKind::Text),
    bind("<<HCPGoal2>>", "HCPGoal2", FieldKind::Text),
    bind("<<HMA1>>", "HMA1", FieldKind::Text),
    bind("<<HMA2>>", "HMA2", FieldKind::Text),
    bind("<<HMA3>>", "HMA3", FieldKind::Text),
    bind("<<HMA4>>", "HMA4", FieldKind::Text),
    bind("<<HMA5>>", "HMA5", FieldKind::Text),
    bind("<<HTrack1>>", "HTrack1", FieldKind::Text),
    bind("<<HTrack2>>", "HTrack2", FieldKind::Text),
];

/// 対象者表の必須列（正規化済み）
pub(crate) const REQUIRED_SUBJECT_COLUMNS: &[&str] = &[
    "UniqueIdentifier",
    "IndexName",
    "CID",
    "DOB",
    "Gender",
    "Race",
    "PrimaryDx",
    "AdmitCode",
    "Allergy",
    "Medicaid",
    "ResPro",
    "SVCAdmitCriteria",
    "RiskHIGHALERT",
    "PsychMedRisk",
    "CardiacMedRisk",
    "NeuroRisk",
    "AspirationRisk",
];

/// 計画内容表の必須列（正規化済み）
pub(crate) const REQUIRED_PLAN_CONTENT_COLUMNS: &[&str] = &[
    "HCPName", "HCPGoal", "HCPGoal2", "HMA1", "HMA2", "HMA3", "HMA4", "HMA5", "HTrack1",
    "HTrack2",
];

/// 計画内容のプレースホルダー一覧
pub fn plan_content_tokens() -> impl Iterator<Item = &'static str> {
    PLAN_CONTENT_FIELDS.iter().map(|binding| binding.token)
}

impl FieldBinding {
    /// レコードから差し込む値を取り出して変換する
    pub fn resolve(&self, record: &Record) -> Result<String, HcpError> {
        let value = record.get(self.column);
        match self.kind {
            FieldKind::Text => Ok(value.as_text().unwrap_or_default()),
            FieldKind::Date => Ok(format_date(value)),
            FieldKind::Medicaid => format_medicaid(value),
            FieldKind::Cid => format_cid(value),
        }
    }
}

/// 対象者1行分のプレースホルダー値を一括で解決する
///
/// 索引名は呼び出し元で解決済みの値を使用します。数値IDの変換に失敗した
/// 場合は最初のエラーを返します。
pub(crate) fn resolve_subject_fields(
    subject: &SubjectRecord,
    index_name: &str,
) -> Result<Vec<(&'static str, String)>, HcpError> {
    let mut values = Vec::with_capacity(SUBJECT_FIELDS.len() + 1);
    values.push((INDEX_NAME_TOKEN, index_name.to_string()));
    for binding in SUBJECT_FIELDS {
        values.push((binding.token, binding.resolve(subject.record())?));
    }
    Ok(values)
}
