//! Plan Generator
//!
//! 対象者ごと・計画種別ごとに文書を生成する実行ドライバー。
//!
//! # 処理フロー
//!
//! 1. 3つの表とテンプレートを読み込む（失敗した場合は実行全体を中断）
//! 2. 対象者表の行順に、各行について
//!    - IndexNameを確認（欠損・不正な場合は行をスキップ）
//!    - 対象者のプレースホルダー値を解決
//! 3. 計画種別リストの順に、各計画種別について
//!    - テンプレートから新しい文書を作り、プレースホルダーを置換
//!    - 保存先フォルダーを用意して中間保存
//!    - 治療メモを差し込み、同じパスに最終保存

use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::api::{InjectionOutcome, NumericErrorPolicy, StampOutcome};
use crate::builder::GeneratorConfig;
use crate::document::{PlanDocument, Template};
use crate::error::HcpError;
use crate::fields::{resolve_subject_fields, PLAN_CONTENT_FIELDS, PLAN_NAME_TOKEN};
use crate::output::{ensure_folder, OutputLocation};
use crate::parser::SourceTables;
use crate::security::validate_path_component;
use crate::types::SubjectRecord;

/// 生成した1文書の記録
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedDocument {
    /// 対象者表の行番号（1始まり）
    pub row: usize,
    /// 計画種別名
    pub plan_type: String,
    /// 保存先
    pub path: PathBuf,
    /// 治療メモ差し込みの結果
    pub injection: InjectionOutcome,
}

/// スキップした対象者の記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSubject {
    /// 対象者表の行番号（1始まり）
    pub row: usize,
    /// スキップした理由
    pub reason: String,
}

/// 実行結果の集計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// 生成した文書（生成順。計画種別が重複する場合は同じパスが複数回現れる）
    pub documents_written: Vec<GeneratedDocument>,
    /// スキップした対象者
    pub subjects_skipped: Vec<SkippedSubject>,
    /// 計画内容表に見つからなかった計画種別（重複なし）
    pub plans_without_content: Vec<String>,
    /// 治療メモのラベルが見つからなかった文書
    pub labels_missing: Vec<PathBuf>,
}

impl RunSummary {
    /// 生成したファイルの数（同じパスへの上書きは1つとして数える）
    pub fn distinct_files(&self) -> usize {
        let mut paths: Vec<&Path> = self
            .documents_written
            .iter()
            .map(|doc| doc.path.as_path())
            .collect();
        paths.sort();
        paths.dedup();
        paths.len()
    }

    fn skip(&mut self, row: usize, reason: impl Into<String>) {
        self.subjects_skipped.push(SkippedSubject {
            row,
            reason: reason.into(),
        });
    }
}

/// 計画文書の生成器
///
/// `GeneratorBuilder::build()`で構築します。
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    config: GeneratorConfig,
}

impl PlanGenerator {
    pub(crate) fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// 設定
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// 入力ファイルを読み込み、すべての文書を生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunSummary)` - 実行結果の集計
    /// * `Err(HcpError)` - 入力ファイルを読めない、必須列がない、出力に失敗した、
    ///   または数値IDの方針が`Abort`で不正な値があった場合
    pub fn run(&self) -> Result<RunSummary, HcpError> {
        info!(
            subjects = %self.config.subject_workbook.display(),
            template = %self.config.template_path.display(),
            output_root = %self.config.output_root.display(),
            "Starting healthcare plan generation"
        );

        let tables = SourceTables::load(&self.config)?;
        let template = Template::open(&self.config.template_path)?;
        info!(path = %template.path().display(), "Template loaded");

        let summary = self.run_with(&tables, &template)?;
        info!(
            documents = summary.documents_written.len(),
            files = summary.distinct_files(),
            skipped = summary.subjects_skipped.len(),
            "Healthcare plans updated successfully"
        );
        Ok(summary)
    }

    /// 読み込み済みの表とテンプレートからすべての文書を生成する
    pub fn run_with(
        &self,
        tables: &SourceTables,
        template: &Template,
    ) -> Result<RunSummary, HcpError> {
        let mut summary = RunSummary::default();

        for subject in &tables.subjects {
            let row = subject.row_number();
            let Some(index_name) = subject.index_name() else {
                warn!(row, "Skipping row with missing IndexName");
                summary.skip(row, "missing IndexName");
                continue;
            };
            if let Err(e) = validate_path_component(&index_name) {
                error!(row, index_name = %index_name, error = %e, "Skipping row with invalid IndexName");
                summary.skip(row, format!("invalid IndexName '{}': {}", index_name, e));
                continue;
            }
            let unique_identifier = subject.unique_identifier();
            if let Err(e) = validate_path_component(&unique_identifier) {
                error!(row, unique_identifier = %unique_identifier, error = %e, "Skipping row with invalid UniqueIdentifier");
                summary.skip(
                    row,
                    format!("invalid UniqueIdentifier '{}': {}", unique_identifier, e),
                );
                continue;
            }

            let values = match resolve_subject_fields(subject, &index_name) {
                Ok(values) => values,
                Err(e @ HcpError::InvalidNumber { .. }) => match self.config.numeric_error_policy {
                    NumericErrorPolicy::Abort => return Err(e),
                    NumericErrorPolicy::SkipSubject => {
                        error!(row, index_name = %index_name, error = %e, "Skipping row with invalid number");
                        summary.skip(row, e.to_string());
                        continue;
                    }
                },
                Err(e) => return Err(e),
            };

            let context = SubjectContext {
                subject,
                unique_identifier,
                index_name,
                values,
            };
            for plan_type in &self.config.plan_types {
                self.generate(tables, template, &context, plan_type, &mut summary)?;
            }
        }

        Ok(summary)
    }

    /// 1対象者・1計画種別の文書を生成する
    fn generate(
        &self,
        tables: &SourceTables,
        template: &Template,
        context: &SubjectContext<'_>,
        plan_type: &str,
        summary: &mut RunSummary,
    ) -> Result<(), HcpError> {
        let row = context.subject.row_number();
        let mut document = template.instantiate()?;

        for (token, value) in &context.values {
            document.apply(token, Some(value.as_str()));
        }
        document.apply(PLAN_NAME_TOKEN, Some(plan_type));

        match tables.plan_content.lookup(plan_type) {
            Some(content) => {
                for binding in PLAN_CONTENT_FIELDS {
                    let value = binding.resolve(content)?;
                    document.apply(binding.token, Some(value.as_str()));
                }
            }
            None => {
                warn!(plan_type, "No plan content found, removing plan content placeholders");
                for binding in PLAN_CONTENT_FIELDS {
                    document.apply(binding.token, None);
                }
                if !summary.plans_without_content.iter().any(|p| p == plan_type) {
                    summary.plans_without_content.push(plan_type.to_string());
                }
            }
        }

        if let Some(date) = self.config.effective_date {
            document.stamp_effective_date(date);
        }

        let location = OutputLocation::new(
            &self.config.output_root,
            &context.unique_identifier,
            &context.index_name,
            plan_type,
        )?;
        ensure_folder(&self.config.output_root, &context.index_name)?;
        let path = location.path();

        if self.config.write_intermediate {
            document.save(&path)?;
            debug!(path = %path.display(), "Intermediate document saved");
        }

        let injection = document.inject_treatments(
            location.file_name(),
            &tables.treatment_index,
            &self.config.treatment_label,
            &self.config.bullet,
        );
        if !matches!(injection, InjectionOutcome::Injected { .. }) {
            summary.labels_missing.push(path.clone());
        }

        document.save(&path)?;
        info!(
            row,
            index_name = %context.index_name,
            plan_type,
            path = %path.display(),
            "Healthcare plan saved"
        );

        summary.documents_written.push(GeneratedDocument {
            row,
            plan_type: plan_type.to_string(),
            path,
            injection,
        });
        Ok(())
    }
}

/// 1対象者分の解決済みの値
struct SubjectContext<'a> {
    subject: &'a SubjectRecord,
    unique_identifier: String,
    index_name: String,
    values: Vec<(&'static str, String)>,
}

/// 既存の文書に有効日を書き込み、`Updated_<元のファイル名>`として保存する
///
/// # 引数
///
/// * `input` - 既存の文書
/// * `output_folder` - 保存先フォルダー（存在しない場合は作成）
/// * `date` - 書き込む有効日
///
/// # 戻り値
///
/// * `Ok((PathBuf, StampOutcome))` - 保存先と書き込み結果
///   （行が見つからない場合も、元の内容のまま保存します）
/// * `Err(HcpError)` - 読み込みまたは保存に失敗した場合
pub fn stamp_file(
    input: &Path,
    output_folder: &Path,
    date: NaiveDate,
) -> Result<(PathBuf, StampOutcome), HcpError> {
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            HcpError::Config(format!("Input path has no file name: {}", input.display()))
        })?;

    let mut document = PlanDocument::open(input)?;
    info!(path = %input.display(), "Document loaded");

    let outcome = document.stamp_effective_date(date);
    let output = output_folder.join(format!("Updated_{}", file_name));
    document.save(&output)?;
    info!(path = %output.display(), "Document saved");

    Ok((output, outcome))
}
