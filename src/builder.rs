//! Builder Module
//!
//! 生成処理の設定と、Fluent Builder APIによる`PlanGenerator`の構築を提供する。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::{
    NumericErrorPolicy, SheetSelector, DEFAULT_BULLET, DEFAULT_PLAN_TYPES,
    DEFAULT_TREATMENT_LABEL,
};
use crate::error::HcpError;
use crate::generator::PlanGenerator;
use crate::security::validate_path_component;

/// 生成処理の設定
///
/// JSONファイルから読み込むことができます。省略した項目には既定値が使われます。
///
/// ```json
/// {
///   "subject_workbook": "data/HCP Goal Track.xlsx",
///   "template_path": "templates/Healthcare Plan Template.docx",
///   "treatment_workbook": "data/Treatment Database.xlsx",
///   "output_root": "out",
///   "subject_sheet": { "name": "Sheet1" },
///   "numeric_error_policy": "abort"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// 対象者表のワークブック
    pub subject_workbook: PathBuf,

    /// 対象者表のシート
    pub subject_sheet: SheetSelector,

    /// 計画内容表のワークブック（`None`の場合は対象者表と同じファイル）
    pub plan_content_workbook: Option<PathBuf>,

    /// 計画内容表のシート
    pub plan_content_sheet: SheetSelector,

    /// 治療データベースのワークブック
    pub treatment_workbook: PathBuf,

    /// 治療データベースのシート（既定は最初のシート）
    pub treatment_sheet: SheetSelector,

    /// 文書テンプレート
    pub template_path: PathBuf,

    /// 出力ルートフォルダー
    pub output_root: PathBuf,

    /// 生成する計画種別（この順序で生成）
    pub plan_types: Vec<String>,

    /// 治療メモを差し込むセルのラベル
    pub treatment_label: String,

    /// 治療メモの各段落に付ける箇条書き記号
    pub bullet: String,

    /// 数値IDが不正な場合の扱い
    pub numeric_error_policy: NumericErrorPolicy,

    /// 治療メモ差し込み前の中間保存を行うか
    pub write_intermediate: bool,

    /// 生成文書に書き込む有効日
    pub effective_date: Option<NaiveDate>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            subject_workbook: PathBuf::from("HCP Goal Track.xlsx"),
            subject_sheet: SheetSelector::name("Sheet1"),
            plan_content_workbook: None,
            plan_content_sheet: SheetSelector::name("Sheet2"),
            treatment_workbook: PathBuf::from("Treatment Database.xlsx"),
            treatment_sheet: SheetSelector::Index(0),
            template_path: PathBuf::from("Healthcare Plan Template.docx"),
            output_root: PathBuf::from("."),
            plan_types: DEFAULT_PLAN_TYPES.iter().map(|s| s.to_string()).collect(),
            treatment_label: DEFAULT_TREATMENT_LABEL.to_string(),
            bullet: DEFAULT_BULLET.to_string(),
            numeric_error_policy: NumericErrorPolicy::default(),
            write_intermediate: true,
            effective_date: None,
        }
    }
}

impl GeneratorConfig {
    /// JSONファイルから設定を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(GeneratorConfig)` - 読み込みに成功した場合
    /// * `Err(HcpError::Open)` - ファイルを読めない場合
    /// * `Err(HcpError::Json)` - JSONとして不正、または未知の項目を含む場合
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HcpError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| HcpError::open(path, e))?;
        let config = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// 計画内容表のワークブック（未指定の場合は対象者表のワークブック）
    pub fn plan_content_workbook(&self) -> &Path {
        self.plan_content_workbook
            .as_deref()
            .unwrap_or(&self.subject_workbook)
    }

    /// 設定を検証する
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 設定が有効な場合
    /// * `Err(HcpError::Config)` - パスが空、計画種別が空、ラベルが空、
    ///   または計画種別名がファイル名として使えない場合
    pub fn validate(&self) -> Result<(), HcpError> {
        let paths = [
            ("subject_workbook", self.subject_workbook.as_path()),
            ("treatment_workbook", self.treatment_workbook.as_path()),
            ("template_path", self.template_path.as_path()),
            ("output_root", self.output_root.as_path()),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(HcpError::Config(format!("'{}' must not be empty", name)));
            }
        }
        if let Some(path) = &self.plan_content_workbook {
            if path.as_os_str().is_empty() {
                return Err(HcpError::Config(
                    "'plan_content_workbook' must not be empty".to_string(),
                ));
            }
        }

        if self.plan_types.is_empty() {
            return Err(HcpError::Config(
                "At least one plan type is required".to_string(),
            ));
        }
        for plan_type in &self.plan_types {
            validate_path_component(plan_type).map_err(|e| {
                HcpError::Config(format!("Invalid plan type '{}': {}", plan_type, e))
            })?;
        }

        if self.treatment_label.trim().is_empty() {
            return Err(HcpError::Config(
                "Treatment label must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `PlanGenerator`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目に既定値があり、必要な設定のみを上書きできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use hcpgen::{GeneratorBuilder, NumericErrorPolicy};
///
/// # fn main() -> Result<(), hcpgen::HcpError> {
/// let generator = GeneratorBuilder::new()
///     .with_subject_workbook("data/HCP Goal Track.xlsx")
///     .with_treatment_workbook("data/Treatment Database.xlsx")
///     .with_template("templates/Healthcare Plan Template.docx")
///     .with_output_root("out")
///     .with_numeric_error_policy(NumericErrorPolicy::Abort)
///     .build()?;
/// let summary = generator.run()?;
/// println!("{} documents written", summary.documents_written.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct GeneratorBuilder {
    /// 内部設定（構築中）
    config: GeneratorConfig,
}

impl GeneratorBuilder {
    /// 既定の設定を持つビルダーを生成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の設定から開始する
    pub fn from_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// 対象者表のワークブックを指定する
    pub fn with_subject_workbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.subject_workbook = path.into();
        self
    }

    /// 対象者表のシートを指定する
    pub fn with_subject_sheet(mut self, selector: SheetSelector) -> Self {
        self.config.subject_sheet = selector;
        self
    }

    /// 計画内容表のワークブックを指定する
    pub fn with_plan_content_workbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.plan_content_workbook = Some(path.into());
        self
    }

    /// 計画内容表のシートを指定する
    pub fn with_plan_content_sheet(mut self, selector: SheetSelector) -> Self {
        self.config.plan_content_sheet = selector;
        self
    }

    /// 治療データベースのワークブックを指定する
    pub fn with_treatment_workbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.treatment_workbook = path.into();
        self
    }

    /// 治療データベースのシートを指定する
    pub fn with_treatment_sheet(mut self, selector: SheetSelector) -> Self {
        self.config.treatment_sheet = selector;
        self
    }

    /// 文書テンプレートを指定する
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_path = path.into();
        self
    }

    /// 出力ルートフォルダーを指定する
    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    /// 生成する計画種別を指定する
    ///
    /// # 引数
    ///
    /// * `plan_types` - 計画種別名（この順序で生成。重複した名前は後の生成が上書き）
    pub fn with_plan_types<I, S>(mut self, plan_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.plan_types = plan_types.into_iter().map(Into::into).collect();
        self
    }

    /// 治療メモを差し込むセルのラベルを指定する
    pub fn with_treatment_label(mut self, label: impl Into<String>) -> Self {
        self.config.treatment_label = label.into();
        self
    }

    /// 箇条書き記号を指定する
    pub fn with_bullet(mut self, bullet: impl Into<String>) -> Self {
        self.config.bullet = bullet.into();
        self
    }

    /// 数値IDが不正な場合の扱いを指定する
    pub fn with_numeric_error_policy(mut self, policy: NumericErrorPolicy) -> Self {
        self.config.numeric_error_policy = policy;
        self
    }

    /// 治療メモ差し込み前の中間保存を行うかを指定する
    ///
    /// 中間ファイルは最終保存で上書きされるため、`false`にしても結果は変わりません。
    pub fn write_intermediate(mut self, enabled: bool) -> Self {
        self.config.write_intermediate = enabled;
        self
    }

    /// 生成文書に書き込む有効日を指定する
    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.config.effective_date = Some(date);
        self
    }

    /// 設定を検証して`PlanGenerator`を構築する
    ///
    /// ファイルの存在は確認しません（実行開始時に読み込みます）。
    ///
    /// # 戻り値
    ///
    /// * `Ok(PlanGenerator)` - 設定が有効な場合
    /// * `Err(HcpError::Config)` - 設定が無効な場合
    pub fn build(self) -> Result<PlanGenerator, HcpError> {
        self.config.validate()?;
        Ok(PlanGenerator::new(self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = GeneratorBuilder::new();
        assert_eq!(builder.config.subject_sheet, SheetSelector::name("Sheet1"));
        assert_eq!(builder.config.plan_content_sheet, SheetSelector::name("Sheet2"));
        assert_eq!(builder.config.treatment_sheet, SheetSelector::Index(0));
        assert_eq!(builder.config.plan_types.len(), 7);
        assert_eq!(builder.config.treatment_label, "Treatments and Interventions");
        assert_eq!(builder.config.bullet, "• ");
        assert_eq!(
            builder.config.numeric_error_policy,
            NumericErrorPolicy::SkipSubject
        );
        assert!(builder.config.write_intermediate);
        assert!(builder.config.effective_date.is_none());
    }

    #[test]
    fn test_plan_content_workbook_falls_back_to_subject_workbook() {
        let config = GeneratorConfig {
            subject_workbook: PathBuf::from("a.xlsx"),
            ..GeneratorConfig::default()
        };
        assert_eq!(config.plan_content_workbook(), Path::new("a.xlsx"));

        let builder = GeneratorBuilder::from_config(config).with_plan_content_workbook("b.xlsx");
        assert_eq!(builder.config.plan_content_workbook(), Path::new("b.xlsx"));
    }

    #[test]
    fn test_with_setters() {
        let date = NaiveDate::from_ymd_opt(2021, 10, 7).unwrap();
        let builder = GeneratorBuilder::new()
            .with_plan_types(["Cardiac"])
            .with_bullet("- ")
            .with_numeric_error_policy(NumericErrorPolicy::Abort)
            .write_intermediate(false)
            .with_effective_date(date);

        assert_eq!(builder.config.plan_types, vec!["Cardiac".to_string()]);
        assert_eq!(builder.config.bullet, "- ");
        assert_eq!(builder.config.numeric_error_policy, NumericErrorPolicy::Abort);
        assert!(!builder.config.write_intermediate);
        assert_eq!(builder.config.effective_date, Some(date));
    }

    #[test]
    fn test_build_success() {
        assert!(GeneratorBuilder::new().build().is_ok());
    }

    #[test]
    fn test_build_with_empty_plan_types() {
        let result = GeneratorBuilder::new()
            .with_plan_types(Vec::<String>::new())
            .build();
        match result {
            Err(HcpError::Config(msg)) => assert!(msg.contains("plan type")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_invalid_plan_type() {
        let result = GeneratorBuilder::new()
            .with_plan_types(["Cardiac/Plan"])
            .build();
        match result {
            Err(HcpError::Config(msg)) => assert!(msg.contains("Cardiac/Plan")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_empty_label_or_path() {
        let result = GeneratorBuilder::new().with_treatment_label("  ").build();
        assert!(matches!(result, Err(HcpError::Config(_))));

        let result = GeneratorBuilder::new().with_template("").build();
        match result {
            Err(HcpError::Config(msg)) => assert!(msg.contains("template_path")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_config_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hcpgen.json");
        fs::write(
            &path,
            r#"{
                "subject_workbook": "subjects.xlsx",
                "treatment_sheet": { "name": "Treatments" },
                "plan_types": ["Cardiac Health Care Plan"],
                "numeric_error_policy": "abort",
                "effective_date": "2021-10-07"
            }"#,
        )
        .unwrap();

        let config = GeneratorConfig::from_json_file(&path).unwrap();
        assert_eq!(config.subject_workbook, PathBuf::from("subjects.xlsx"));
        assert_eq!(config.treatment_sheet, SheetSelector::name("Treatments"));
        assert_eq!(config.plan_types, vec!["Cardiac Health Care Plan".to_string()]);
        assert_eq!(config.numeric_error_policy, NumericErrorPolicy::Abort);
        assert_eq!(config.effective_date, NaiveDate::from_ymd_opt(2021, 10, 7));
        // 省略した項目は既定値
        assert_eq!(config.subject_sheet, SheetSelector::name("Sheet1"));
        assert!(config.write_intermediate);
    }

    #[test]
    fn test_example_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/hcpgen.example.json");
        let config = GeneratorConfig::from_json_file(path).unwrap();
        assert_eq!(config.output_root, PathBuf::from("out"));
        assert_eq!(config.plan_types.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "subject_wrokbook": "typo.xlsx" }"#).unwrap();
        assert!(matches!(
            GeneratorConfig::from_json_file(&path),
            Err(HcpError::Json(_))
        ));
    }
}
