//! Output Location Module
//!
//! 生成文書の保存先（`<出力ルート>/<IndexName>/<ファイル名>`）の決定とフォルダー作成。

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::HcpError;
use crate::security::validate_path_component;

/// 生成文書の保存先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    folder: PathBuf,
    file_name: String,
}

impl OutputLocation {
    /// 保存先を決定する
    ///
    /// # 引数
    ///
    /// * `output_root` - 出力ルートフォルダー
    /// * `unique_identifier` - 対象者の一意識別子（欠損時は"Unknown"）
    /// * `index_name` - 対象者のIndexName（フォルダー名になる）
    /// * `plan_type` - 計画種別名
    ///
    /// # 戻り値
    ///
    /// * `Ok(OutputLocation)` - 保存先
    /// * `Err(HcpError::SecurityViolation)` - パスの構成要素として使えない名前が含まれる場合
    pub fn new(
        output_root: &Path,
        unique_identifier: &str,
        index_name: &str,
        plan_type: &str,
    ) -> Result<Self, HcpError> {
        for (what, component) in [("index name", index_name), ("plan type", plan_type)] {
            validate_path_component(component).map_err(|e| {
                HcpError::SecurityViolation(format!("Invalid {} '{}': {}", what, component, e))
            })?;
        }

        let file_name = file_name_key(unique_identifier, index_name, plan_type);
        validate_path_component(&file_name).map_err(|e| {
            HcpError::SecurityViolation(format!("Invalid file name '{}': {}", file_name, e))
        })?;

        Ok(Self {
            folder: output_root.join(index_name),
            file_name,
        })
    }

    /// 保存先フォルダー
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// ファイル名（治療データベースの照合キーと同じ）
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 保存先のフルパス
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}

/// 治療データベースの照合キー
///
/// `<UniqueIdentifier>_<IndexName>_<PlanType>.docx`。出力ファイル名と同じ文字列です。
pub fn file_name_key(unique_identifier: &str, index_name: &str, plan_type: &str) -> String {
    format!("{}_{}_{}.docx", unique_identifier, index_name, plan_type)
}

/// 対象者のフォルダーを用意する
///
/// 既に存在する場合は何もしません。同じ名前で何度呼び出しても、
/// フォルダーは1つだけ作られ、エラーにもなりません。
///
/// # 戻り値
///
/// * `Ok(PathBuf)` - フォルダーのパス
/// * `Err(HcpError)` - 名前が不正、またはフォルダーを作成できない場合
pub fn ensure_folder(output_root: &Path, index_name: &str) -> Result<PathBuf, HcpError> {
    validate_path_component(index_name).map_err(|e| {
        HcpError::SecurityViolation(format!("Invalid index name '{}': {}", index_name, e))
    })?;

    let folder = output_root.join(index_name);
    if folder.is_dir() {
        return Ok(folder);
    }
    fs::create_dir_all(&folder).map_err(|e| HcpError::open(&folder, e))?;
    info!(folder = %folder.display(), "Created folder");
    Ok(folder)
}
