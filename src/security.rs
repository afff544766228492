//! Security Module
//!
//! セキュリティ対策を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃への対策と、出力パス構成要素の検証を提供します。

use crate::error::HcpError;

/// セキュリティ設定
///
/// ZIPパッケージ（DOCX/XLSX）処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    /// 入力バイト列のサイズを検証
    pub fn check_input_size(&self, len: usize) -> Result<(), HcpError> {
        if len as u64 > self.max_input_file_size {
            return Err(HcpError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                len, self.max_input_file_size
            )));
        }
        Ok(())
    }
}

/// ZIPエントリパスの検証
///
/// パストラバーサル攻撃を防ぐため、ZIP内のファイルパスを検証します。
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // 絶対パスを拒否（Windows形式の`C:\`やUnix形式の`/`で始まるパス）
    if path.starts_with('/') || path.starts_with("C:\\") || path.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}

/// 出力パスの構成要素（フォルダ名・ファイル名の一部）の検証
///
/// 索引名や計画種別名はそのままフォルダ名・ファイル名になるため、
/// 出力ルートの外へ書き出せないことを保証します。
///
/// # 戻り値
///
/// * `Ok(())` - 単一のパス構成要素として安全な場合
/// * `Err(String)` - 空、区切り文字を含む、`.`/`..`のいずれかの場合
pub(crate) fn validate_path_component(component: &str) -> Result<(), String> {
    if component.trim().is_empty() {
        return Err("Empty path component is not allowed".to_string());
    }

    if component == "." || component == ".." {
        return Err(format!("Relative path component is not allowed: {}", component));
    }

    if component.contains('/') || component.contains('\\') {
        return Err(format!("Path separator is not allowed: {}", component));
    }

    if component.contains('\0') {
        return Err("NUL character is not allowed in path component".to_string());
    }

    Ok(())
}
