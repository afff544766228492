//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

/// hcpgenクレート全体で使用するエラー型
///
/// 表データの読み込み、テンプレート文書の解析、プレースホルダー置換、
/// 出力文書の保存中に発生するすべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの分類
///
/// - 起動時の致命的エラー: `Open`, `Parse`, `MissingColumn`, `InvalidDocument`, `Config`
/// - データ品質エラー: `InvalidNumber`（ポリシーに応じて行スキップまたは中断）
/// - 低レベルのエラー: `Io`, `Xml`, `Utf8`, `Zip`, `Json`
///
/// # 使用例
///
/// ```rust,no_run
/// use hcpgen::HcpError;
/// use std::fs::File;
///
/// fn read_template(path: &str) -> Result<(), HcpError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     // ... 処理 ...
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum HcpError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力ファイル（表データまたはテンプレート）を開けなかったエラー
    ///
    /// どのファイルが原因かを利用者に示すため、パスを保持します。
    #[error("Cannot open '{}': {source}", path.display())]
    Open {
        /// 開こうとしたファイルのパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// スプレッドシートの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse spreadsheet: {0}")]
    Parse(#[from] calamine::Error),

    /// 文書XMLの解析・書き出し中に発生したエラー（quick-xml由来）
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの読み書きエラー
    ///
    /// DOCX/XLSXはいずれもZIPパッケージのため、破損したファイルはここに分類されます。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 設定ファイル（JSON）の解析エラー
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `GeneratorBuilder::build()`時に検出されます。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use hcpgen::{GeneratorBuilder, HcpError};
    ///
    /// let result = GeneratorBuilder::new().build();
    ///
    /// match result {
    ///     Err(HcpError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 必須列が表に存在しないエラー
    ///
    /// 列名は正規化後（英数字のみ）の名前で報告されます。
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn {
        /// 表の名前（シート名など）
        table: String,
        /// 見つからなかった正規化済み列名
        column: String,
    },

    /// テンプレートが文書パッケージとして不正なエラー
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// 数値IDとして解釈できない値が見つかったエラー
    ///
    /// Medicaid番号やCIDなど、整数であるべき列に数値以外が入っている場合に発生します。
    #[error("Column '{column}' holds a non-numeric value '{value}'")]
    InvalidNumber {
        /// 列名
        column: String,
        /// 問題のあった値
        value: String,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、ファイルサイズ制限などの違反時に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl HcpError {
    /// パス付きのオープンエラーを生成する
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HcpError::Open {
            path: path.into(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for HcpError {
    fn from(err: zip::result::ZipError) -> Self {
        HcpError::Zip(err.to_string())
    }
}
