//! Document Module
//!
//! DOCXテンプレートの読み込み、プレースホルダー置換、表セルへの差し込み、保存を提供します。

mod inject;
mod package;
mod placeholder;
mod text;
mod xml;

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::HcpError;
use crate::security::SecurityConfig;
use package::DocxPackage;
use xml::{XmlElement, XmlTree};

/// 本文パートの名前
const BODY_PART: &str = "word/document.xml";

/// 文書パートの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartKind {
    Body,
    Header,
    Footer,
}

/// 解析済みのテキストパート
#[derive(Debug, Clone)]
pub(crate) struct TextPart {
    pub name: String,
    pub kind: PartKind,
    pub tree: XmlTree,
}

fn part_kind(name: &str) -> Option<PartKind> {
    if name == BODY_PART {
        return Some(PartKind::Body);
    }
    let file = name.strip_prefix("word/")?;
    if file.contains('/') || !file.ends_with(".xml") {
        return None;
    }
    if file.starts_with("header") {
        Some(PartKind::Header)
    } else if file.starts_with("footer") {
        Some(PartKind::Footer)
    } else {
        None
    }
}

/// 編集中の文書
///
/// テンプレートから生成した文書インスタンスで、本文・ヘッダー・フッターの
/// 各パートを解析済みツリーとして保持します。1回の生成でのみ使用し、
/// 保存後は破棄します。
#[derive(Debug, Clone)]
pub struct PlanDocument {
    package: DocxPackage,
    parts: Vec<TextPart>,
}

impl PlanDocument {
    /// バイト列から文書を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(PlanDocument)` - 読み込みに成功した場合
    /// * `Err(HcpError::Zip)` - ZIPパッケージとして読めない場合
    /// * `Err(HcpError::InvalidDocument)` - 本文パート（`word/document.xml`）がない場合
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HcpError> {
        let package = DocxPackage::from_bytes(bytes)?;

        let mut parts = Vec::new();
        for name in package.names() {
            let Some(kind) = part_kind(name) else {
                continue;
            };
            let data = package.get(name).unwrap_or_default();
            parts.push(TextPart {
                name: name.to_string(),
                kind,
                tree: XmlTree::parse(data)?,
            });
        }

        if !parts.iter().any(|part| part.kind == PartKind::Body) {
            return Err(HcpError::InvalidDocument(format!(
                "Missing main document part '{}'",
                BODY_PART
            )));
        }

        Ok(Self { package, parts })
    }

    /// ファイルから文書を読み込む
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HcpError> {
        let path = path.as_ref();
        let bytes = read_file(path)?;
        let document = Self::from_bytes(&bytes)?;
        debug!(path = %path.display(), parts = document.parts.len(), "Document loaded");
        Ok(document)
    }

    /// 文書をバイト列に書き出す
    pub fn to_bytes(&self) -> Result<Vec<u8>, HcpError> {
        let mut replaced = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            replaced.push((part.name.as_str(), part.tree.to_bytes()?));
        }

        let mut out = Cursor::new(Vec::new());
        self.package.write(&mut out, &replaced)?;
        Ok(out.into_inner())
    }

    /// 文書をファイルに保存する
    ///
    /// 既存のファイルは上書きします。親フォルダーがなければ作成します。
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HcpError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| HcpError::open(parent, e))?;
        }
        let file = File::create(path).map_err(|e| HcpError::open(path, e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;
        debug!(path = %path.display(), bytes = bytes.len(), "Document saved");
        Ok(())
    }

    pub(crate) fn body(&self) -> Option<&XmlElement> {
        self.parts
            .iter()
            .find(|part| part.kind == PartKind::Body)
            .and_then(|part| part.tree.root())
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut XmlElement> {
        self.parts
            .iter_mut()
            .find(|part| part.kind == PartKind::Body)
            .and_then(|part| part.tree.root_mut())
    }

    /// 本文の全段落のテキスト（表のセル内を含む、文書順）
    pub fn paragraph_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        if let Some(body) = self.body() {
            text::collect_paragraph_texts(body, &mut texts);
        }
        texts
    }

    /// ヘッダー・フッターの全段落のテキスト
    pub fn header_footer_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        for part in &self.parts {
            if part.kind == PartKind::Body {
                continue;
            }
            if let Some(root) = part.tree.root() {
                text::collect_paragraph_texts(root, &mut texts);
            }
        }
        texts
    }

    /// 文書全体（本文・ヘッダー・フッター）に含まれる`needle`の出現回数
    ///
    /// 段落単位で数えるため、段落をまたぐ出現は数えません。
    pub fn count_occurrences(&self, needle: &str) -> usize {
        if needle.is_empty() {
            return 0;
        }
        self.paragraph_texts()
            .iter()
            .chain(self.header_footer_texts().iter())
            .map(|text| text.matches(needle).count())
            .sum()
    }

    /// 本文中の全表の行を、セルのテキストの配列として取得（文書順）
    pub fn table_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        if let Some(body) = self.body() {
            collect_rows(body, &mut rows);
        }
        rows
    }
}

fn collect_rows(element: &XmlElement, rows: &mut Vec<Vec<String>>) {
    if element.local_name() == "tr" {
        rows.push(
            element
                .child_elements()
                .filter(|child| child.local_name() == "tc")
                .map(text::cell_text)
                .collect(),
        );
    }
    for child in element.child_elements() {
        collect_rows(child, rows);
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, HcpError> {
    let mut file = File::open(path).map_err(|e| HcpError::open(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| HcpError::open(path, e))?;
    SecurityConfig::default().check_input_size(bytes.len())?;
    Ok(bytes)
}

/// 文書テンプレート
///
/// 起動時に一度だけ読み込み・検証し、生成ごとに新しい文書インスタンスを作ります。
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl Template {
    /// テンプレートファイルを読み込み、文書として解析できることを確認する
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HcpError> {
        let path = path.as_ref();
        let bytes = read_file(path)?;
        Self::from_bytes(path, bytes)
    }

    /// 読み込み済みのバイト列からテンプレートを作る
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self, HcpError> {
        let template = Self {
            path: path.into(),
            bytes,
        };
        template.instantiate()?;
        debug!(path = %template.path.display(), "Template validated");
        Ok(template)
    }

    /// テンプレートのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// テンプレートから新しい文書インスタンスを作る
    ///
    /// 呼び出しごとに独立したインスタンスを返します。
    pub fn instantiate(&self) -> Result<PlanDocument, HcpError> {
        PlanDocument::from_bytes(&self.bytes)
    }
}
