//! DOCX Package
//!
//! ZIPパッケージとしての文書の読み込み・書き出し。
//! エントリの順序と圧縮方式を保持したまま、変更したパートだけを差し替えます。

use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::HcpError;
use crate::security::{validate_zip_path, SecurityConfig};

/// パッケージ内の1エントリ
#[derive(Debug, Clone)]
pub(crate) struct PackageEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub is_dir: bool,
}

/// ZIPパッケージ全体
#[derive(Debug, Clone)]
pub(crate) struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    /// ZIPパッケージを読み込む
    ///
    /// エントリ数・サイズ・パスについてセキュリティ制限を検証します。
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, HcpError> {
        let security_config = SecurityConfig::default();
        let mut archive = ZipArchive::new(reader)?;

        // セキュリティチェック: ファイル数の上限
        if archive.len() > security_config.max_file_count {
            return Err(HcpError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                security_config.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            validate_zip_path(&name).map_err(|e| {
                HcpError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > security_config.max_file_size {
                return Err(HcpError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    name, file_size, security_config.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(file_size)
                .ok_or_else(|| {
                    HcpError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;
            if total_decompressed_size > security_config.max_decompressed_size {
                return Err(HcpError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, security_config.max_decompressed_size
                )));
            }

            let is_dir = file.is_dir();
            let compression = file.compression();
            let mut data = Vec::with_capacity(file_size as usize);
            if !is_dir {
                // 宣言サイズを超える展開は打ち切る
                (&mut file)
                    .take(security_config.max_file_size + 1)
                    .read_to_end(&mut data)?;
                if data.len() as u64 > security_config.max_file_size {
                    return Err(HcpError::SecurityViolation(format!(
                        "File '{}' exceeds maximum size when decompressed",
                        name
                    )));
                }
            }

            entries.push(PackageEntry {
                name,
                data,
                compression,
                is_dir,
            });
        }

        Ok(Self { entries })
    }

    /// バイト列から読み込む
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HcpError> {
        SecurityConfig::default().check_input_size(bytes.len())?;
        Self::read(Cursor::new(bytes))
    }

    /// エントリ名の一覧（元の順序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// エントリのデータを取得
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.data.as_slice())
    }

    /// パッケージを書き出す
    ///
    /// `replaced`に含まれるエントリは、そのデータで置き換えて書き出します。
    pub fn write<W: Write + Seek>(
        &self,
        writer: W,
        replaced: &[(&str, Vec<u8>)],
    ) -> Result<(), HcpError> {
        let mut zip = ZipWriter::new(writer);
        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default().compression_method(method);

            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)?;
                continue;
            }

            let data = replaced
                .iter()
                .find(|(name, _)| *name == entry.name)
                .map(|(_, data)| data.as_slice())
                .unwrap_or(entry.data.as_slice());

            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(data)?;
        }
        zip.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut data = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut data));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, content) in files {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        data
    }

    #[test]
    fn test_read_and_replace_entry() {
        let bytes = build_zip(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", "<old/>"),
        ]);
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(
            package.names().collect::<Vec<_>>(),
            vec!["[Content_Types].xml", "word/document.xml"]
        );

        let mut out = Cursor::new(Vec::new());
        package
            .write(&mut out, &[("word/document.xml", b"<new/>".to_vec())])
            .unwrap();

        let reread = DocxPackage::from_bytes(&out.into_inner()).unwrap();
        assert_eq!(reread.get("word/document.xml"), Some(&b"<new/>"[..]));
        assert_eq!(reread.get("[Content_Types].xml"), Some(&b"<Types/>"[..]));
    }

    #[test]
    fn test_path_traversal_is_rejected() {
        let bytes = build_zip(&[("../evil.xml", "<x/>")]);
        assert!(matches!(
            DocxPackage::from_bytes(&bytes),
            Err(HcpError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            DocxPackage::from_bytes(b"plain text, not a package"),
            Err(HcpError::Zip(_))
        ));
    }
}
