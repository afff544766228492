//! Shared fixtures for the integration tests
//!
//! Workbooks are built with rust_xlsxwriter and the document template with
//! zip, all inside a temporary directory.

#![allow(dead_code)]

use rust_xlsxwriter::*;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SUBJECT_HEADERS: [&str; 17] = [
    "Unique Identifier",
    "Index Name",
    "CID",
    "DOB",
    "Gender",
    "Race",
    "Primary Dx ",
    "Admit Code",
    "Allergy",
    "Medicaid",
    "Res Pro",
    "SVC Admit Criteria",
    "Risk-HIGH ALERT",
    "Psych Med Risk",
    "Cardiac Med Risk",
    "Neuro Risk",
    "Aspiration Risk",
];

pub const PLAN_CONTENT_HEADERS: [&str; 10] = [
    "HCP Name", "HCP Goal", "HCP Goal 2", "HMA1", "HMA2", "HMA3", "HMA4", "HMA5", "HTrack1",
    "HTrack2",
];

pub const PLAN_CONTENT_TOKENS: [&str; 9] = [
    "<<HCPGoal>>",
    "<<HCPGoal2>>",
    "<<HMA1>>",
    "<<HMA2>>",
    "<<HMA3>>",
    "<<HMA4>>",
    "<<HMA5>>",
    "<<HTrack1>>",
    "<<HTrack2>>",
];

/// One value per subject column; `Blank` leaves the cell empty
#[derive(Debug, Clone)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    Date(f64),
    Blank,
}

/// A subject row in column order of `SUBJECT_HEADERS`
pub fn subject_row(uid: Cell, index_name: Cell) -> Vec<Cell> {
    vec![
        uid,
        index_name,
        Cell::Number(4512.0),
        Cell::Date(32_887.0), // 1990-01-14
        Cell::Text("Female"),
        Cell::Text("White"),
        Cell::Text("Epilepsy"),
        Cell::Text("A-12"),
        Cell::Text("Penicillin"),
        Cell::Number(123_456.0),
        Cell::Text("Pro-1"),
        Cell::Text("Criteria 3"),
        Cell::Text("High"),
        Cell::Text("Low"),
        Cell::Text("Medium"),
        Cell::Text("None"),
        Cell::Text("Moderate"),
    ]
}

/// Plan content row: name plus goal text; the remaining columns are derived
pub fn plan_content_row(plan_type: &str) -> Vec<String> {
    let short: String = plan_type.split_whitespace().next().unwrap_or("").to_string();
    let mut row = vec![plan_type.to_string()];
    row.push(format!("{} goal", short));
    row.push(format!("{} goal 2", short));
    for i in 1..=5 {
        row.push(format!("{} action {}", short, i));
    }
    row.push(format!("{} track 1", short));
    row.push(format!("{} track 2", short));
    row
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), XlsxError> {
    match cell {
        Cell::Text(text) => {
            sheet.write_string(row, col, *text)?;
        }
        Cell::Number(number) => {
            sheet.write_number(row, col, *number)?;
        }
        Cell::Date(serial) => {
            let format = Format::new().set_num_format("mm/dd/yyyy");
            sheet.write_number_with_format(row, col, *serial, &format)?;
        }
        Cell::Blank => {}
    }
    Ok(())
}

/// Subject table on "Sheet1" and plan content on "Sheet2"
pub fn goal_track_workbook(
    subjects: &[Vec<Cell>],
    plan_rows: &[Vec<String>],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let sheet1 = workbook.add_worksheet();
    sheet1.set_name("Sheet1")?;
    for (col, header) in SUBJECT_HEADERS.iter().enumerate() {
        sheet1.write_string(0, col as u16, *header)?;
    }
    for (row, cells) in subjects.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            write_cell(sheet1, row as u32 + 1, col as u16, cell)?;
        }
    }

    let sheet2 = workbook.add_worksheet();
    sheet2.set_name("Sheet2")?;
    for (col, header) in PLAN_CONTENT_HEADERS.iter().enumerate() {
        sheet2.write_string(0, col as u16, *header)?;
    }
    for (row, values) in plan_rows.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            sheet2.write_string(row as u32 + 1, col as u16, value.as_str())?;
        }
    }

    workbook.save_to_buffer()
}

/// Treatment database: key in column A, note in column F, header in row 1
pub fn treatment_workbook(rows: &[(&str, &str)]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Treatments")?;

    let headers = ["FileName", "Category", "Owner", "Frequency", "Status", "MedRecSTART"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (i, (key, note)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *key)?;
        sheet.write_string(row, 1, "General")?;
        sheet.write_string(row, 4, "Active")?;
        if !note.is_empty() {
            sheet.write_string(row, 5, *note)?;
        }
    }

    workbook.save_to_buffer()
}

const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn paragraph(text: &str) -> String {
    format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

/// A paragraph whose text is split over several formatted runs
pub fn split_paragraph(parts: &[&str]) -> String {
    let mut xml = String::from("<w:p><w:pPr><w:spacing w:after=\"0\"/></w:pPr>");
    for (i, part) in parts.iter().enumerate() {
        let rpr = if i % 2 == 0 { "<w:rPr><w:b/></w:rPr>" } else { "" };
        xml.push_str(&format!(
            r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
            rpr,
            escape(part)
        ));
    }
    xml.push_str("</w:p>");
    xml
}

pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr><w:tblGrid><w:gridCol w:w="3000"/><w:gridCol w:w="6000"/></w:tblGrid>"#,
    );
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row.iter() {
            xml.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="3000" w:type="dxa"/></w:tcPr>"#);
            xml.push_str(&paragraph(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

/// Body of the standard healthcare plan template
pub fn template_body() -> String {
    let mut body = String::new();
    body.push_str(&paragraph("<<HCP Name>>"));
    body.push_str(&split_paragraph(&["Client: <<Index", " Name>> (CID <<C", "ID>>)"]));
    body.push_str(&paragraph("DOB: <<DOB>>  Gender: <<Gender>>  Race: <<Race>>"));
    body.push_str(&paragraph("Primary Dx: <<PrimaryDx >>"));
    body.push_str(&paragraph("Admit Code: <<AdmitCode>>  Medicaid: <<Medicaid>>"));
    body.push_str(&paragraph("Res Pro: <<Res Pro>>  SVC: <<SVC Admit Criteria>>"));
    body.push_str(&paragraph(
        "Risks: <<Risk-HIGH ALERT>> / <<Psych Med Risk>> / <<Cardiac Med Risk>> / <<Neuro Risk>> / <<Aspiration Risk>>",
    ));
    body.push_str(&paragraph("Goal: <<HCPGoal>>"));
    body.push_str(&paragraph("Goal 2: <<HCPGoal2>>"));
    for token in ["<<HMA1>>", "<<HMA2>>", "<<HMA3>>", "<<HMA4>>", "<<HMA5>>"] {
        body.push_str(&paragraph(token));
    }
    body.push_str(&table(&[
        &["Effective Date", ""],
        &["Allergy", "<<Allergy>>"],
        &["Tracking", "<<HTrack1>> <<HTrack2>>"],
        &["Treatments and Interventions", "To be completed"],
    ]));
    body
}

/// Build a DOCX package from a body fragment plus optional header and footer
pub fn docx(body: &str, header: Option<&str>, footer: Option<&str>) -> Vec<u8> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    );
    let mut relationships = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    let mut section = String::from("<w:sectPr>");

    let mut parts = Vec::new();
    if let Some(header) = header {
        content_types.push_str(r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#);
        relationships.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#);
        section.push_str(r#"<w:headerReference w:type="default" r:id="rId1"/>"#);
        parts.push((
            "word/header1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr {}>{}</w:hdr>"#,
                W_NS, header
            ),
        ));
    }
    if let Some(footer) = footer {
        content_types.push_str(r#"<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#);
        relationships.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>"#);
        section.push_str(r#"<w:footerReference w:type="default" r:id="rId2"/>"#);
        parts.push((
            "word/footer1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr {}>{}</w:ftr>"#,
                W_NS, footer
            ),
        ));
    }
    content_types.push_str("</Types>");
    relationships.push_str("</Relationships>");
    section.push_str("</w:sectPr>");

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {}><w:body>{}{}</w:body></w:document>"#,
        W_NS, body, section
    );

    let mut files = vec![
        ("[Content_Types].xml", content_types),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#
                .to_string(),
        ),
        ("word/document.xml", document),
        ("word/_rels/document.xml.rels", relationships),
    ];
    files.extend(parts);

    let mut data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut data));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in files {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    data
}

/// The standard template with header and footer
pub fn template_docx() -> Vec<u8> {
    docx(
        &template_body(),
        Some(&paragraph("<<Index Name>> | <<HCP Name>>")),
        Some(&paragraph("CID <<CID>> | DOB <<DOB>>")),
    )
}

/// Input files written into a temporary directory
pub struct Fixture {
    pub dir: TempDir,
    pub subjects: PathBuf,
    pub treatments: PathBuf,
    pub template: PathBuf,
    pub output_root: PathBuf,
}

impl Fixture {
    pub fn new(
        subjects: &[Vec<Cell>],
        plan_rows: &[Vec<String>],
        treatments: &[(&str, &str)],
        template: Vec<u8>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let subjects_path = dir.path().join("HCP Goal Track.xlsx");
        let treatments_path = dir.path().join("Treatment Database.xlsx");
        let template_path = dir.path().join("Healthcare Plan Template.docx");
        let output_root = dir.path().join("out");

        fs::write(&subjects_path, goal_track_workbook(subjects, plan_rows).unwrap()).unwrap();
        fs::write(&treatments_path, treatment_workbook(treatments).unwrap()).unwrap();
        fs::write(&template_path, template).unwrap();

        Self {
            dir,
            subjects: subjects_path,
            treatments: treatments_path,
            template: template_path,
            output_root,
        }
    }

    /// Builder preconfigured with this fixture's paths
    pub fn builder(&self) -> hcpgen::GeneratorBuilder {
        hcpgen::GeneratorBuilder::new()
            .with_subject_workbook(&self.subjects)
            .with_treatment_workbook(&self.treatments)
            .with_template(&self.template)
            .with_output_root(&self.output_root)
    }
}

/// All files below `root`, relative and sorted
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/"),
                );
            }
        }
    }
    files.sort();
    files
}
