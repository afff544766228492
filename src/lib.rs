//! hcpgen - Healthcare plan document generator
//!
//! This crate fills a word-processing template (DOCX) once per subject and plan
//! type, using values read from spreadsheets (XLSX), and injects the matching
//! treatment notes into a labeled table cell of each generated document.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hcpgen::GeneratorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = GeneratorBuilder::new()
//!         .with_subject_workbook("HCP Goal Track.xlsx")
//!         .with_treatment_workbook("Treatment Database.xlsx")
//!         .with_template("Healthcare Plan Template.docx")
//!         .with_output_root("out")
//!         .build()?;
//!
//!     // Writes out/<IndexName>/<UniqueIdentifier>_<IndexName>_<PlanType>.docx
//!     let summary = generator.run()?;
//!     println!("{} files written", summary.distinct_files());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration File
//!
//! ```rust,no_run
//! use hcpgen::{GeneratorBuilder, GeneratorConfig, NumericErrorPolicy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeneratorConfig::from_json_file("hcpgen.json")?;
//!     let generator = GeneratorBuilder::from_config(config)
//!         .with_numeric_error_policy(NumericErrorPolicy::Abort)
//!         .build()?;
//!     generator.run()?;
//!     Ok(())
//! }
//! ```
//!
//! # Working with Documents
//!
//! ```rust,no_run
//! use hcpgen::{PlanDocument, TreatmentIndex, TreatmentRecord};
//!
//! # fn main() -> Result<(), hcpgen::HcpError> {
//! let mut document = PlanDocument::open("plan.docx")?;
//!
//! // Fill (or, with `None`, remove) every occurrence of a placeholder
//! document.apply("<<DOB>>", Some("01/02/1990"));
//! document.apply("<<Allergy>>", None);
//!
//! let index = TreatmentIndex::new(&[TreatmentRecord::new("plan.docx", "Check BP daily")]);
//! document.inject_treatments("plan.docx", &index, "Treatments and Interventions", "• ");
//!
//! document.save("plan_filled.docx")?;
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod document;
mod error;
mod fields;
mod formatter;
mod generator;
mod output;
mod parser;
mod security;
mod types;

// 公開API
pub use api::{
    InjectionOutcome, NumericErrorPolicy, SheetSelector, StampOutcome, DEFAULT_BULLET,
    DEFAULT_PLAN_TYPES, DEFAULT_TREATMENT_LABEL, EFFECTIVE_DATE_LABEL,
};
pub use builder::{GeneratorBuilder, GeneratorConfig};
pub use document::{PlanDocument, Template};
pub use error::HcpError;
pub use fields::{plan_content_tokens, INDEX_NAME_TOKEN, PLAN_NAME_TOKEN};
pub use formatter::{format_cid, format_date, format_medicaid, parse_date_text, render_date};
pub use generator::{stamp_file, GeneratedDocument, PlanGenerator, RunSummary, SkippedSubject};
pub use output::{ensure_folder, file_name_key, OutputLocation};
pub use parser::{
    normalize_column_name, SourceTables, TREATMENT_FIRST_ROW, TREATMENT_KEY_COLUMN,
    TREATMENT_NOTE_COLUMN,
};
pub use types::{
    FieldValue, PlanContentTable, Record, SubjectRecord, TreatmentIndex, TreatmentRecord,
};
