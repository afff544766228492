//! Table Cell Injection
//!
//! ラベルセルの隣のセルへの治療メモの差し込みと、有効日の書き込み。

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::text::{cell_text, replace_cell_content};
use super::xml::{XmlElement, XmlNode};
use super::PlanDocument;
use crate::api::{InjectionOutcome, StampOutcome, EFFECTIVE_DATE_LABEL};
use crate::formatter::render_date;
use crate::types::TreatmentIndex;

/// ラベル検索の結果
enum CellSearch<'a> {
    /// ラベルの隣のセル
    Found(&'a mut XmlElement),
    /// ラベルは見つかったが、同じ行に次のセルがない
    NoAdjacent,
    NotFound,
}

fn is_cell(node: &XmlNode) -> bool {
    node.as_element()
        .is_some_and(|element| element.local_name() == "tc")
}

/// 行の中でラベルと一致するセルの位置（子ノードの位置）
fn label_position(row: &XmlElement, label: &str) -> Option<usize> {
    row.children.iter().position(|node| {
        node.as_element().is_some_and(|element| {
            element.local_name() == "tc" && cell_text(element).trim() == label
        })
    })
}

/// 文書順で最初にラベルを含む行を探し、隣のセルを返す
fn find_labeled_cell_mut<'a>(element: &'a mut XmlElement, label: &str) -> CellSearch<'a> {
    if element.local_name() == "tr" {
        if let Some(position) = label_position(element, label) {
            let next = element.children[position + 1..]
                .iter()
                .position(is_cell)
                .map(|offset| position + 1 + offset);
            return match next.and_then(|i| element.children[i].as_element_mut()) {
                Some(cell) => CellSearch::Found(cell),
                None => CellSearch::NoAdjacent,
            };
        }
    }

    for child in element.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            match find_labeled_cell_mut(child, label) {
                CellSearch::NotFound => continue,
                found => return found,
            }
        }
    }
    CellSearch::NotFound
}

impl PlanDocument {
    /// 治療メモをラベルの隣のセルに差し込む
    ///
    /// 本文中のすべての表（入れ子を含む）を文書順に走査し、テキストが
    /// `label`と一致するセルを含む最初の行を探します。その行の次のセルの
    /// 内容を、`key`に一致するメモ（1件につき1段落、`bullet`を前置）で
    /// 置き換えます。メモが0件の場合はセルを空にします。
    ///
    /// ラベルが見つからない場合、または隣のセルがない場合は、文書を変更せずに
    /// 警告を記録します。
    ///
    /// # 引数
    ///
    /// * `key` - 治療データベースの照合キー
    /// * `index` - キーごとにまとめた治療メモ
    /// * `label` - ラベルセルのテキスト（例: "Treatments and Interventions"）
    /// * `bullet` - 各メモの前に付ける文字列
    pub fn inject_treatments(
        &mut self,
        key: &str,
        index: &TreatmentIndex,
        label: &str,
        bullet: &str,
    ) -> InjectionOutcome {
        let Some(body) = self.body_mut() else {
            return InjectionOutcome::LabelNotFound;
        };

        match find_labeled_cell_mut(body, label) {
            CellSearch::Found(cell) => {
                let lines: Vec<String> = index
                    .notes_for(key)
                    .iter()
                    .map(|note| format!("{}{}", bullet, note))
                    .collect();
                replace_cell_content(cell, &lines);
                debug!(key, notes = lines.len(), "Treatment notes injected");
                InjectionOutcome::Injected { notes: lines.len() }
            }
            CellSearch::NoAdjacent => {
                warn!(key, label, "Label cell has no adjacent cell, treatment notes skipped");
                InjectionOutcome::NoAdjacentCell
            }
            CellSearch::NotFound => {
                warn!(key, label, "Label not found in any table, treatment notes skipped");
                InjectionOutcome::LabelNotFound
            }
        }
    }

    /// 有効日を書き込む
    ///
    /// 本文の最初の表で、最初のセルに"Effective Date"を含む最初の行を探し、
    /// 2番目のセルの内容を`MM/DD/YYYY`形式の日付で置き換えます。
    pub fn stamp_effective_date(&mut self, date: NaiveDate) -> StampOutcome {
        let rendered = render_date(date);
        let Some(table) = self.body_mut().and_then(first_table_mut) else {
            warn!("No table found, effective date not written");
            return StampOutcome::NoTable;
        };

        for row in table.children.iter_mut().filter_map(XmlNode::as_element_mut) {
            if row.local_name() != "tr" {
                continue;
            }
            let mut cells = row
                .children
                .iter_mut()
                .filter_map(XmlNode::as_element_mut)
                .filter(|element| element.local_name() == "tc");

            let Some(first) = cells.next() else {
                continue;
            };
            if !cell_text(first).contains(EFFECTIVE_DATE_LABEL) {
                continue;
            }
            let Some(second) = cells.next() else {
                continue;
            };

            replace_cell_content(second, &[rendered.clone()]);
            debug!(date = %rendered, "Effective date written");
            return StampOutcome::Stamped;
        }

        warn!("Effective Date row not found in the first table");
        StampOutcome::RowNotFound
    }
}

/// `w:body`直下の最初の表（入れ子の表やコンテンツコントロール内の表は対象外）
fn first_table_mut(document: &mut XmlElement) -> Option<&mut XmlElement> {
    document
        .children
        .iter_mut()
        .filter_map(XmlNode::as_element_mut)
        .find(|element| element.local_name() == "body")?
        .children
        .iter_mut()
        .filter_map(XmlNode::as_element_mut)
        .find(|element| element.local_name() == "tbl")
}
