//! Paragraph and Cell Text
//!
//! WordprocessingMLの段落（`w:p`）・表セル（`w:tc`）をテキストとして読み書きする。
//!
//! 段落は、連続する「テキストのみのラン」（`w:t`, `w:tab`, `w:br`, `w:cr`
//! だけを含む`w:r`）をひとまとまりのテキストとして扱います。書式の境界で
//! ランが分割されていても、連続していれば1つの文字列として照合されます。
//! ブックマーク・コメント範囲などの位置マーカーは区切りになりません。
//!
//! ハイパーリンク・コンテンツコントロール・変更履歴の挿入などのラン容器は、
//! その中のランを独立したテキストとして照合します。容器の境界をまたぐ
//! 文字列と、図を含むランは照合されません。

use crate::document::xml::{XmlElement, XmlNode};

/// 区切りにならず、書き換え時に取り除かれる要素
const TRANSPARENT_ELEMENTS: [&str; 1] = ["proofErr"];

/// 区切りにならず、書き換え後も残す位置マーカー
const MARKER_ELEMENTS: [&str; 6] = [
    "bookmarkStart",
    "bookmarkEnd",
    "permStart",
    "permEnd",
    "commentRangeStart",
    "commentRangeEnd",
];

/// 中のランを置換の対象にする容器
const RUN_CONTAINERS: [&str; 10] = [
    "hyperlink",
    "sdt",
    "sdtContent",
    "ins",
    "smartTag",
    "customXml",
    "fldSimple",
    "moveTo",
    "dir",
    "bdo",
];

/// テキストのみのランに含まれてよい子要素
const TEXT_RUN_CHILDREN: [&str; 6] = ["rPr", "t", "tab", "br", "cr", "lastRenderedPageBreak"];

/// 段落テキストの読み取り時に中へ入らない要素
const OPAQUE_ELEMENTS: [&str; 5] = ["p", "drawing", "pict", "object", "txbxContent"];

fn is_text_run(element: &XmlElement) -> bool {
    element.local_name() == "r"
        && element.child_elements().all(|child| {
            let local = child.local_name();
            TEXT_RUN_CHILDREN.contains(&local)
                // 改ページ・段区切りはテキストとして表現できない
                && !(local == "br"
                    && child
                        .attribute("type")
                        .is_some_and(|kind| kind != "textWrapping"))
        })
}

fn is_transparent(element: &XmlElement) -> bool {
    TRANSPARENT_ELEMENTS.contains(&element.local_name()) || is_marker(element)
}

fn is_marker(element: &XmlElement) -> bool {
    MARKER_ELEMENTS.contains(&element.local_name())
}

/// テキストのみのランの文字列
fn run_text(run: &XmlElement) -> String {
    let mut text = String::new();
    for child in run.child_elements() {
        match child.local_name() {
            "t" => text.push_str(&child.inner_text()),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// 段落の表示テキスト
///
/// ハイパーリンク内のランも含め、段落内のすべての`w:t`を連結します。
/// 入れ子の段落（テキストボックス）と図形の中は含みません。
pub(crate) fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    collect_text(paragraph, &mut text);
    text
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in element.child_elements() {
        match child.local_name() {
            "t" => out.push_str(&child.inner_text()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            local if OPAQUE_ELEMENTS.contains(&local) => {}
            _ => collect_text(child, out),
        }
    }
}

/// セルの表示テキスト（直下の段落を改行で連結）
pub(crate) fn cell_text(cell: &XmlElement) -> String {
    cell.child_elements()
        .filter(|child| child.local_name() == "p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// 文字列から1つのランを作る
///
/// タブは`w:tab`、改行は`w:br`に変換します。`run_properties`があれば
/// 書式としてコピーします。
pub(crate) fn make_run(
    template: &XmlElement,
    run_properties: Option<&XmlElement>,
    text: &str,
) -> XmlElement {
    let mut run = XmlElement::new(template.sibling_name("r"));
    if let Some(rpr) = run_properties {
        run.children.push(XmlNode::Element(rpr.clone()));
    }

    let mut pending = String::new();
    let flush = |run: &mut XmlElement, pending: &mut String| {
        if !pending.is_empty() {
            let t = XmlElement::new(template.sibling_name("t"))
                .with_attribute("xml:space", "preserve")
                .with_text(pending);
            run.children.push(XmlNode::Element(t));
            pending.clear();
        }
    };

    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut run, &mut pending);
                run.children
                    .push(XmlNode::Element(XmlElement::new(template.sibling_name("tab"))));
            }
            '\n' => {
                flush(&mut run, &mut pending);
                run.children
                    .push(XmlNode::Element(XmlElement::new(template.sibling_name("br"))));
            }
            _ => pending.push(ch),
        }
    }
    flush(&mut run, &mut pending);
    run
}

/// 連続したテキストランの範囲（`start..end`は段落の子ノードの位置）
struct TextSegment {
    start: usize,
    end: usize,
    first_run: usize,
}

fn text_segments(paragraph: &XmlElement) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    let mut current: Option<TextSegment> = None;

    for (i, node) in paragraph.children.iter().enumerate() {
        let (text_run, transparent) = match node {
            XmlNode::Element(element) => (is_text_run(element), is_transparent(element)),
            // 要素間の空白テキストは区切りにしない
            XmlNode::Text(text) => (false, text.trim().is_empty()),
            XmlNode::Other(_) => (false, false),
        };

        if text_run {
            match current.as_mut() {
                Some(segment) => segment.end = i + 1,
                None => {
                    current = Some(TextSegment {
                        start: i,
                        end: i + 1,
                        first_run: i,
                    })
                }
            }
        } else if !transparent {
            if let Some(segment) = current.take() {
                segments.push(segment);
            }
        }
    }
    if let Some(segment) = current {
        segments.push(segment);
    }
    segments
}

/// 段落内の`token`をすべて`replacement`に置き換える
///
/// トークンを含むテキスト範囲だけを1つのランに書き換え、そのランには
/// 範囲内の最初のランの書式を引き継ぎます。範囲内の位置マーカーは
/// 新しいランの直後に残します。段落の構造（段落書式、ハイパーリンク、
/// 図など）は変更しません。
///
/// # 戻り値
///
/// 置き換えた出現回数
pub(crate) fn replace_in_paragraph(
    paragraph: &mut XmlElement,
    token: &str,
    replacement: &str,
) -> usize {
    if token.is_empty() {
        return 0;
    }
    replace_in_container(paragraph, token, replacement)
}

fn replace_in_container(container: &mut XmlElement, token: &str, replacement: &str) -> usize {
    let mut replaced = 0;
    for child in container.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            if RUN_CONTAINERS.contains(&child.local_name()) {
                replaced += replace_in_container(child, token, replacement);
            }
        }
    }

    // 後ろの範囲から書き換えることで、前の範囲の位置を保つ
    for segment in text_segments(container).into_iter().rev() {
        let nodes = &container.children[segment.start..segment.end];
        let text: String = nodes
            .iter()
            .filter_map(XmlNode::as_element)
            .filter(|element| is_text_run(element))
            .map(run_text)
            .collect();

        let count = text.matches(token).count();
        if count == 0 {
            continue;
        }
        replaced += count;

        let markers: Vec<XmlNode> = nodes
            .iter()
            .filter(|node| node.as_element().is_some_and(is_marker))
            .cloned()
            .collect();
        let new_text = text.replace(token, replacement);
        let rpr = container.children[segment.first_run]
            .as_element()
            .and_then(|run| run.first_child("rPr"))
            .cloned();

        let mut replacement_nodes = Vec::with_capacity(markers.len() + 1);
        if !new_text.is_empty() {
            replacement_nodes.push(XmlNode::Element(make_run(
                container,
                rpr.as_ref(),
                &new_text,
            )));
        }
        replacement_nodes.extend(markers);
        container
            .children
            .splice(segment.start..segment.end, replacement_nodes);
    }
    replaced
}

/// 要素以下のすべての段落に対して`f`を適用
///
/// 表のセル・入れ子の表・テキストボックス内の段落も含みます。
/// 段落自身に適用した後、その子孫の段落にも適用します。
pub(crate) fn for_each_paragraph_mut<F>(element: &mut XmlElement, f: &mut F)
where
    F: FnMut(&mut XmlElement),
{
    if element.local_name() == "p" {
        f(element);
    }
    for child in element.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            for_each_paragraph_mut(child, f);
        }
    }
}

/// 要素以下のすべての段落テキストを文書順に収集
pub(crate) fn collect_paragraph_texts(element: &XmlElement, out: &mut Vec<String>) {
    if element.local_name() == "p" {
        out.push(paragraph_text(element));
    }
    for child in element.child_elements() {
        collect_paragraph_texts(child, out);
    }
}

/// セルの内容を指定した段落で置き換える
///
/// セル書式（`w:tcPr`）は保持します。最初の既存段落の段落書式と
/// 最初のランの書式を、新しい段落に引き継ぎます。`lines`が空の場合は
/// 空の段落を1つだけ残します（セルには少なくとも1つの段落が必要）。
pub(crate) fn replace_cell_content(cell: &mut XmlElement, lines: &[String]) {
    let first_paragraph = cell.first_child("p").cloned();
    let paragraph_properties = first_paragraph
        .as_ref()
        .and_then(|p| p.first_child("pPr"))
        .cloned();
    let run_properties = first_paragraph.as_ref().and_then(|p| {
        p.child_elements()
            .find(|child| child.local_name() == "r")
            .and_then(|run| run.first_child("rPr"))
            .cloned()
    });

    let paragraph_name = cell.sibling_name("p");
    let new_paragraph = |text: Option<&str>| {
        let mut paragraph = XmlElement::new(paragraph_name.clone());
        if let Some(ppr) = &paragraph_properties {
            paragraph.children.push(XmlNode::Element(ppr.clone()));
        }
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            let run = make_run(&paragraph, run_properties.as_ref(), text);
            paragraph.children.push(XmlNode::Element(run));
        }
        paragraph
    };

    cell.children.retain(|node| {
        node.as_element()
            .is_some_and(|element| element.local_name() == "tcPr")
    });

    if lines.is_empty() {
        cell.children.push(XmlNode::Element(new_paragraph(None)));
    } else {
        for line in lines {
            cell.children
                .push(XmlNode::Element(new_paragraph(Some(line.as_str()))));
        }
    }
}
