//! XML Tree
//!
//! quick-xmlのイベント列から組み立てる最小限の要素ツリー。
//! 要素名は接頭辞付きのまま保持し、書き出し時にそのまま復元します。

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::HcpError;

/// XML要素
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlElement {
    /// 接頭辞付きの要素名（例: `w:p`）
    pub name: String,
    /// 属性（出現順）
    pub attributes: Vec<(String, String)>,
    /// 子ノード
    pub children: Vec<XmlNode>,
}

/// XMLノード
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    /// エスケープ解除済みのテキスト
    Text(String),
    /// 宣言・コメント・CDATAなど、そのまま書き戻すイベント
    Other(Event<'static>),
}

impl XmlElement {
    /// 子を持たない要素を生成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 属性を追加（ビルダー形式）
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// テキストを追加（ビルダー形式）
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    /// 接頭辞を除いた要素名
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// 名前空間接頭辞（`w:p` なら `Some("w")`）
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// 同じ接頭辞を付けた要素名を作る
    pub fn sibling_name(&self, local: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        }
    }

    /// 属性値を接頭辞を除いた名前で取得
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key) == local)
            .map(|(_, value)| value.as_str())
    }

    /// 子要素を走査
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// 指定した名前の最初の子要素
    pub fn first_child(&self, local: &str) -> Option<&XmlElement> {
        self.child_elements().find(|child| child.local_name() == local)
    }

    /// 直下のテキストノードを連結
    pub fn inner_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// XMLパート全体（宣言・ルート要素を含む最上位ノード列）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlTree {
    pub nodes: Vec<XmlNode>,
}

impl XmlTree {
    /// バイト列を解析してツリーを構築
    ///
    /// 空白テキストも保持するため、書き戻した文書のレイアウトは変わりません。
    pub fn parse(xml: &[u8]) -> Result<Self, HcpError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut top: Vec<XmlNode> = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start, &reader)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, &reader)?;
                    push_node(&mut stack, &mut top, XmlNode::Element(element));
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        HcpError::InvalidDocument("Unbalanced end tag in XML part".to_string())
                    })?;
                    push_node(&mut stack, &mut top, XmlNode::Element(element));
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    push_node(&mut stack, &mut top, XmlNode::Text(text));
                }
                Event::Eof => break,
                other => {
                    push_node(&mut stack, &mut top, XmlNode::Other(other.into_owned()));
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(HcpError::InvalidDocument(
                "Unexpected end of XML part".to_string(),
            ));
        }

        Ok(Self { nodes: top })
    }

    /// ツリーをバイト列に書き出す
    pub fn to_bytes(&self) -> Result<Vec<u8>, HcpError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        Ok(writer.into_inner())
    }

    /// ルート要素
    pub fn root(&self) -> Option<&XmlElement> {
        self.nodes.iter().find_map(XmlNode::as_element)
    }

    /// ルート要素（可変）
    pub fn root_mut(&mut self) -> Option<&mut XmlElement> {
        self.nodes.iter_mut().find_map(XmlNode::as_element_mut)
    }
}

fn element_from_start(
    start: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<XmlElement, HcpError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.decode_and_unescape_value(reader)?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn push_node(stack: &mut [XmlElement], top: &mut Vec<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), HcpError> {
    match node {
        XmlNode::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for (key, value) in &element.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in &element.children {
                    write_node(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }
        XmlNode::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        XmlNode::Other(event) => {
            writer.write_event(event)?;
        }
    }
    Ok(())
}
