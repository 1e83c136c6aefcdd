//! XML reading and writing
//!
//! Documents follow a `records`/`record` convention. The reader accepts a
//! `records` root whose children are records, a root with `records` children
//! (one record each), or any other root, which becomes a single record. The
//! writer always produces the first form.

use crate::error::{Error, FormatError, Result};
use crate::format::DataFormat;
use roxmltree::Node;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::io::Write;
use tabconv_shared::{Record, RecordSet, Value};

/// Root element of written documents
pub const ROOT_ELEMENT: &str = "records";

/// Element wrapping each written record
pub const RECORD_ELEMENT: &str = "record";

/// XML-specific writing options
#[derive(Debug, Clone)]
pub struct XmlWriteOptions {
    /// Spaces per nesting level
    pub indent: usize,
}

impl Default for XmlWriteOptions {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

/// Read an XML document into a record set
pub fn read_xml(bytes: &[u8]) -> Result<RecordSet> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        Error::format(DataFormat::Xml, FormatError::Encoding(e.to_string()))
    })?;

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)?;
    let root = doc.root_element();

    let record_nodes: Vec<Node<'_, '_>> = if root.has_tag_name(ROOT_ELEMENT) {
        root.children().filter(Node::is_element).collect()
    } else {
        let nested: Vec<Node<'_, '_>> = root
            .children()
            .filter(|n| n.is_element() && n.has_tag_name(ROOT_ELEMENT))
            .collect();
        if nested.is_empty() {
            vec![root]
        } else {
            nested
        }
    };

    Ok(record_nodes.into_iter().map(record_from_element).collect())
}

fn record_from_element(node: Node<'_, '_>) -> Record {
    match element_json(node) {
        JsonValue::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, cell_from_json(value)))
            .collect(),
        other => {
            let mut record = Record::new();
            record.insert(node.tag_name().name().to_string(), cell_from_json(other));
            record
        }
    }
}

fn cell_from_json(value: JsonValue) -> Value {
    match value {
        JsonValue::String(s) => Value::String(s),
        nested => Value::Opaque(nested),
    }
}

fn is_leaf(node: Node<'_, '_>) -> bool {
    node.attributes().next().is_none() && !node.children().any(|c| c.is_element())
}

fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect()
}

/// Leaf elements are strings; anything else is an object of attributes and
/// children, with repeated names collected into arrays and mixed text under `""`
fn element_json(node: Node<'_, '_>) -> JsonValue {
    if is_leaf(node) {
        return JsonValue::String(text_of(node));
    }

    let mut map = JsonMap::new();
    for attr in node.attributes() {
        map.insert(
            attr.name().to_string(),
            JsonValue::String(attr.value().to_string()),
        );
    }
    for child in node.children().filter(Node::is_element) {
        insert_repeated(&mut map, child.tag_name().name(), element_json(child));
    }

    let text = text_of(node);
    let text = text.trim();
    if !text.is_empty() {
        insert_repeated(&mut map, "", JsonValue::String(text.to_string()));
    }

    JsonValue::Object(map)
}

fn insert_repeated(map: &mut JsonMap<String, JsonValue>, key: &str, value: JsonValue) {
    match map.get_mut(key) {
        Some(JsonValue::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = JsonValue::Array(vec![first, value]);
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
}

/// XML writer producing a `records` document
pub struct XmlWriter<W: Write> {
    writer: W,
    options: XmlWriteOptions,
}

impl<W: Write> XmlWriter<W> {
    /// Create a new XML writer with default options
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            options: XmlWriteOptions::default(),
        }
    }

    /// Create an XML writer with custom options
    pub fn with_options(writer: W, options: XmlWriteOptions) -> Self {
        Self { writer, options }
    }

    /// Write every record as a `record` element
    pub fn write_records(mut self, records: &RecordSet) -> Result<()> {
        if records.is_empty() {
            return Err(Error::EmptyRecordSet {
                format: DataFormat::Xml,
            });
        }

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<{ROOT_ELEMENT}>\n"));
        for record in records {
            self.push_indent(&mut out, 1);
            out.push_str(&format!("<{RECORD_ELEMENT}>\n"));
            for (key, value) in record {
                let name = sanitize_xml_name(key);
                match value {
                    Value::Null => self.push_empty(&mut out, &name, 2),
                    Value::Opaque(json) => self.push_json(&mut out, &name, json, 2),
                    other => self.push_text(&mut out, &name, &other.to_text(), 2),
                }
            }
            self.push_indent(&mut out, 1);
            out.push_str(&format!("</{RECORD_ELEMENT}>\n"));
        }
        out.push_str(&format!("</{ROOT_ELEMENT}>\n"));

        self.writer.write_all(out.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn push_indent(&self, out: &mut String, depth: usize) {
        out.extend(std::iter::repeat_n(' ', depth * self.options.indent));
    }

    fn push_empty(&self, out: &mut String, name: &str, depth: usize) {
        self.push_indent(out, depth);
        out.push_str(&format!("<{name}/>\n"));
    }

    fn push_text(&self, out: &mut String, name: &str, text: &str, depth: usize) {
        if text.is_empty() {
            return self.push_empty(out, name, depth);
        }
        self.push_indent(out, depth);
        out.push_str(&format!("<{name}>{}</{name}>\n", escape(text)));
    }

    fn push_json(&self, out: &mut String, name: &str, json: &JsonValue, depth: usize) {
        match json {
            JsonValue::Null => self.push_empty(out, name, depth),
            JsonValue::Array(items) => {
                for item in items {
                    self.push_json(out, name, item, depth);
                }
            }
            JsonValue::Object(map) if map.is_empty() => self.push_empty(out, name, depth),
            JsonValue::Object(map) => {
                self.push_indent(out, depth);
                out.push_str(&format!("<{name}>\n"));
                for (key, value) in map {
                    if key.is_empty() {
                        if let JsonValue::String(text) = value {
                            self.push_indent(out, depth + 1);
                            out.push_str(&escape(text));
                            out.push('\n');
                            continue;
                        }
                    }
                    self.push_json(out, &sanitize_xml_name(key), value, depth + 1);
                }
                self.push_indent(out, depth);
                out.push_str(&format!("</{name}>\n"));
            }
            JsonValue::String(s) => self.push_text(out, name, s, depth),
            scalar => self.push_text(out, name, &scalar.to_string(), depth),
        }
    }
}

/// Escape the five XML special characters
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Replace characters that cannot appear in an element name
pub fn sanitize_xml_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// Write a record set as XML
pub fn write_xml<W: Write>(writer: W, records: &RecordSet, options: &XmlWriteOptions) -> Result<()> {
    XmlWriter::with_options(writer, options.clone()).write_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabconv_shared::record;

    #[test]
    fn test_records_root() {
        let xml = r#"<?xml version="1.0"?>
<records>
  <record><id>1</id><name>Alice</name></record>
  <record><id>2</id><name/></record>
</records>"#;
        let records = read_xml(xml.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.records()[0], record! { "id" => "1", "name" => "Alice" });
        assert_eq!(records.records()[1], record! { "id" => "2", "name" => "" });
    }

    #[test]
    fn test_nested_records_children() {
        let xml = "<HashMap><records><id>1</id></records><records><id>2</id></records></HashMap>";
        let records = read_xml(xml.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.records()[1], record! { "id" => "2" });

        let single = "<HashMap><records><id>9</id></records></HashMap>";
        let records = read_xml(single.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_other_root_is_single_record() {
        let xml = "<item><a>x</a><b>y</b></item>";
        let records = read_xml(xml.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.records()[0], record! { "a" => "x", "b" => "y" });
    }

    #[test]
    fn test_attributes_and_repeats_become_opaque() {
        let xml = r#"<records><record><tag>a</tag><tag>b</tag><pos x="1" y="2"/></record></records>"#;
        let records = read_xml(xml.as_bytes()).unwrap();
        let record = &records.records()[0];
        assert_eq!(record["tag"], Value::Opaque(json!(["a", "b"])));
        assert_eq!(record["pos"], Value::Opaque(json!({"x": "1", "y": "2"})));
    }

    #[test]
    fn test_doctype_is_accepted() {
        let xml = "<?xml version=\"1.0\"?>\n<!DOCTYPE records SYSTEM \"records.dtd\">\n<records><record><a>1</a></record></records>";
        let records = read_xml(xml.as_bytes()).unwrap();
        assert_eq!(records.records()[0], record! { "a" => "1" });
    }

    #[test]
    fn test_doctype_on_root_line() {
        let xml = "<!DOCTYPE records><records><record><a>1</a></record></records>";
        let records = read_xml(xml.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records.records()[0], record! { "a" => "1" });
    }

    #[test]
    fn test_doctype_internal_subset_over_lines() {
        let xml = "<!DOCTYPE records [\n  <!ELEMENT records (record*)>\n  <!ELEMENT record ANY>\n]>\n<records>\n  <record><a>x</a><b>y</b></record>\n</records>";
        let records = read_xml(xml.as_bytes()).unwrap();
        assert_eq!(records.records(), &[record! { "a" => "x", "b" => "y" }]);
    }

    #[test]
    fn test_malformed_is_format_error() {
        let err = read_xml(b"<records><record></records>").unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                format: DataFormat::Xml,
                ..
            }
        ));
    }

    #[test]
    fn test_writer_layout() {
        let records = RecordSet::from_records(vec![
            record! { "id" => 1, "name" => "A & B", "gap" => Value::Null },
        ]);
        let mut buffer = Vec::new();
        XmlWriter::new(&mut buffer).write_records(&records).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <records>\n\
             \x20 <record>\n\
             \x20   <id>1</id>\n\
             \x20   <name>A &amp; B</name>\n\
             \x20   <gap/>\n\
             \x20 </record>\n\
             </records>\n"
        );
    }

    #[test]
    fn test_writer_nests_opaque_values() {
        let records = RecordSet::from_records(vec![record! {
            "tags" => Value::Opaque(json!(["a", "b"])),
            "pos" => Value::Opaque(json!({"x": 1})),
        }]);
        let mut buffer = Vec::new();
        write_xml(&mut buffer, &records, &XmlWriteOptions::default()).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("    <tags>a</tags>\n    <tags>b</tags>\n"));
        assert!(output.contains("    <pos>\n      <x>1</x>\n    </pos>\n"));

        let back = read_xml(output.as_bytes()).unwrap();
        assert_eq!(back.records()[0]["tags"], Value::Opaque(json!(["a", "b"])));
        assert_eq!(back.records()[0]["pos"], Value::Opaque(json!({"x": "1"})));
    }

    #[test]
    fn test_round_trip_strings() {
        let records = RecordSet::from_records(vec![
            record! { "a" => "1", "b" => "<x>" },
            record! { "a" => "2", "b" => "it's" },
        ]);
        let mut buffer = Vec::new();
        write_xml(&mut buffer, &records, &XmlWriteOptions::default()).unwrap();
        assert_eq!(read_xml(&buffer).unwrap(), records);
    }

    #[test]
    fn test_sanitize_xml_name() {
        assert_eq!(sanitize_xml_name("first name"), "first_name");
        assert_eq!(sanitize_xml_name("1st"), "_1st");
        assert_eq!(sanitize_xml_name("a.b-c"), "a.b-c");
        assert_eq!(sanitize_xml_name(""), "_");
    }

    #[test]
    fn test_empty_record_set_is_rejected() {
        let err = XmlWriter::new(Vec::new())
            .write_records(&RecordSet::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyRecordSet { .. }));
    }
}
