use std::collections::BTreeMap;
use std::fmt::Write as _;

use roxmltree::{Document, Node};

use super::SettingsError;

pub const SETTINGS_VERSION: u32 = 1;

/// Named string values plus action-to-key bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
    bindings: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Parses a numeric value. Returns `None` when the value is missing or
    /// not a number.
    pub fn u64_value(&self, name: &str) -> Option<u64> {
        self.value(name)?.trim().parse().ok()
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove_value(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn binding(&self, action: &str) -> Option<&str> {
        self.bindings.get(action).map(String::as_str)
    }

    pub fn bind(&mut self, action: impl Into<String>, key: impl Into<String>) {
        self.bindings.insert(action.into(), key.into());
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(action, key)| (action.as_str(), key.as_str()))
    }

    pub fn parse_xml(raw: &str) -> Result<Self, SettingsError> {
        let doc = Document::parse(raw).map_err(|error| SettingsError::Malformed {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
            message: error.to_string(),
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "Settings" {
            return Err(invalid_root(
                &doc,
                root,
                format!("expected <Settings>, found <{}>", root.tag_name().name()),
            ));
        }
        match root.attribute("version") {
            Some(version) if version.trim() == SETTINGS_VERSION.to_string() => {}
            Some(version) => {
                return Err(invalid_root(
                    &doc,
                    root,
                    format!("unsupported settings version '{version}'"),
                ))
            }
            None => return Err(invalid_root(&doc, root, "missing version attribute".to_string())),
        }

        let mut settings = Settings::new();
        for node in root.children().filter(Node::is_element) {
            match node.tag_name().name() {
                "Value" => {
                    let name = required_attribute(&doc, node, "name")?;
                    if settings.values.contains_key(name) {
                        return Err(invalid_entry(
                            &doc,
                            node,
                            format!("duplicate value '{name}'"),
                        ));
                    }
                    settings.set_value(name, node.text().unwrap_or_default());
                }
                "Binding" => {
                    let action = required_attribute(&doc, node, "action")?;
                    let key = required_attribute(&doc, node, "key")?;
                    if settings.bindings.contains_key(action) {
                        return Err(invalid_entry(
                            &doc,
                            node,
                            format!("duplicate binding for action '{action}'"),
                        ));
                    }
                    settings.bind(action, key);
                }
                other => {
                    return Err(invalid_entry(&doc, node, format!("unknown element <{other}>")));
                }
            }
        }
        Ok(settings)
    }

    pub fn to_xml(&self) -> String {
        let mut out = format!("<Settings version=\"{SETTINGS_VERSION}\">\n");
        for (name, value) in &self.values {
            let _ = writeln!(
                out,
                "  <Value name=\"{}\">{}</Value>",
                escape_xml(name),
                escape_xml(value)
            );
        }
        for (action, key) in &self.bindings {
            let _ = writeln!(
                out,
                "  <Binding action=\"{}\" key=\"{}\"/>",
                escape_xml(action),
                escape_xml(key)
            );
        }
        out.push_str("</Settings>\n");
        out
    }
}

fn required_attribute<'a>(
    doc: &Document<'_>,
    node: Node<'a, '_>,
    name: &str,
) -> Result<&'a str, SettingsError> {
    match node.attribute(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(invalid_entry(
            doc,
            node,
            format!("<{}> requires a non-empty '{name}' attribute", node.tag_name().name()),
        )),
    }
}

fn invalid_root(doc: &Document<'_>, node: Node<'_, '_>, message: String) -> SettingsError {
    let pos = doc.text_pos_at(node.range().start);
    SettingsError::InvalidRoot {
        line: pos.row as usize,
        column: pos.col as usize,
        message,
    }
}

fn invalid_entry(doc: &Document<'_>, node: Node<'_, '_>, message: String) -> SettingsError {
    let pos = doc.text_pos_at(node.range().start);
    SettingsError::InvalidEntry {
        line: pos.row as usize,
        column: pos.col as usize,
        message,
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
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
