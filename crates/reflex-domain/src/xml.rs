//! XML wire format for domains.
//!
//! The format is fixed and emitted byte for byte; downstream tools replay
//! logs by string comparison, so the writer takes no formatting liberties:
//!
//! ```text
//! <value type="bool" name="true"/>
//! <value type="int" name="42"/>
//! <value type="float" name="1.500000"/>
//! <symbol type="Behavior" value="Survey"/>
//! <object value="auv"/>
//! <set type="Color"><symbol type="Color" value="Red"/>...</set>
//! <set type="Color"/>
//! <interval type="int" min="0" max="10"/>
//! <interval type="float" min="-inf" max="+inf"/>
//! ```
//!
//! Floats are fixed-point with six fractional digits. Infinite interval
//! bounds render symbolically as `+inf` / `-inf`. The parser accepts
//! exactly the writer's output, modulo insignificant whitespace, so every
//! emitted domain parses back to an equal [`Domain`].

use crate::domain::{Bound, Domain, DomainKind, Value};
use reflex_types::ErrorCode;
use thiserror::Error;

/// Wire format errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// Input ended inside an element.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// Input does not follow the wire grammar.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Element name outside the domain vocabulary.
    #[error("unknown element: <{0}>")]
    UnknownElement(String),

    /// A required attribute is absent.
    #[error("element <{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Element carrying the defect.
        element: String,
        /// Name of the absent attribute.
        attribute: String,
    },

    /// An attribute value does not parse as the expected kind.
    #[error("invalid value in <{element}>: {message}")]
    InvalidValue {
        /// Element carrying the defect.
        element: String,
        /// What went wrong.
        message: String,
    },

    /// Well-formed document followed by extra content.
    #[error("trailing content after document")]
    TrailingContent,
}

impl ErrorCode for XmlError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedEnd => "XML_UNEXPECTED_END",
            Self::Malformed(_) => "XML_MALFORMED",
            Self::UnknownElement(_) => "XML_UNKNOWN_ELEMENT",
            Self::MissingAttribute { .. } => "XML_MISSING_ATTRIBUTE",
            Self::InvalidValue { .. } => "XML_INVALID_VALUE",
            Self::TrailingContent => "XML_TRAILING_CONTENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Appends `raw` to `out`, escaping the XML attribute metacharacters.
pub fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let mut matched = false;
        for (entity, ch) in [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"')] {
            if let Some(tail) = rest.strip_prefix(entity) {
                out.push(ch);
                rest = tail;
                matched = true;
                break;
            }
        }
        if !matched {
            // Unrecognized entity, keep the ampersand literally.
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Serializes a domain into `out`.
pub fn write_domain(domain: &Domain, out: &mut String) {
    match domain.kind() {
        DomainKind::Singleton(value) => write_singleton(domain.type_name(), value, out),
        DomainKind::Set(values) => {
            out.push_str("<set type=\"");
            push_escaped(out, domain.type_name());
            if values.is_empty() {
                out.push_str("\"/>");
            } else {
                out.push_str("\">");
                for value in values {
                    write_singleton(domain.type_name(), value, out);
                }
                out.push_str("</set>");
            }
        }
        DomainKind::Interval { min, max } => {
            out.push_str("<interval type=\"");
            push_escaped(out, domain.type_name());
            out.push_str("\" min=\"");
            out.push_str(&min.to_string());
            out.push_str("\" max=\"");
            out.push_str(&max.to_string());
            out.push_str("\"/>");
        }
    }
}

/// Serializes a domain into a fresh string.
#[must_use]
pub fn domain_to_xml(domain: &Domain) -> String {
    let mut out = String::new();
    write_domain(domain, &mut out);
    out
}

fn write_singleton(ty: &str, value: &Value, out: &mut String) {
    match value {
        Value::Bool(b) => {
            out.push_str("<value type=\"bool\" name=\"");
            out.push_str(if *b { "true" } else { "false" });
            out.push_str("\"/>");
        }
        Value::Int(_) | Value::Float(_) => {
            out.push_str("<value type=\"");
            push_escaped(out, ty);
            out.push_str("\" name=\"");
            out.push_str(&value.to_string());
            out.push_str("\"/>");
        }
        Value::Symbol(s) => {
            out.push_str("<symbol type=\"");
            push_escaped(out, ty);
            out.push_str("\" value=\"");
            push_escaped(out, s);
            out.push_str("\"/>");
        }
        Value::Entity(name) => {
            out.push_str("<object value=\"");
            push_escaped(out, name);
            out.push_str("\"/>");
        }
    }
}

/// Parses one domain element, requiring the whole input to be consumed.
///
/// # Errors
///
/// Returns [`XmlError`] when the input is not a single well-formed domain
/// element in the wire vocabulary.
pub fn parse_domain(input: &str) -> Result<Domain, XmlError> {
    let mut cursor = Cursor::new(input);
    let element = cursor.parse_element()?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(XmlError::TrailingContent);
    }
    interpret(&element)
}

struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, name: &str) -> Result<&str, XmlError> {
        self.attr(name).ok_or_else(|| XmlError::MissingAttribute {
            element: self.name.clone(),
            attribute: name.to_string(),
        })
    }
}

fn interpret(element: &Element) -> Result<Domain, XmlError> {
    match element.name.as_str() {
        "value" => {
            let ty = element.require("type")?;
            let name = element.require("name")?;
            if ty == "bool" {
                match name {
                    "true" => Ok(Domain::boolean(true)),
                    "false" => Ok(Domain::boolean(false)),
                    other => Err(XmlError::InvalidValue {
                        element: element.name.clone(),
                        message: format!("'{other}' is not a boolean"),
                    }),
                }
            } else {
                Ok(Domain::scalar(ty, parse_numeric(&element.name, name)?))
            }
        }
        "symbol" => Ok(Domain::symbol(
            element.require("type")?,
            element.require("value")?,
        )),
        "object" => Ok(Domain::entity(element.require("value")?)),
        "set" => {
            let ty = element.require("type")?;
            let mut values = Vec::with_capacity(element.children.len());
            for child in &element.children {
                let member = interpret(child)?;
                match member.singleton() {
                    Some(value) => values.push(value.clone()),
                    None => {
                        return Err(XmlError::InvalidValue {
                            element: element.name.clone(),
                            message: format!("<{}> member is not a singleton", child.name),
                        })
                    }
                }
            }
            Ok(Domain::set(ty, values))
        }
        "interval" => {
            let ty = element.require("type")?;
            let min = parse_bound(&element.name, element.require("min")?)?;
            let max = parse_bound(&element.name, element.require("max")?)?;
            Ok(Domain::interval(ty, min, max))
        }
        other => Err(XmlError::UnknownElement(other.to_string())),
    }
}

fn parse_numeric(element: &str, text: &str) -> Result<Value, XmlError> {
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Int(i));
        }
    }
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| XmlError::InvalidValue {
            element: element.to_string(),
            message: format!("'{text}' is not numeric"),
        })
}

fn parse_bound(element: &str, text: &str) -> Result<Bound, XmlError> {
    match text {
        "+inf" => Ok(Bound::PlusInf),
        "-inf" => Ok(Bound::MinusInf),
        _ => match parse_numeric(element, text)? {
            Value::Int(i) => Ok(Bound::Int(i)),
            Value::Float(x) => Ok(Bound::Float(x)),
            _ => unreachable!("parse_numeric yields Int or Float"),
        },
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Result<char, XmlError> {
        let c = self.peek().ok_or(XmlError::UnexpectedEnd)?;
        self.pos += c.len_utf8();
        Ok(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), XmlError> {
        let c = self.bump()?;
        if c != expected {
            return Err(XmlError::Malformed(format!(
                "expected '{expected}', found '{c}'"
            )));
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_name(&mut self) -> Result<String, XmlError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(XmlError::Malformed("expected a name".to_string()));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_element(&mut self) -> Result<Element, XmlError> {
        self.skip_whitespace();
        self.expect('<')?;
        let name = self.read_name()?;
        let mut attrs = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek().ok_or(XmlError::UnexpectedEnd)? {
                '/' => {
                    self.bump()?;
                    self.expect('>')?;
                    return Ok(Element {
                        name,
                        attrs,
                        children: Vec::new(),
                    });
                }
                '>' => {
                    self.bump()?;
                    let children = self.parse_children(&name)?;
                    return Ok(Element {
                        name,
                        attrs,
                        children,
                    });
                }
                _ => {
                    let attr_name = self.read_name()?;
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.skip_whitespace();
                    self.expect('"')?;
                    let value_start = self.pos;
                    while self.peek().is_some_and(|c| c != '"') {
                        self.pos += self.peek().map_or(0, char::len_utf8);
                    }
                    let raw = &self.input[value_start..self.pos];
                    self.expect('"')?;
                    attrs.push((attr_name, unescape(raw)));
                }
            }
        }
    }

    fn parse_children(&mut self, parent: &str) -> Result<Vec<Element>, XmlError> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("</") {
                self.pos += 2;
                let closing = self.read_name()?;
                if closing != parent {
                    return Err(XmlError::Malformed(format!(
                        "closing </{closing}> does not match <{parent}>"
                    )));
                }
                self.skip_whitespace();
                self.expect('>')?;
                return Ok(children);
            }
            if self.peek() != Some('<') {
                return Err(XmlError::Malformed(format!(
                    "text content inside <{parent}> is not allowed"
                )));
            }
            children.push(self.parse_element()?);
        }
    }
}
