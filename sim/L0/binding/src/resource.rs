//! Declarative resource trees.
//!
//! A [`ResourceElement`] is a tag, a sorted attribute map and ordered
//! children. The resource builder emits nothing else, and the engine
//! consumes nothing else. Sorted attributes make the XML rendering (and
//! therefore repeated builds of the same scene) byte-identical.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{Vector3, Vector4};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::error::BindingError;

/// Element tags understood by the engine.
pub mod tags {
    /// Document root.
    pub const ROOT: &str = "mujoco";
    /// Compiler settings.
    pub const COMPILER: &str = "compiler";
    /// Physics options.
    pub const OPTION: &str = "option";
    /// Asset section.
    pub const ASSET: &str = "asset";
    /// World body.
    pub const WORLDBODY: &str = "worldbody";
    /// Body.
    pub const BODY: &str = "body";
    /// Geometry.
    pub const GEOM: &str = "geom";
    /// Joint.
    pub const JOINT: &str = "joint";
    /// Explicit inertia.
    pub const INERTIAL: &str = "inertial";
    /// Mesh asset.
    pub const MESH: &str = "mesh";
    /// Heightfield asset.
    pub const HFIELD: &str = "hfield";
}

/// Attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Free text.
    Text(String),
    /// Integer.
    Int(i64),
    /// Scalar.
    Real(f64),
    /// Space-separated scalars.
    Reals(Vec<f64>),
    /// `true` / `false`.
    Bool(bool),
}

impl AttrValue {
    /// Text value, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; reals with no fractional part also convert.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Scalar values; a single scalar yields a one-element vector.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_reals(&self) -> Option<Vec<f64>> {
        match self {
            Self::Real(r) => Some(vec![*r]),
            Self::Int(i) => Some(vec![*i as f64]),
            Self::Reals(v) => Some(v.clone()),
            Self::Text(s) => s
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .ok(),
            Self::Bool(_) => None,
        }
    }

    /// Boolean value; `"true"`/`"false"` text also converts.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Reals(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            Self::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for AttrValue {
    #[allow(clippy::cast_possible_wrap)]
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        Self::Reals(value)
    }
}

impl From<&[f64]> for AttrValue {
    fn from(value: &[f64]) -> Self {
        Self::Reals(value.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for AttrValue {
    fn from(value: [f64; N]) -> Self {
        Self::Reals(value.to_vec())
    }
}

impl From<Vector3<f64>> for AttrValue {
    fn from(value: Vector3<f64>) -> Self {
        Self::Reals(value.as_slice().to_vec())
    }
}

impl From<Vector4<f64>> for AttrValue {
    fn from(value: Vector4<f64>) -> Self {
        Self::Reals(value.as_slice().to_vec())
    }
}

/// Declarative tree node: tag, attributes, ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceElement {
    tag: String,
    attributes: BTreeMap<String, AttrValue>,
    children: Vec<ResourceElement>,
}

impl ResourceElement {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Element tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Append a child.
    pub fn push(&mut self, child: Self) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Raw attribute.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Text attribute.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(AttrValue::as_text)
    }

    /// Integer attribute.
    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(AttrValue::as_int)
    }

    /// Scalar attribute (first value of a list).
    #[must_use]
    pub fn real(&self, key: &str) -> Option<f64> {
        self.reals(key).and_then(|v| v.first().copied())
    }

    /// Scalar list attribute.
    #[must_use]
    pub fn reals(&self, key: &str) -> Option<Vec<f64>> {
        self.attr(key).and_then(AttrValue::as_reals)
    }

    /// Boolean attribute.
    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.attr(key).and_then(AttrValue::as_bool)
    }

    /// The `name` attribute.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    /// Children in order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Mutable children.
    pub fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    /// First child with the given tag.
    #[must_use]
    pub fn child(&self, tag: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Children with the given tag.
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Depth-first search for an element with the given tag and name.
    #[must_use]
    pub fn find(&self, tag: &str, name: &str) -> Option<&Self> {
        if self.tag == tag && self.name() == Some(name) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag, name))
    }

    /// Render as indented XML.
    pub fn to_xml_string(&self) -> crate::Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).map_err(BindingError::output)
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &ResourceElement) -> crate::Result<()> {
    let rendered: Vec<(&str, String)> = element
        .attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.to_string()))
        .collect();
    let mut start = BytesStart::new(element.tag.as_str());
    for (key, value) in &rendered {
        start.push_attribute((*key, value.as_str()));
    }

    if element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| BindingError::output(format!("write error: {e}")))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| BindingError::output(format!("write error: {e}")))?;
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.tag.as_str())))
        .map_err(|e| BindingError::output(format!("write error: {e}")))?;
    Ok(())
}

/// The single tree handed to the engine, plus the binary mesh blobs it
/// references by file name.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedDescription {
    root: ResourceElement,
    blobs: BTreeMap<String, Vec<u8>>,
}

impl ComposedDescription {
    /// Wrap a root element.
    #[must_use]
    pub fn new(root: ResourceElement) -> Self {
        Self {
            root,
            blobs: BTreeMap::new(),
        }
    }

    /// Attach a synthesized mesh blob under `file`.
    pub fn insert_blob(&mut self, file: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.insert(file.into(), bytes);
    }

    /// Root element.
    #[must_use]
    pub fn root(&self) -> &ResourceElement {
        &self.root
    }

    /// Mutable root element.
    pub fn root_mut(&mut self) -> &mut ResourceElement {
        &mut self.root
    }

    /// Blob registered under `file`.
    #[must_use]
    pub fn blob(&self, file: &str) -> Option<&[u8]> {
        self.blobs.get(file).map(Vec::as_slice)
    }

    /// All blobs in file-name order.
    #[must_use]
    pub fn blobs(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.blobs
    }

    /// The merged asset section.
    #[must_use]
    pub fn assets(&self) -> &[ResourceElement] {
        self.root
            .child(tags::ASSET)
            .map_or(&[], ResourceElement::children)
    }

    /// The world body.
    #[must_use]
    pub fn worldbody(&self) -> Option<&ResourceElement> {
        self.root.child(tags::WORLDBODY)
    }

    /// Render the tree as XML.
    pub fn to_xml_string(&self) -> crate::Result<String> {
        self.root.to_xml_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn attributes_render_sorted_and_compact() {
        let geom = ResourceElement::new(tags::GEOM)
            .with("type", "box")
            .with("size", Vector3::new(1.0, 2.0, 3.0))
            .with("name", "crate")
            .with("contype", 1);
        let xml = geom.to_xml_string().unwrap();
        assert_eq!(
            xml.trim(),
            r#"<geom contype="1" name="crate" size="1 2 3" type="box"/>"#
        );
    }

    #[test]
    fn nested_rendering() {
        let body = ResourceElement::new(tags::BODY)
            .with("name", "b")
            .with_child(ResourceElement::new(tags::JOINT).with("type", "free"));
        let xml = body.to_xml_string().unwrap();
        assert!(xml.trim_start().starts_with(r#"<body name="b">"#));
        assert!(xml.contains(r#"<joint type="free"/>"#));
        assert!(xml.trim_end().ends_with("</body>"));
    }

    #[test]
    fn typed_reads() {
        let joint = ResourceElement::new(tags::JOINT)
            .with("limited", true)
            .with("range", [-1.0, 1.0])
            .with("axis", "0 0 1");
        assert_eq!(joint.bool("limited"), Some(true));
        assert_eq!(joint.reals("range"), Some(vec![-1.0, 1.0]));
        assert_eq!(joint.reals("axis"), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(joint.real("range"), Some(-1.0));
        assert!(joint.text("name").is_none());
    }

    #[test]
    fn find_searches_depth_first() {
        let root = ResourceElement::new(tags::WORLDBODY).with_child(
            ResourceElement::new(tags::BODY)
                .with("name", "a")
                .with_child(ResourceElement::new(tags::GEOM).with("name", "g")),
        );
        assert!(root.find(tags::GEOM, "g").is_some());
        assert!(root.find(tags::BODY, "g").is_none());
    }

    #[test]
    fn description_exposes_assets() {
        let root = ResourceElement::new(tags::ROOT).with_child(
            ResourceElement::new(tags::ASSET)
                .with_child(ResourceElement::new(tags::MESH).with("name", "m")),
        );
        let mut description = ComposedDescription::new(root);
        description.insert_blob("m.msh", vec![0, 1, 2]);

        assert_eq!(description.assets().len(), 1);
        assert_eq!(description.blob("m.msh"), Some(&[0u8, 1, 2][..]));
        assert!(description.worldbody().is_none());
    }
}
