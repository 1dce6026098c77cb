//! SVG template engine.
//!
//! A template is a partially populated SVG document declaring geometry
//! and visual chrome. One validating parse builds a typed structure with
//! locators for the named slots; everything else is carried as opaque
//! subtree and reappears untouched in the output.
//!
//! Required structure:
//! - exactly one `<svg id="terminal">` root with integer width/height
//!   and a matching viewBox;
//! - exactly one descendant `<svg id="screen">`;
//! - exactly one `<style id="generated-style">` and one
//!   `<style id="user-style">`, children of a `<defs>`;
//! - exactly one `<template_settings>` in the termtosvg namespace with a
//!   `<screen_geometry cols rows>` child and an optional
//!   `<animation type="css"|"waapi">` child (default css);
//! - for waapi, a `<script id="generated-js">` slot.

use std::fmt;

use thiserror::Error;
use xmltree::{Element, EmitterConfig, XMLNode};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const TERMTOSVG_NS: &str = "https://github.com/nbedos/termtosvg";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template is not well-formed XML: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("template is missing required element {0}")]
    MissingSlot(&'static str),

    #[error("template has more than one {0}")]
    DuplicateSlot(&'static str),

    #[error("invalid template dimension: {0}")]
    InvalidSize(String),

    #[error("invalid screen_geometry: {0}")]
    InvalidGeometry(String),

    #[error("unknown animation type {0:?}")]
    UnknownAnimationType(String),

    #[error("no such template: {0}")]
    UnknownTemplate(String),

    #[error("template I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize SVG: {0}")]
    Serialize(String),
}

/// The animation driver a template selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    Css,
    Waapi,
    /// Used by the still-frame path; no template declares it
    None,
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationKind::Css => write!(f, "css"),
            AnimationKind::Waapi => write!(f, "waapi"),
            AnimationKind::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FontSpec {
    pub family: String,
    pub size: u32,
}

impl Default for FontSpec {
    fn default() -> Self {
        FontSpec {
            family: "DejaVu Sans Mono".to_string(),
            size: 14,
        }
    }
}

/// Child-index path from the root element to a slot element
type Path = Vec<usize>;

#[derive(Debug, Clone)]
pub struct Template {
    root: Element,
    screen_path: Path,
    gen_style_path: Path,
    gen_script_path: Option<Path>,
    settings_path: Path,
    geometry_path: Path,

    pub cols: usize,
    pub rows: usize,
    pub width: u32,
    pub height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub font: FontSpec,
    pub animation: AnimationKind,
}

#[derive(Default)]
struct SlotPaths {
    screen: Vec<Path>,
    gen_style: Vec<Path>,
    user_style: Vec<Path>,
    gen_script: Vec<Path>,
    settings: Vec<Path>,
}

fn collect_slots(element: &Element, path: &mut Path, found: &mut SlotPaths) {
    // The style slots must live under a <defs>; styles found elsewhere
    // are not slots and leave the requirement unsatisfied.
    let in_defs = element.name == "defs";

    for (index, node) in element.children.iter().enumerate() {
        let child = match node {
            XMLNode::Element(child) => child,
            _ => continue,
        };
        path.push(index);

        let id = child.attributes.get("id").map(|s| s.as_str());
        match (child.name.as_str(), id) {
            ("svg", Some("screen")) => found.screen.push(path.clone()),
            ("style", Some("generated-style")) if in_defs => {
                found.gen_style.push(path.clone())
            }
            ("style", Some("user-style")) if in_defs => found.user_style.push(path.clone()),
            ("script", Some("generated-js")) => found.gen_script.push(path.clone()),
            ("template_settings", _)
                if child.namespace.as_deref() == Some(TERMTOSVG_NS) =>
            {
                found.settings.push(path.clone());
            }
            _ => {}
        }

        collect_slots(child, path, found);
        path.pop();
    }
}

fn element_at<'a>(root: &'a Element, path: &Path) -> &'a Element {
    let mut current = root;
    for &index in path {
        current = match &current.children[index] {
            XMLNode::Element(child) => child,
            _ => unreachable!("slot paths always point at elements"),
        };
    }
    current
}

fn element_at_mut<'a>(root: &'a mut Element, path: &Path) -> &'a mut Element {
    let mut current = root;
    for &index in path {
        current = match &mut current.children[index] {
            XMLNode::Element(child) => child,
            _ => unreachable!("slot paths always point at elements"),
        };
    }
    current
}

fn parse_int_attr(element: &Element, attr: &'static str) -> Result<u32, TemplateError> {
    let value = element
        .attributes
        .get(attr)
        .ok_or_else(|| TemplateError::InvalidSize(format!("missing {:?} attribute", attr)))?;
    value
        .parse::<u32>()
        .map_err(|_| TemplateError::InvalidSize(format!("{:?} must be an integer, got {:?}", attr, value)))
}

fn parse_viewbox(element: &Element) -> Result<[i64; 4], TemplateError> {
    let value = element
        .attributes
        .get("viewBox")
        .ok_or_else(|| TemplateError::InvalidSize("missing viewBox".to_string()))?;
    let parts: Vec<i64> = value
        .replace(',', " ")
        .split_whitespace()
        .map(|n| n.parse::<i64>())
        .collect::<Result<_, _>>()
        .map_err(|_| TemplateError::InvalidSize(format!("viewBox must be integers, got {:?}", value)))?;
    if parts.len() != 4 {
        return Err(TemplateError::InvalidSize(format!(
            "viewBox must have four numbers, got {:?}",
            value
        )));
    }
    Ok([parts[0], parts[1], parts[2], parts[3]])
}

fn single<T>(mut paths: Vec<T>, slot: &'static str) -> Result<T, TemplateError> {
    match paths.len() {
        0 => Err(TemplateError::MissingSlot(slot)),
        1 => Ok(paths.remove(0)),
        _ => Err(TemplateError::DuplicateSlot(slot)),
    }
}

impl Template {
    /// Parse and validate a template document.
    pub fn parse(source: &str) -> Result<Template, TemplateError> {
        let root = Element::parse(source.as_bytes())?;

        if root.name != "svg" || root.attributes.get("id").map(|s| s.as_str()) != Some("terminal") {
            return Err(TemplateError::MissingSlot("svg#terminal"));
        }

        let width = parse_int_attr(&root, "width")?;
        let height = parse_int_attr(&root, "height")?;
        let viewbox = parse_viewbox(&root)?;
        if viewbox[2] != width as i64 || viewbox[3] != height as i64 {
            return Err(TemplateError::InvalidSize(format!(
                "viewBox {}x{} does not match width/height {}x{}",
                viewbox[2], viewbox[3], width, height
            )));
        }

        let mut found = SlotPaths::default();
        collect_slots(&root, &mut Vec::new(), &mut found);

        let screen_path = single(found.screen, "svg#screen")?;
        let gen_style_path = single(found.gen_style, "style#generated-style")?;
        let _user_style_path = single(found.user_style, "style#user-style")?;
        let settings_path = single(found.settings, "template_settings")?;
        let gen_script_path = match found.gen_script.len() {
            0 => None,
            1 => Some(found.gen_script.remove(0)),
            _ => return Err(TemplateError::DuplicateSlot("script#generated-js")),
        };

        let screen = element_at(&root, &screen_path);
        let screen_width = parse_int_attr(screen, "width")?;
        let screen_height = parse_int_attr(screen, "height")?;

        let settings = element_at(&root, &settings_path);
        let mut geometry_path = None;
        let mut animation = AnimationKind::Css;
        let mut font = FontSpec::default();
        for (index, node) in settings.children.iter().enumerate() {
            let child = match node {
                XMLNode::Element(child) => child,
                _ => continue,
            };
            match child.name.as_str() {
                "screen_geometry" => {
                    let mut path = settings_path.clone();
                    path.push(index);
                    geometry_path = Some(path);
                }
                "animation" => {
                    let kind = child
                        .attributes
                        .get("type")
                        .map(|s| s.as_str())
                        .unwrap_or("css");
                    animation = match kind {
                        "css" => AnimationKind::Css,
                        "waapi" => AnimationKind::Waapi,
                        other => {
                            return Err(TemplateError::UnknownAnimationType(other.to_string()))
                        }
                    };
                }
                "font" => {
                    if let Some(family) = child.attributes.get("family") {
                        font.family = family.clone();
                    }
                    if let Some(size) = child.attributes.get("size") {
                        font.size = size.parse::<u32>().map_err(|_| {
                            TemplateError::InvalidSize(format!(
                                "font size must be an integer, got {:?}",
                                size
                            ))
                        })?;
                    }
                }
                _ => {}
            }
        }
        let geometry_path =
            geometry_path.ok_or(TemplateError::MissingSlot("screen_geometry"))?;

        let geometry = element_at(&root, &geometry_path);
        let cols = geometry
            .attributes
            .get("cols")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .ok_or_else(|| {
                TemplateError::InvalidGeometry("cols must be a positive integer".to_string())
            })?;
        let rows = geometry
            .attributes
            .get("rows")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .ok_or_else(|| {
                TemplateError::InvalidGeometry("rows must be a positive integer".to_string())
            })?;

        if animation == AnimationKind::Waapi && gen_script_path.is_none() {
            return Err(TemplateError::MissingSlot("script#generated-js"));
        }

        Ok(Template {
            cell_width: width as f64 / cols as f64,
            cell_height: height as f64 / rows as f64,
            root,
            screen_path,
            gen_style_path,
            gen_script_path,
            settings_path,
            geometry_path,
            cols,
            rows,
            width,
            height,
            screen_width,
            screen_height,
            font,
            animation,
        })
    }

    /// Rescale the document to the session geometry: the outer and inner
    /// svg dimensions and viewBoxes shift by a whole number of cells, and
    /// screen_geometry is rewritten to match.
    pub fn scale_to(&mut self, cols: usize, rows: usize) -> Result<(), TemplateError> {
        if cols == 0 || rows == 0 {
            return Err(TemplateError::InvalidGeometry(
                "target geometry must be positive".to_string(),
            ));
        }
        if cols == self.cols && rows == self.rows {
            return Ok(());
        }

        let dw = (self.cell_width * (cols as f64 - self.cols as f64)).round() as i64;
        let dh = (self.cell_height * (rows as f64 - self.rows as f64)).round() as i64;

        scale_element(&mut self.root, dw, dh)?;
        let screen = element_at_mut(&mut self.root, &self.screen_path);
        scale_element(screen, dw, dh)?;

        let geometry = element_at_mut(&mut self.root, &self.geometry_path);
        geometry
            .attributes
            .insert("cols".to_string(), cols.to_string());
        geometry
            .attributes
            .insert("rows".to_string(), rows.to_string());

        self.width = (self.width as i64 + dw) as u32;
        self.height = (self.height as i64 + dh) as u32;
        self.screen_width = (self.screen_width as i64 + dw) as u32;
        self.screen_height = (self.screen_height as i64 + dh) as u32;
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    pub fn screen_mut(&mut self) -> &mut Element {
        element_at_mut(&mut self.root, &self.screen_path)
    }

    pub fn generated_style_mut(&mut self) -> &mut Element {
        element_at_mut(&mut self.root, &self.gen_style_path)
    }

    pub fn generated_script_mut(&mut self) -> Option<&mut Element> {
        let path = self.gen_script_path.clone()?;
        Some(element_at_mut(&mut self.root, &path))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Serialize the document with an XML declaration.
    pub fn to_svg_string(&self) -> Result<String, TemplateError> {
        let mut out = Vec::new();
        let config = EmitterConfig::new()
            .write_document_declaration(true)
            .perform_indent(false);
        self.root
            .write_with_config(&mut out, config)
            .map_err(|e| TemplateError::Serialize(e.to_string()))?;
        String::from_utf8(out).map_err(|e| TemplateError::Serialize(e.to_string()))
    }
}

fn scale_element(element: &mut Element, dw: i64, dh: i64) -> Result<(), TemplateError> {
    let mut viewbox = parse_viewbox(element)?;
    viewbox[2] += dw;
    viewbox[3] += dh;
    element.attributes.insert(
        "viewBox".to_string(),
        format!("{} {} {} {}", viewbox[0], viewbox[1], viewbox[2], viewbox[3]),
    );

    for (attr, delta) in [("width", dw), ("height", dh)] {
        if element.attributes.contains_key(attr) {
            let value = parse_int_attr(element, attr)?;
            let scaled = value as i64 + delta;
            if scaled < 1 {
                return Err(TemplateError::InvalidSize(format!(
                    "scaled {} collapses to {}",
                    attr, scaled
                )));
            }
            element
                .attributes
                .insert(attr.to_string(), scaled.to_string());
        }
    }
    Ok(())
}
