use std::fmt::Write as _;

use puzzlecut_core::{GridDescriptor, PuzzleError};

use crate::assembler::Piece;
use crate::path::{BoundaryPath, Point, Segment};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const ALLOWED_ELEMENTS: [&str; 2] = ["svg", "path"];
/// Elements that would carry raster data, fills or indirection into a cut
/// file. Anything outside [`ALLOWED_ELEMENTS`] is rejected anyway; this list
/// names the usual suspects for log messages and tests.
pub const DISALLOWED_ELEMENTS: [&str; 16] = [
    "image",
    "pattern",
    "defs",
    "linearGradient",
    "radialGradient",
    "rect",
    "use",
    "foreignObject",
    "filter",
    "mask",
    "clipPath",
    "style",
    "script",
    "symbol",
    "text",
    "g",
];
pub const STROKE_COLOR: &str = "#000000";
pub const SVG_ATTRIBUTES: [&str; 5] = ["xmlns", "version", "width", "height", "viewBox"];
pub const PATH_ATTRIBUTES: [&str; 5] = ["id", "d", "fill", "stroke", "stroke-width"];

#[derive(Clone, Debug, PartialEq)]
pub struct LaserArtifact {
    pub width_mm: f64,
    pub height_mm: f64,
    /// Path data, one per piece, in millimetres.
    pub paths: Vec<String>,
    pub document: String,
}

impl LaserArtifact {
    pub fn piece_count(&self) -> usize {
        self.paths.len()
    }

    pub fn as_svg(&self) -> &str {
        &self.document
    }
}

fn fmt_mm(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    // A negative zero would survive as "-0.000" and break closure checks.
    if text.starts_with('-') && text[1..].chars().all(|ch| ch == '0' || ch == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

fn push_point(out: &mut String, (x, y): Point, grid: &GridDescriptor, precision: usize) {
    out.push_str(&fmt_mm(grid.origin_x + x * grid.cell_width, precision));
    out.push(' ');
    out.push_str(&fmt_mm(grid.origin_y + y * grid.cell_height, precision));
}

/// SVG path data for one outline. The final point is written out explicitly
/// and always equals the first.
pub fn path_data(boundary: &BoundaryPath, grid: &GridDescriptor, precision: usize) -> String {
    let mut out = String::with_capacity(boundary.segments.len() * 48 + 16);
    out.push_str("M ");
    push_point(&mut out, boundary.start, grid, precision);
    for segment in &boundary.segments {
        match *segment {
            Segment::LineTo(to) => {
                out.push_str(" L ");
                push_point(&mut out, to, grid, precision);
            }
            Segment::CubicTo { c1, c2, to } => {
                out.push_str(" C ");
                push_point(&mut out, c1, grid, precision);
                out.push(' ');
                push_point(&mut out, c2, grid, precision);
                out.push(' ');
                push_point(&mut out, to, grid, precision);
            }
        }
    }
    if !boundary.is_closed() {
        out.push_str(" L ");
        push_point(&mut out, boundary.start, grid, precision);
    }
    out.push_str(" Z");
    out
}

/// Writes a stroke-only SVG with one `<path>` per piece and validates the
/// result before handing it out.
pub fn serialize(
    pieces: &[Piece],
    grid: &GridDescriptor,
    stroke_width_mm: f64,
    precision: usize,
) -> Result<LaserArtifact, PuzzleError> {
    let width_mm = grid.canvas_width;
    let height_mm = grid.canvas_height;
    let width = fmt_mm(width_mm, precision);
    let height = fmt_mm(height_mm, precision);
    let stroke = fmt_mm(stroke_width_mm, precision);
    let paths: Vec<String> = pieces
        .iter()
        .map(|piece| path_data(&piece.boundary, grid, precision))
        .collect();

    let mut document = String::with_capacity(paths.iter().map(String::len).sum::<usize>() + 256);
    let _ = writeln!(
        document,
        "<svg xmlns=\"{SVG_NAMESPACE}\" version=\"1.1\" width=\"{width}mm\" height=\"{height}mm\" viewBox=\"0 0 {width} {height}\">"
    );
    for (piece, data) in pieces.iter().zip(&paths) {
        let _ = writeln!(
            document,
            "<path id=\"piece-{}-{}\" d=\"{data}\" fill=\"none\" stroke=\"{STROKE_COLOR}\" stroke-width=\"{stroke}\"/>",
            piece.row(),
            piece.col()
        );
    }
    document.push_str("</svg>\n");

    validate_document(&document, pieces.len())?;
    tracing::debug!(paths = paths.len(), bytes = document.len(), "laser artifact written");
    Ok(LaserArtifact {
        width_mm,
        height_mm,
        paths,
        document,
    })
}

#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    attrs: &'a str,
    closing: bool,
}

fn unsafe_artifact(reason: String) -> PuzzleError {
    tracing::error!(%reason, "laser artifact rejected");
    PuzzleError::UnsafeArtifact(reason)
}

fn scan_tags(document: &str) -> Result<Vec<Tag<'_>>, PuzzleError> {
    let mut tags = Vec::new();
    let mut rest = document;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        if after.starts_with('!') || after.starts_with('?') {
            return Err(unsafe_artifact("markup declarations are not allowed".into()));
        }
        let close = after
            .find('>')
            .ok_or_else(|| unsafe_artifact("unterminated tag".into()))?;
        let body = &after[..close];
        let (closing, body) = match body.strip_prefix('/') {
            Some(body) => (true, body),
            None => (false, body),
        };
        let body = body.strip_suffix('/').unwrap_or(body);
        let name_end = body
            .find(|ch: char| ch.is_whitespace())
            .unwrap_or(body.len());
        tags.push(Tag {
            name: &body[..name_end],
            attrs: &body[name_end..],
            closing,
        });
        rest = &after[close + 1..];
    }
    Ok(tags)
}

/// Splits ` name="value"` pairs. Anything else between the element name
/// and the end of the tag is rejected.
fn parse_attributes(attrs: &str) -> Result<Vec<(&str, &str)>, String> {
    let mut pairs = Vec::new();
    let mut rest = attrs;
    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            return Ok(pairs);
        }
        if trimmed.len() == rest.len() {
            return Err(format!("attributes run together near {trimmed:.16}"));
        }
        let eq = trimmed
            .find('=')
            .ok_or_else(|| format!("attribute without value near {trimmed:.16}"))?;
        let name = &trimmed[..eq];
        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | ':' | '_'));
        if !valid_name {
            return Err(format!("malformed attribute name {name:?}"));
        }
        let quoted = trimmed[eq + 1..]
            .strip_prefix('"')
            .ok_or_else(|| format!("attribute {name} is not quoted"))?;
        let end = quoted
            .find('"')
            .ok_or_else(|| format!("attribute {name} is unterminated"))?;
        pairs.push((name, &quoted[..end]));
        rest = &quoted[end + 1..];
    }
}

fn checked_attributes<'a>(
    tag: &Tag<'a>,
    allowed: &[&str],
) -> Result<Vec<(&'a str, &'a str)>, PuzzleError> {
    let pairs = parse_attributes(tag.attrs)
        .map_err(|reason| unsafe_artifact(format!("<{}>: {reason}", tag.name)))?;
    for (idx, (name, _)) in pairs.iter().enumerate() {
        if !allowed.contains(name) {
            return Err(unsafe_artifact(format!(
                "attribute {name} is not allowed on <{}>",
                tag.name
            )));
        }
        if pairs[..idx].iter().any(|(seen, _)| seen == name) {
            return Err(unsafe_artifact(format!(
                "duplicate attribute {name} on <{}>",
                tag.name
            )));
        }
    }
    Ok(pairs)
}

/// Fails unless `document` holds nothing but one `<svg>` root and exactly
/// `expected_paths` closed, stroke-only `<path>` elements carrying only
/// geometry and stroke attributes.
pub fn validate_document(document: &str, expected_paths: usize) -> Result<(), PuzzleError> {
    if document.to_ascii_lowercase().contains("url(") {
        return Err(unsafe_artifact("paint server reference found".into()));
    }
    let tags = scan_tags(document)?;
    for tag in &tags {
        if !ALLOWED_ELEMENTS.contains(&tag.name) {
            return Err(unsafe_artifact(format!("disallowed element <{}>", tag.name)));
        }
        if tag.closing && !tag.attrs.trim().is_empty() {
            return Err(unsafe_artifact(format!("closing </{}> has attributes", tag.name)));
        }
    }
    match (tags.first(), tags.last()) {
        (Some(first), Some(last))
            if first.name == "svg" && !first.closing && last.name == "svg" && last.closing => {}
        _ => return Err(unsafe_artifact("document is not a single svg root".into())),
    }
    let roots = tags.iter().filter(|tag| tag.name == "svg").count();
    if roots != 2 {
        return Err(unsafe_artifact("nested svg elements".into()));
    }
    checked_attributes(&tags[0], &SVG_ATTRIBUTES)?;

    let mut paths = 0;
    for tag in tags.iter().filter(|tag| tag.name == "path") {
        if tag.closing {
            return Err(unsafe_artifact("path elements must be self-closing".into()));
        }
        paths += 1;
        let attrs = checked_attributes(tag, &PATH_ATTRIBUTES)?;
        let value = |key: &str| {
            attrs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
        };
        match value("fill") {
            Some("none") => {}
            other => {
                return Err(unsafe_artifact(format!(
                    "path {paths} has fill {}",
                    other.unwrap_or("<default>")
                )))
            }
        }
        let data =
            value("d").ok_or_else(|| unsafe_artifact(format!("path {paths} has no data")))?;
        validate_path_data(data)
            .map_err(|reason| unsafe_artifact(format!("path {paths}: {reason}")))?;
    }
    if paths != expected_paths {
        return Err(unsafe_artifact(format!(
            "expected {expected_paths} paths, found {paths}"
        )));
    }
    Ok(())
}

fn next_number(tokens: &mut std::str::SplitWhitespace<'_>) -> Result<f64, String> {
    let token = tokens.next().ok_or("truncated coordinates")?;
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("bad coordinate {token}"))
}

/// Accepts only `M`, `L`, `C` and `Z` with explicit coordinates, and requires
/// the last point to land exactly on the first.
pub fn validate_path_data(data: &str) -> Result<(), String> {
    let mut tokens = data.split_whitespace();
    if tokens.next() != Some("M") {
        return Err("path must start with M".into());
    }
    let start = (next_number(&mut tokens)?, next_number(&mut tokens)?);
    let mut current = start;
    let mut closed = false;
    while let Some(command) = tokens.next() {
        if closed {
            return Err("commands after Z".into());
        }
        match command {
            "L" => current = (next_number(&mut tokens)?, next_number(&mut tokens)?),
            "C" => {
                for _ in 0..4 {
                    next_number(&mut tokens)?;
                }
                current = (next_number(&mut tokens)?, next_number(&mut tokens)?);
            }
            "Z" => closed = true,
            other => return Err(format!("command {other} not allowed")),
        }
    }
    if !closed {
        return Err("path is not closed".into());
    }
    if current != start {
        return Err(format!(
            "path ends at {:?} instead of its start {:?}",
            current, start
        ));
    }
    Ok(())
}
