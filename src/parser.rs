use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesRef, BytesStart, Event};

use crate::error::{CleanerError, Result};
use crate::gpx_types::*;

/// Decode raw file content to a string.
///
/// The encoding comes from a byte-order mark, else from the `encoding`
/// attribute of the XML declaration, else UTF-8.
pub fn decode_document(bytes: &[u8]) -> Result<String> {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => declared_encoding(bytes)?.unwrap_or(UTF_8),
    };

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(CleanerError::Encoding(format!(
            "content is not valid {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>> {
    let mut reader = Reader::from_reader(bytes);
    let Ok(Event::Decl(decl)) = reader.read_event() else {
        return Ok(None);
    };
    let Some(label) = decl.encoding() else {
        return Ok(None);
    };

    let label = label?;
    Encoding::for_label(label.trim_ascii())
        .map(Some)
        .ok_or_else(|| {
            CleanerError::Encoding(format!(
                "unsupported encoding '{}'",
                String::from_utf8_lossy(&label)
            ))
        })
}

/// Parse a GPX XML string into a [`GpxDocument`].
///
/// Only the first `<trkseg>` is decomposed into trackpoints; every other part
/// of the document is kept as markup. A document without any segment parses
/// successfully with `segment == None`.
pub fn parse_gpx(xml: &str) -> Result<GpxDocument> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    let mut doc = GpxDocument::default();
    let mut open = OpenElements::default();

    loop {
        let event = reader.read_event()?.into_owned();
        if let Event::Eof = event {
            open.finish()?;
            return Ok(doc);
        }

        let segment_start = match &event {
            Event::Start(e) | Event::Empty(e) => e.local_name().as_ref() == b"trkseg",
            _ => false,
        };
        let self_closing = matches!(event, Event::Empty(_));
        open.track(&event);
        doc.head.push(event);

        if segment_start {
            if self_closing {
                doc.segment = Some(TrackSegment::default());
            } else {
                doc.segment = Some(parse_segment(&mut reader)?);
                open.close();
            }
            break;
        }
    }

    loop {
        let event = reader.read_event()?.into_owned();
        if let Event::Eof = event {
            break;
        }
        open.track(&event);
        doc.tail.push(event);
    }

    open.finish()?;
    Ok(doc)
}

/// Element nesting outside the first segment, used to reject truncated documents.
#[derive(Default)]
struct OpenElements {
    names: Vec<String>,
    saw_root: bool,
}

impl OpenElements {
    fn track(&mut self, event: &Event<'_>) {
        match event {
            Event::Start(e) => {
                self.saw_root = true;
                self.names
                    .push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Event::Empty(_) => self.saw_root = true,
            Event::End(_) => self.close(),
            _ => {}
        }
    }

    fn close(&mut self) {
        self.names.pop();
    }

    fn finish(&self) -> Result<()> {
        if let Some(name) = self.names.last() {
            return Err(CleanerError::UnexpectedEof(name.clone()));
        }
        if !self.saw_root {
            return Err(CleanerError::NoRootElement);
        }
        Ok(())
    }
}

/// Parse the children of a `<trkseg>`.
/// Called after receiving Event::Start for the segment; consumes its end tag.
fn parse_segment(reader: &mut Reader<&[u8]>) -> Result<TrackSegment> {
    let mut segment = TrackSegment::default();
    // Segment-level markup not yet attached to a point.
    let mut pending: Markup = Vec::new();

    loop {
        match reader.read_event()?.into_owned() {
            Event::Start(e) if e.local_name().as_ref() == b"trkpt" => {
                let mut point = parse_point(e, reader)?;
                point.markup.leading = std::mem::take(&mut pending);
                segment.points.push(point);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"trkpt" => {
                let (lat, lon) = parse_lat_lon(&e)?;
                let mut point = Trackpoint::new(lat, lon, None);
                point.markup.leading = std::mem::take(&mut pending);
                point.markup.element.push(Event::Empty(e));
                segment.points.push(point);
            }
            Event::Start(e) => {
                // Non-point content such as <extensions>, kept as-is
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                pending.push(Event::Start(e));
                copy_subtree(reader, &name, &mut pending)?;
            }
            Event::End(e) => {
                pending.push(Event::End(e));
                segment.closing = pending;
                return Ok(segment);
            }
            Event::Eof => return Err(CleanerError::UnexpectedEof("trkseg".to_string())),
            other => pending.push(other),
        }
    }
}

/// Copy events up to and including the end tag matching an already consumed start tag.
fn copy_subtree(reader: &mut Reader<&[u8]>, name: &str, out: &mut Markup) -> Result<()> {
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?.into_owned();
        let closed = match &event {
            Event::Start(_) => {
                depth += 1;
                false
            }
            Event::End(_) if depth == 0 => true,
            Event::End(_) => {
                depth -= 1;
                false
            }
            Event::Eof => return Err(CleanerError::UnexpectedEof(name.to_string())),
            _ => false,
        };
        out.push(event);
        if closed {
            return Ok(());
        }
    }
}

/// Parse lat/lon attributes from a `<trkpt>` start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate("lat", &attr)?),
            b"lon" => lon = Some(parse_coordinate("lon", &attr)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(CleanerError::MissingAttribute {
        element: "trkpt",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(CleanerError::MissingAttribute {
        element: "trkpt",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

fn parse_coordinate(attribute: &'static str, attr: &Attribute<'_>) -> Result<f64> {
    let invalid = || CleanerError::InvalidCoordinate {
        attribute,
        value: String::from_utf8_lossy(&attr.value).into_owned(),
    };
    let value = attr.unescape_value().map_err(|_| invalid())?;
    value.trim().parse::<f64>().map_err(|_| invalid())
}

/// Character or predefined entity reference, as the character it stands for.
fn resolve_reference(r: &BytesRef<'_>) -> Option<char> {
    if let Ok(Some(ch)) = r.resolve_char_ref() {
        return Some(ch);
    }
    match std::str::from_utf8(r.as_ref()).unwrap_or_default() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Parse a `<trkpt>` element and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point(start: BytesStart<'static>, reader: &mut Reader<&[u8]>) -> Result<Trackpoint> {
    let (lat, lon) = parse_lat_lon(&start)?;
    let mut point = Trackpoint::new(lat, lon, None);
    let markup = &mut point.markup;
    markup.element.push(Event::Start(start));

    let mut depth = 0usize;
    let mut seen_ele = false;
    // First content index and text of the <ele> being read.
    let mut ele: Option<(usize, String)> = None;

    loop {
        let event = reader.read_event()?.into_owned();
        let in_ele = depth == 1 && ele.is_some();
        let closed = match &event {
            Event::Start(e) => {
                if depth == 0 && !seen_ele && e.local_name().as_ref() == b"ele" {
                    seen_ele = true;
                    ele = Some((markup.element.len() + 1, String::new()));
                }
                depth += 1;
                false
            }
            Event::Text(t) if in_ele => {
                if let Some((_, text)) = ele.as_mut() {
                    text.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
                false
            }
            Event::CData(c) if in_ele => {
                if let Some((_, text)) = ele.as_mut() {
                    text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
                false
            }
            Event::GeneralRef(r) if in_ele => {
                let ch = resolve_reference(r).ok_or_else(|| {
                    let name = String::from_utf8_lossy(r.as_ref());
                    CleanerError::InvalidElevation(format!("&{name};"))
                })?;
                if let Some((_, text)) = ele.as_mut() {
                    text.push(ch);
                }
                false
            }
            Event::End(_) if depth == 0 => true,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    if let Some((first, text)) = ele.take() {
                        let text = text.trim();
                        if !text.is_empty() {
                            let value = text
                                .parse::<f64>()
                                .map_err(|_| CleanerError::InvalidElevation(text.to_string()))?;
                            markup.ele_text = Some(first..markup.element.len());
                            markup.source_ele = Some(value);
                        }
                    }
                }
                false
            }
            Event::Eof => return Err(CleanerError::UnexpectedEof("trkpt".to_string())),
            _ => false,
        };
        markup.element.push(event);
        if closed {
            break;
        }
    }

    point.ele = point.markup.source_ele;
    Ok(point)
}
