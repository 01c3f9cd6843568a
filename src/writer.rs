use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{CleanerError, Result};
use crate::gpx_types::*;

/// Serialize a document back to GPX.
///
/// Output always starts with a UTF-8 XML declaration. All source markup is
/// written verbatim except the text of `<ele>` elements whose value changed.
pub fn write_gpx(doc: &GpxDocument) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    if !doc.head.iter().any(|e| matches!(e, Event::Decl(_))) {
        writer.write_event(Event::Decl(utf8_decl()))?;
        writer.write_event(Event::Text(BytesText::new("\n")))?;
    }

    write_markup(&mut writer, &doc.head)?;
    if let Some(segment) = &doc.segment {
        for point in &segment.points {
            write_point(&mut writer, point)?;
        }
        write_markup(&mut writer, &segment.closing)?;
    }
    write_markup(&mut writer, &doc.tail)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| CleanerError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Shortest round-trip rendering of a number, e.g. `120` or `-5.5`.
pub(crate) fn format_number(value: f64) -> String {
    format!("{value}")
}

fn utf8_decl() -> BytesDecl<'static> {
    BytesDecl::new("1.0", Some("UTF-8"), None)
}

fn write_markup(writer: &mut Writer<Vec<u8>>, markup: &[Event<'static>]) -> Result<()> {
    for event in markup {
        match event {
            Event::Decl(_) => writer.write_event(Event::Decl(utf8_decl()))?,
            other => writer.write_event(other.clone())?,
        }
    }
    Ok(())
}

fn write_point(writer: &mut Writer<Vec<u8>>, point: &Trackpoint) -> Result<()> {
    let markup = &point.markup;
    write_markup(writer, &markup.leading)?;

    if markup.element.is_empty() {
        return write_bare_point(writer, point);
    }

    let changed_ele = match (&markup.ele_text, point.ele) {
        (Some(range), Some(ele)) if point.ele != markup.source_ele => Some((range.clone(), ele)),
        _ => None,
    };

    for (i, event) in markup.element.iter().enumerate() {
        match &changed_ele {
            // The whole <ele> content becomes one text event.
            Some((range, ele)) if range.contains(&i) => {
                if i == range.start {
                    writer.write_event(Event::Text(BytesText::new(&format_number(*ele))))?;
                }
            }
            _ => writer.write_event(event.clone())?,
        }
    }
    Ok(())
}

fn write_bare_point(writer: &mut Writer<Vec<u8>>, point: &Trackpoint) -> Result<()> {
    let lat = format_number(point.lat);
    let lon = format_number(point.lon);
    let start =
        BytesStart::new("trkpt").with_attributes([("lat", lat.as_str()), ("lon", lon.as_str())]);

    writer.write_event(Event::Start(start))?;
    if let Some(ele) = point.ele {
        writer.write_event(Event::Start(BytesStart::new("ele")))?;
        writer.write_event(Event::Text(BytesText::new(&format_number(ele))))?;
        writer.write_event(Event::End(BytesEnd::new("ele")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("trkpt")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{CleanOptions, Stride};
    use crate::parser::parse_gpx;
    use crate::pipeline::clean_document;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">
  <trk>
    <name>Walk</name>
    <trkseg>
      <trkpt lat="1" lon="1"><ele>10</ele></trkpt>
      <trkpt lat="1" lon="1"><ele>10</ele></trkpt>
      <!-- pause -->
      <trkpt lat="2" lon="2"><ele>20</ele><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="3" lon="3"><time>2025-01-01T00:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn test_unchanged_document_round_trips() {
        let doc = parse_gpx(TRACK).unwrap();
        assert_eq!(write_gpx(&doc).unwrap(), TRACK);
    }

    #[test]
    fn test_dedup_and_shift_output() {
        let opts = CleanOptions {
            elevation_offset: 20.0,
            ..Default::default()
        };
        let (doc, _) = clean_document(parse_gpx(TRACK).unwrap(), &opts);
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1" creator="test">
  <trk>
    <name>Walk</name>
    <trkseg>
      <trkpt lat="1" lon="1"><ele>30</ele></trkpt>
      <!-- pause -->
      <trkpt lat="2" lon="2"><ele>40</ele><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="3" lon="3"><time>2025-01-01T00:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;
        assert_eq!(write_gpx(&doc).unwrap(), expected);
    }

    #[test]
    fn test_stride_output() {
        let opts = CleanOptions {
            stride: Stride::new(2).unwrap(),
            ..Default::default()
        };
        let (doc, _) = clean_document(parse_gpx(TRACK).unwrap(), &opts);
        let out = write_gpx(&doc).unwrap();
        assert!(out.contains(r#"<trkpt lat="1" lon="1"><ele>10</ele></trkpt>"#));
        assert!(out.contains(r#"<trkpt lat="3" lon="3">"#));
        assert!(!out.contains(r#"lat="2""#));
    }

    #[test]
    fn test_declaration_inserted() {
        let doc = parse_gpx("<gpx><trk><trkseg/></trk></gpx>").unwrap();
        assert_eq!(
            write_gpx(&doc).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx><trk><trkseg/></trk></gpx>"
        );
    }

    #[test]
    fn test_declaration_normalized() {
        let doc = parse_gpx("<?xml version='1.0'?>\n<gpx/>").unwrap();
        assert_eq!(
            write_gpx(&doc).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx/>"
        );
    }

    #[test]
    fn test_empty_segment_kept() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx><trk><trkseg>\n  </trkseg></trk></gpx>";
        let opts = CleanOptions {
            stride: Stride::new(3).unwrap(),
            ..Default::default()
        };
        let (doc, _) = clean_document(parse_gpx(xml).unwrap(), &opts);
        assert_eq!(write_gpx(&doc).unwrap(), xml);
    }

    #[test]
    fn test_bare_point() {
        let mut doc = parse_gpx("<gpx><trk><trkseg></trkseg></trk></gpx>").unwrap();
        let segment = doc.segment_mut().unwrap();
        segment.points.push(Trackpoint::new(47.5, 8.25, Some(410.0)));
        segment.points.push(Trackpoint::new(47.6, 8.3, None));
        let out = write_gpx(&doc).unwrap();
        assert!(out.contains(
            r#"<trkseg><trkpt lat="47.5" lon="8.25"><ele>410</ele></trkpt><trkpt lat="47.6" lon="8.3"></trkpt></trkseg>"#
        ));
    }

    #[test]
    fn test_shift_replaces_whole_elevation_content() {
        let xml = r#"<gpx><trk><trkseg>
<trkpt lat="1" lon="1"><ele>1&#48;0</ele><time>t1</time></trkpt>
<trkpt lat="2" lon="2"><ele><![CDATA[100]]></ele></trkpt>
</trkseg></trk></gpx>"#;
        let opts = CleanOptions {
            elevation_offset: 20.0,
            ..Default::default()
        };
        let (doc, stats) = clean_document(parse_gpx(xml).unwrap(), &opts);
        assert_eq!(stats.elevations_shifted, 2);

        let out = write_gpx(&doc).unwrap();
        assert!(out.contains(r#"<trkpt lat="1" lon="1"><ele>120</ele><time>t1</time></trkpt>"#));
        assert!(out.contains(r#"<trkpt lat="2" lon="2"><ele>120</ele></trkpt>"#));
    }

    #[test]
    fn test_unshifted_references_kept_verbatim() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx><trk><trkseg><trkpt lat=\"4&#55;\" lon=\"1\"><ele>1&#48;0</ele></trkpt></trkseg></trk></gpx>";
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(write_gpx(&doc).unwrap(), xml);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(120.0), "120");
        assert_eq!(format_number(-5.5), "-5.5");
        assert_eq!(format_number(0.1), "0.1");
    }
}
