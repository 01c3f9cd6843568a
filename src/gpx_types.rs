use std::ops::Range;

use quick_xml::events::Event;

/// Owned markup event, kept so untouched parts of a document round-trip verbatim.
pub(crate) type Markup = Vec<Event<'static>>;

/// A parsed GPX document split around its first track segment.
#[derive(Debug, Clone, Default)]
pub struct GpxDocument {
    /// Everything up to and including the first `<trkseg>` start tag.
    pub(crate) head: Markup,
    pub(crate) segment: Option<TrackSegment>,
    /// Everything after the first segment's closing tag.
    pub(crate) tail: Markup,
}

impl GpxDocument {
    pub fn segment(&self) -> Option<&TrackSegment> {
        self.segment.as_ref()
    }

    pub fn segment_mut(&mut self) -> Option<&mut TrackSegment> {
        self.segment.as_mut()
    }

    pub fn has_segment(&self) -> bool {
        self.segment.is_some()
    }

    /// Points of the first segment, empty when there is none.
    pub fn points(&self) -> &[Trackpoint] {
        self.segment.as_ref().map_or(&[], |seg| seg.points.as_slice())
    }
}

/// The first `<trkseg>` of a document.
#[derive(Debug, Clone, Default)]
pub struct TrackSegment {
    pub points: Vec<Trackpoint>,
    /// Segment content after the last point, including `</trkseg>`.
    pub(crate) closing: Markup,
}

/// A single `<trkpt>`.
#[derive(Debug, Clone)]
pub struct Trackpoint {
    pub lat: f64,
    pub lon: f64,
    /// Written back only into an `<ele>` value present in the source markup.
    pub ele: Option<f64>,
    pub(crate) markup: PointMarkup,
}

impl Trackpoint {
    /// Build a point with no source markup; it serializes as a bare
    /// `<trkpt>` with an optional `<ele>` child.
    pub fn new(lat: f64, lon: f64, ele: Option<f64>) -> Self {
        Self {
            lat,
            lon,
            ele,
            markup: PointMarkup::default(),
        }
    }

    /// The (lat, lon, ele) dedup key.
    pub fn key(&self) -> (f64, f64, Option<f64>) {
        (self.lat, self.lon, self.ele)
    }
}

/// Source markup of a trackpoint.
#[derive(Debug, Clone, Default)]
pub(crate) struct PointMarkup {
    /// Whitespace and comments between the previous sibling and this point.
    pub(crate) leading: Markup,
    /// The `<trkpt>` element itself, start tag through end tag.
    pub(crate) element: Markup,
    /// Indices into `element` of the content of `<ele>` (text, CDATA and
    /// references), excluding its start and end tags.
    pub(crate) ele_text: Option<Range<usize>>,
    /// Elevation as parsed from the source.
    pub(crate) source_ele: Option<f64>,
}
