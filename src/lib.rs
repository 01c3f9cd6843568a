//! Cleans GPS tracks stored as GPX.
//!
//! The first track segment of a document goes through a fixed pipeline:
//! consecutive duplicate trackpoints are removed, the track is optionally
//! decimated to every Nth point (followed by another duplicate pass) and an
//! optional constant offset is added to every elevation. Everything else in
//! the document is written back verbatim.
//!
//! [`clean_gpx`] handles a single document, [`batch::run`] a directory, and
//! the `cleanGpx*` functions expose the pipeline to JavaScript.

pub mod batch;
pub mod error;
pub mod gpx_types;
pub mod logging;
pub mod naming;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod writer;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use crate::error::{CleanerError, Result};
pub use crate::gpx_types::{GpxDocument, TrackSegment, Trackpoint};
pub use crate::options::{AbsentElevation, CleanOptions, Stride};
pub use crate::pipeline::CleanStats;

/// Parse, clean and re-serialize one GPX document.
pub fn clean_gpx(xml: &str, opts: &CleanOptions) -> Result<(String, CleanStats)> {
    opts.validate()?;
    let doc = parser::parse_gpx(xml)?;
    let (doc, stats) = pipeline::clean_document(doc, opts);
    Ok((writer::write_gpx(&doc)?, stats))
}

/// Cleaned document together with its point counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanReport {
    pub gpx: String,
    pub stats: CleanStats,
}

/// Clean a GPX string, returning the cleaned GPX string.
#[wasm_bindgen(js_name = cleanGpx)]
pub fn clean_gpx_js(gpx_string: &str, options: JsValue) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let (gpx, _) = clean_gpx(gpx_string, &opts)?;
    Ok(gpx)
}

/// Clean a GPX string, returned as a JS object `{ gpx, stats }`.
#[wasm_bindgen(js_name = cleanGpxReport)]
pub fn clean_gpx_report(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let report = build_report(gpx_string, options)?;
    serde_wasm_bindgen::to_value(&report).map_err(|e| js_error(&e.to_string()))
}

/// Clean a GPX string, returned as the JSON text of `{ gpx, stats }`.
#[wasm_bindgen(js_name = cleanGpxReportString)]
pub fn clean_gpx_report_string(
    gpx_string: &str,
    options: JsValue,
) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let report = build_report(gpx_string, options)?;
    serde_json::to_string(&report).map_err(|e| js_error(&e.to_string()))
}

fn build_report(gpx_string: &str, options: JsValue) -> std::result::Result<CleanReport, JsValue> {
    let opts = parse_options(options)?;
    let (gpx, stats) = clean_gpx(gpx_string, &opts)?;
    Ok(CleanReport { gpx, stats })
}

fn parse_options(options: JsValue) -> std::result::Result<CleanOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(CleanOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| js_error(&e.to_string()))
    }
}

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}
