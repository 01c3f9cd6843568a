use std::path::Path;

use crate::options::CleanOptions;
use crate::writer::format_number;

/// English ordinal of `n`: 1st, 2nd, 3rd, 4th, 11th, 21st, 112th, ...
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Suffix inserted between the file stem and `.gpx`, e.g.
/// `.cleaned_every3rdDiffTrkpt_elevatedBy20m`.
pub fn output_suffix(opts: &CleanOptions) -> String {
    let mut suffix = String::from(".cleaned");
    if !opts.stride.is_identity() {
        suffix.push_str(&format!("_every{}DiffTrkpt", ordinal(opts.stride.get())));
    }
    if opts.shifts_elevation() {
        suffix.push_str(&format!(
            "_elevatedBy{}m",
            format_number(opts.elevation_offset)
        ));
    }
    suffix
}

/// Output file name for `input`, or `None` when it has no usable stem.
pub fn output_file_name(input: &Path, opts: &CleanOptions) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    Some(format!("{stem}{}.gpx", output_suffix(opts)))
}
