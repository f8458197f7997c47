//! Embedded capture-date extraction for camera media.
//!
//! Two sources are consulted in order: the EXIF date/time tags, then the
//! IPTC `DateCreated` dataset carried in the JPEG APP13 (Photoshop 8BIM)
//! segment. Each source has a fixed, typed table of accepted tags and
//! parsers; there is no dynamic tag lookup.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Tag};

type DateParser = fn(&str) -> Option<NaiveDate>;

/// EXIF tags checked in order; the first parseable value wins.
const EXIF_DATE_TAGS: &[(Tag, DateParser)] = &[
    (Tag::DateTimeOriginal, parse_exif_datetime),
    (Tag::DateTimeDigitized, parse_exif_datetime),
    (Tag::DateTime, parse_exif_datetime),
];

/// Extensions whose containers can carry embedded capture metadata.
const METADATA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "png", "bmp"];

/// JPEG APP13 marker, where Photoshop stores IPTC data.
const MARKER_APP13: u8 = 0xED;
/// Photoshop image-resource id of the embedded IPTC block.
const RESOURCE_IPTC: u16 = 0x0404;

/// Returns `true` if the file's extension may carry embedded metadata.
pub fn supports_embedded_metadata(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            METADATA_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Attempts to read the capture date embedded in a media file.
///
/// Any read or parse failure yields `None`; the caller falls back to
/// filesystem timestamps.
pub fn capture_date(path: &Path) -> Option<NaiveDate> {
    if let Some(date) = exif_date(path) {
        return Some(date);
    }
    iptc_date(path)
}

fn exif_date(path: &Path) -> Option<NaiveDate> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(&file);
    let exif_data = exif::Reader::new().read_from_container(&mut reader).ok()?;

    for (tag, parser) in EXIF_DATE_TAGS {
        let Some(field) = exif_data.get_field(*tag, In::PRIMARY) else {
            continue;
        };
        let exif::Value::Ascii(ref values) = field.value else {
            continue;
        };
        let Some(bytes) = values.first() else {
            continue;
        };
        let raw = String::from_utf8_lossy(bytes);
        if let Some(date) = parser(raw.trim_matches(char::from(0)).trim()) {
            return Some(date);
        }
    }
    None
}

/// IPTC lives in the JPEG APP13 segment only; other containers skip
/// straight to the filesystem fallback.
fn iptc_date(path: &Path) -> Option<NaiveDate> {
    let ext = path.extension().and_then(|e| e.to_str())?.to_lowercase();
    if ext != "jpg" && ext != "jpeg" {
        return None;
    }

    let file = File::open(path).ok()?;
    let raw = find_iptc_date_created(BufReader::new(file))?;
    parse_iptc_date(raw.trim())
}

/// Walks the JPEG segment stream up to start-of-scan and pulls the IPTC
/// `DateCreated` (record 2, dataset 55) string out of the first APP13
/// Photoshop block, if any.
fn find_iptc_date_created<R: Read>(mut reader: R) -> Option<String> {
    let mut soi = [0u8; 2];
    reader.read_exact(&mut soi).ok()?;
    if soi != [0xFF, 0xD8] {
        return None;
    }

    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).ok()?;
        if byte[0] != 0xFF {
            return None;
        }
        // Skip fill bytes between segments.
        let mut marker = 0xFF;
        while marker == 0xFF {
            reader.read_exact(&mut byte).ok()?;
            marker = byte[0];
        }

        match marker {
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD9 => continue,
            // Start of scan: entropy-coded data follows, no more metadata.
            0xDA => return None,
            _ => {}
        }

        let mut len = [0u8; 2];
        reader.read_exact(&mut len).ok()?;
        let length = u16::from_be_bytes(len) as usize;
        if length < 2 {
            return None;
        }
        let mut payload = vec![0u8; length - 2];
        reader.read_exact(&mut payload).ok()?;

        if marker == MARKER_APP13 {
            if let Some(date) = iptc_date_from_app13(&payload) {
                return Some(date);
            }
        }
    }
}

fn iptc_date_from_app13(payload: &[u8]) -> Option<String> {
    let body = payload.strip_prefix(b"Photoshop 3.0\0")?;

    let mut cursor = 0;
    while cursor + 12 <= body.len() {
        if &body[cursor..cursor + 4] != b"8BIM" {
            return None;
        }
        let resource_id = u16::from_be_bytes([body[cursor + 4], body[cursor + 5]]);
        cursor += 6;

        // Pascal name, padded so the field occupies an even byte count.
        let name_len = *body.get(cursor)? as usize;
        let mut name_field = 1 + name_len;
        if name_field % 2 != 0 {
            name_field += 1;
        }
        cursor += name_field;

        let size_bytes = body.get(cursor..cursor + 4)?;
        let size = u32::from_be_bytes(size_bytes.try_into().ok()?) as usize;
        cursor += 4;

        let data = body.get(cursor..cursor + size)?;
        if resource_id == RESOURCE_IPTC {
            return iptc_dataset(data, 2, 55);
        }
        cursor += size + size % 2;
    }
    None
}

/// Scans raw IPTC data for one `record:dataset` entry.
fn iptc_dataset(data: &[u8], record: u8, dataset: u8) -> Option<String> {
    let mut cursor = 0;
    while cursor + 5 <= data.len() {
        if data[cursor] != 0x1C {
            return None;
        }
        let entry_record = data[cursor + 1];
        let entry_dataset = data[cursor + 2];
        let len = u16::from_be_bytes([data[cursor + 3], data[cursor + 4]]) as usize;
        cursor += 5;

        let value = data.get(cursor..cursor + len)?;
        if entry_record == record && entry_dataset == dataset {
            return Some(String::from_utf8_lossy(value).into_owned());
        }
        cursor += len;
    }
    None
}

/// EXIF date strings: `YYYY:MM:DD HH:MM:SS` or bare `YYYY:MM:DD`.
fn parse_exif_datetime(value: &str) -> Option<NaiveDate> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S") {
        return Some(datetime.date());
    }
    NaiveDate::parse_from_str(value, "%Y:%m:%d").ok()
}

/// IPTC `DateCreated` strings: `YYYYMMDD` or `YYYY-MM-DD`.
fn parse_iptc_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    for format in ["%Y%m%d", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    None
}
