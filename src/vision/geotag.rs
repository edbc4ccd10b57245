/// Best-effort geotag lookup from EXIF metadata
///
/// Any failure (unreadable file, no EXIF block, no GPS tags) yields the
/// not-available sentinel; this never errors.

use exif::{Exif, In, Rational, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::settings::GeoTagMode;

/// Sentinel reported when no location is known
pub const GEO_NOT_AVAILABLE: &str = "N/A";

/// Fixed coordinate reported in placeholder mode
pub const PLACEHOLDER_COORDINATES: &str = "34.05° N, 118.24° W";

/// Read the location string for a photo
pub fn read_geotag(path: &Path, mode: GeoTagMode) -> String {
    let Some(exif) = read_exif(path) else {
        return GEO_NOT_AVAILABLE.to_string();
    };

    match mode {
        GeoTagMode::Placeholder => {
            if exif.fields().next().is_some() {
                PLACEHOLDER_COORDINATES.to_string()
            } else {
                GEO_NOT_AVAILABLE.to_string()
            }
        }
        GeoTagMode::Decode => match decode_gps(&exif) {
            Some((lat, lon)) => format_coordinates(lat, lon),
            None => GEO_NOT_AVAILABLE.to_string(),
        },
    }
}

fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Some(exif),
        Err(e) => {
            tracing::debug!("No EXIF in {}: {}", path.display(), e);
            None
        }
    }
}

/// Signed decimal latitude/longitude from the GPS IFD
pub fn decode_gps(exif: &Exif) -> Option<(f64, f64)> {
    let lat = rational_triplet(exif, Tag::GPSLatitude)?;
    let lon = rational_triplet(exif, Tag::GPSLongitude)?;
    let lat_ref = ascii_ref(exif, Tag::GPSLatitudeRef).unwrap_or(b'N');
    let lon_ref = ascii_ref(exif, Tag::GPSLongitudeRef).unwrap_or(b'E');

    let mut latitude = dms_to_degrees(&lat)?;
    let mut longitude = dms_to_degrees(&lon)?;
    if lat_ref.eq_ignore_ascii_case(&b'S') {
        latitude = -latitude;
    }
    if lon_ref.eq_ignore_ascii_case(&b'W') {
        longitude = -longitude;
    }

    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return None;
    }
    Some((latitude, longitude))
}

fn rational_triplet(exif: &Exif, tag: Tag) -> Option<Vec<Rational>> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) if !values.is_empty() => Some(values.clone()),
        _ => None,
    }
}

fn ascii_ref(exif: &Exif, tag: Tag) -> Option<u8> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(strings) => strings.first()?.first().copied(),
        _ => None,
    }
}

/// Degrees, minutes, seconds to decimal degrees; missing parts count as 0
pub fn dms_to_degrees(parts: &[Rational]) -> Option<f64> {
    let mut degrees = 0.0;
    for (part, scale) in parts.iter().zip([1.0, 60.0, 3600.0]) {
        if part.denom == 0 {
            return None;
        }
        degrees += part.to_f64() / scale;
    }
    degrees.is_finite().then_some(degrees)
}

/// `"34.05° N, 118.24° W"` style formatting
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    let ns = if latitude < 0.0 { 'S' } else { 'N' };
    let ew = if longitude < 0.0 { 'W' } else { 'E' };
    format!("{:.2}° {}, {:.2}° {}", latitude.abs(), ns, longitude.abs(), ew)
}
