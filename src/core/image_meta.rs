// src/core/image_meta.rs

use crate::core::models::TagValue;
use crate::error::DecodeError;
use exif::{Context, In, Reader, Value};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::debug;

/// Image capability: sniff the format and read embedded tag metadata.
pub trait ImageDecoder: Send + Sync {
    /// Returns the primary image's IFD0 tags keyed by tag number. Sub-IFDs
    /// (Exif, GPS, Interop) reuse tag numbers and are left out. An image
    /// without metadata yields an empty map.
    fn read_metadata(&self, bytes: &[u8]) -> Result<BTreeMap<u16, TagValue>, DecodeError>;
}

/// [`ImageDecoder`] that recognizes formats with `image` and reads EXIF with `kamadak-exif`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifDecoder;

impl ImageDecoder for ExifDecoder {
    fn read_metadata(&self, bytes: &[u8]) -> Result<BTreeMap<u16, TagValue>, DecodeError> {
        let format = image::guess_format(bytes).map_err(|_| DecodeError::UnrecognizedFormat)?;
        debug!(?format, bytes = bytes.len(), "Recognized image format.");

        let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(BTreeMap::new()),
            Err(e) => return Err(DecodeError::Metadata(e.to_string())),
        };

        let tags = exif
            .fields()
            .filter(|field| field.ifd_num == In::PRIMARY && field.tag.context() == Context::Tiff)
            .map(|field| {
                let value = tag_value(&field.value)
                    .unwrap_or_else(|| TagValue::Text(field.display_value().to_string()));
                (field.tag.number(), value)
            })
            .collect();
        Ok(tags)
    }
}

/// Converts single-valued numeric fields, text and opaque bytes. Anything else
/// falls back to the library's display form.
fn tag_value(value: &Value) -> Option<TagValue> {
    match value {
        Value::Byte(bytes) | Value::Undefined(bytes, _) => Some(TagValue::Bytes(bytes.clone())),
        Value::Ascii(parts) => {
            let text = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            Some(TagValue::Text(text))
        }
        Value::Short(v) if v.len() == 1 => Some(TagValue::Int(i64::from(v[0]))),
        Value::Long(v) if v.len() == 1 => Some(TagValue::Int(i64::from(v[0]))),
        Value::SShort(v) if v.len() == 1 => Some(TagValue::Int(i64::from(v[0]))),
        Value::SLong(v) if v.len() == 1 => Some(TagValue::Int(i64::from(v[0]))),
        Value::Rational(v) if v.len() == 1 => Some(TagValue::Float(v[0].to_f64())),
        Value::SRational(v) if v.len() == 1 => Some(TagValue::Float(v[0].to_f64())),
        Value::Float(v) if v.len() == 1 => Some(TagValue::Float(f64::from(v[0]))),
        Value::Double(v) if v.len() == 1 => Some(TagValue::Float(v[0])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1x1 PNG without any metadata chunk.
    const PLAIN_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00,
        0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01,
        0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// JPEG whose APP1 segment holds a big-endian TIFF block: IFD0 with Make
    /// "Canon" and Orientation 1, plus a GPS IFD carrying GPSLatitudeRef (tag 1).
    const EXIF_JPEG: &[u8] = &[
        0xFF, 0xD8, // SOI
        0xFF, 0xE1, 0x00, 0x52, b'E', b'x', b'i', b'f', 0x00, 0x00, // APP1
        0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08, // TIFF header
        0x00, 0x03, // IFD0
        0x01, 0x0F, 0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x32, // Make
        0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, // Orientation
        0x88, 0x25, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x38, // GPS IFD pointer
        0x00, 0x00, 0x00, 0x00, //
        b'C', b'a', b'n', b'o', b'n', 0x00, //
        0x00, 0x01, // GPS IFD
        0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, b'N', 0x00, 0x00, 0x00, // GPSLatitudeRef
        0x00, 0x00, 0x00, 0x00, //
        0xFF, 0xD9, // EOI
    ];

    #[test]
    fn reads_ifd0_tags_from_jpeg() {
        let tags = ExifDecoder.read_metadata(EXIF_JPEG).expect("decodes");
        assert_eq!(
            tags,
            BTreeMap::from([(0x010F, TagValue::Text("Canon".into())), (0x0112, TagValue::Int(1))])
        );
    }

    #[test]
    fn unknown_bytes_are_unrecognized() {
        let err = ExifDecoder.read_metadata(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DecodeError::UnrecognizedFormat));
    }

    #[test]
    fn image_without_exif_yields_empty_map() {
        let tags = ExifDecoder.read_metadata(PLAIN_PNG).expect("decodes");
        assert!(tags.is_empty());
    }

    #[test]
    fn converts_scalar_and_opaque_values() {
        assert_eq!(tag_value(&Value::Short(vec![2])), Some(TagValue::Int(2)));
        assert_eq!(tag_value(&Value::Undefined(b"abc".to_vec(), 0)), Some(TagValue::Bytes(b"abc".to_vec())));
        assert_eq!(tag_value(&Value::Ascii(vec![b"Canon".to_vec()])), Some(TagValue::Text("Canon".into())));
        assert_eq!(tag_value(&Value::Short(vec![1, 2])), None);
    }
}
