//! Minimal EBML walker that reads the declared duration of a WebM file.
//!
//! Only the path `EBML header -> Segment -> Info -> {TimecodeScale, Duration}`
//! is interpreted; every other element is skipped by size. Recorder output is
//! usually written live and carries no `Duration`, in which case the probe
//! reports `None` instead of guessing from cluster timestamps.

use thiserror::Error;

const ID_EBML: u32 = 0x1A45_DFA3;
const ID_SEGMENT: u32 = 0x1853_8067;
const ID_INFO: u32 = 0x1549_A966;
const ID_TIMECODE_SCALE: u32 = 0x2A_D7B1;
const ID_DURATION: u32 = 0x4489;

/// Default `TimecodeScale` in nanoseconds per tick.
pub const DEFAULT_TIMECODE_SCALE_NS: u64 = 1_000_000;

/// Returns the declared duration in seconds, or `None` when the segment info
/// carries no `Duration` element.
///
/// # Errors
/// Returns [`WebmError::NotEbml`] when the buffer does not start with an EBML
/// header, [`WebmError::Truncated`] when a needed element runs past the end of
/// the buffer and [`WebmError::Malformed`] for invalid variable-length
/// integers or field widths.
pub fn probe_duration_secs(bytes: &[u8]) -> Result<Option<f64>, WebmError> {
    let mut reader = Reader::new(bytes);

    let header = reader.element_header()?;
    if header.id != ID_EBML {
        return Err(WebmError::NotEbml);
    }
    let header_size = header
        .size
        .ok_or_else(|| WebmError::Malformed("EBML header must have a known size".to_string()))?;
    reader.skip(header_size)?;

    while !reader.is_at_end() {
        let element = reader.element_header()?;
        if element.id != ID_SEGMENT {
            match element.size {
                Some(size) => reader.skip(size)?,
                None => return Ok(None),
            }
            continue;
        }

        let segment_end = match element.size {
            Some(size) => reader.bounded_end(size),
            None => bytes.len(),
        };
        return probe_segment(&mut reader, segment_end);
    }

    Ok(None)
}

fn probe_segment(reader: &mut Reader<'_>, end: usize) -> Result<Option<f64>, WebmError> {
    while reader.pos < end {
        let child = reader.element_header()?;
        let Some(size) = child.size else {
            // Unknown-size children (live clusters) cannot be skipped.
            return Ok(None);
        };

        if child.id == ID_INFO {
            let payload = reader.take(size)?;
            return probe_info(payload);
        }

        if reader.remaining() < size {
            return Ok(None);
        }
        reader.skip(size)?;
    }

    Ok(None)
}

fn probe_info(payload: &[u8]) -> Result<Option<f64>, WebmError> {
    let mut reader = Reader::new(payload);
    let mut scale_ns = DEFAULT_TIMECODE_SCALE_NS;
    let mut ticks = None;

    while !reader.is_at_end() {
        let field = reader.element_header()?;
        let size = field.size.ok_or_else(|| {
            WebmError::Malformed("info children must have a known size".to_string())
        })?;
        let data = reader.take(size)?;

        match field.id {
            ID_TIMECODE_SCALE => scale_ns = read_uint(data)?,
            ID_DURATION => ticks = Some(read_float(data)?),
            _ => {}
        }
    }

    Ok(ticks.map(|ticks| ticks * scale_ns as f64 / 1_000_000_000.0))
}

fn read_uint(data: &[u8]) -> Result<u64, WebmError> {
    if data.is_empty() || data.len() > 8 {
        return Err(WebmError::Malformed(format!(
            "unsigned integer width {} is out of range",
            data.len()
        )));
    }
    Ok(data
        .iter()
        .fold(0_u64, |value, byte| (value << 8) | u64::from(*byte)))
}

fn read_float(data: &[u8]) -> Result<f64, WebmError> {
    match data.len() {
        4 => {
            let mut raw = [0_u8; 4];
            raw.copy_from_slice(data);
            Ok(f64::from(f32::from_be_bytes(raw)))
        }
        8 => {
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(data);
            Ok(f64::from_be_bytes(raw))
        }
        other => Err(WebmError::Malformed(format!("float width {other} is invalid"))),
    }
}

struct ElementHeader {
    id: u32,
    /// `None` encodes the EBML "unknown size" marker.
    size: Option<u64>,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn remaining(&self) -> u64 {
        (self.buf.len() - self.pos) as u64
    }

    fn bounded_end(&self, size: u64) -> usize {
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        self.pos.saturating_add(size).min(self.buf.len())
    }

    fn byte(&mut self) -> Result<u8, WebmError> {
        let byte = *self.buf.get(self.pos).ok_or(WebmError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, size: u64) -> Result<&'a [u8], WebmError> {
        if size > self.remaining() {
            return Err(WebmError::Truncated);
        }
        let start = self.pos;
        self.pos += size as usize;
        Ok(&self.buf[start..self.pos])
    }

    fn skip(&mut self, size: u64) -> Result<(), WebmError> {
        self.take(size).map(|_| ())
    }

    fn element_header(&mut self) -> Result<ElementHeader, WebmError> {
        let id = self.element_id()?;
        let size = self.element_size()?;
        Ok(ElementHeader { id, size })
    }

    /// Element ids keep their length marker bits.
    fn element_id(&mut self) -> Result<u32, WebmError> {
        let first = self.byte()?;
        let width = first.leading_zeros() as usize + 1;
        if width > 4 {
            return Err(WebmError::Malformed(format!(
                "element id width {width} exceeds 4 bytes"
            )));
        }

        let mut id = u32::from(first);
        for _ in 1..width {
            id = (id << 8) | u32::from(self.byte()?);
        }
        Ok(id)
    }

    fn element_size(&mut self) -> Result<Option<u64>, WebmError> {
        let first = self.byte()?;
        let width = first.leading_zeros() as usize + 1;
        if width > 8 {
            return Err(WebmError::Malformed("element size has no length marker".to_string()));
        }

        let mut value = u64::from(first) & (0xFF_u64 >> width);
        for _ in 1..width {
            value = (value << 8) | u64::from(self.byte()?);
        }

        let unknown = (1_u64 << (7 * width)) - 1;
        if value == unknown {
            return Ok(None);
        }
        Ok(Some(value))
    }
}

/// WebM probe errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebmError {
    /// Buffer does not start with an EBML header.
    #[error("not an EBML document")]
    NotEbml,
    /// A required element extends past the end of the buffer.
    #[error("document is truncated")]
    Truncated,
    /// Structural violation in the element stream.
    #[error("malformed element: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for duration probing over hand-built EBML documents.

    use super::*;

    fn element(id: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        if payload.len() < 0x7F {
            out.push(0x80 | payload.len() as u8);
        } else {
            out.push(0x01);
            out.extend_from_slice(&(payload.len() as u64).to_be_bytes()[1..]);
        }
        out.extend_from_slice(payload);
        out
    }

    fn header() -> Vec<u8> {
        element(&[0x1A, 0x45, 0xDF, 0xA3], &element(&[0x42, 0x82], b"webm"))
    }

    fn document(info_children: &[u8]) -> Vec<u8> {
        let info = element(&[0x15, 0x49, 0xA9, 0x66], info_children);
        let tracks = element(&[0x16, 0x54, 0xAE, 0x6B], &[0; 4]);
        let mut body = tracks;
        body.extend(info);
        let mut out = header();
        out.extend(element(&[0x18, 0x53, 0x80, 0x67], &body));
        out
    }

    #[test]
    fn reads_f64_duration_with_default_scale() {
        let bytes = document(&element(&[0x44, 0x89], &33_000.0_f64.to_be_bytes()));
        assert_eq!(probe_duration_secs(&bytes).unwrap(), Some(33.0));
    }

    #[test]
    fn applies_custom_timecode_scale_to_f32_duration() {
        let mut info = element(&[0x2A, 0xD7, 0xB1], &[0x3B, 0x9A, 0xCA, 0x00]);
        info.extend(element(&[0x44, 0x89], &30.5_f32.to_be_bytes()));
        let bytes = document(&info);
        assert_eq!(probe_duration_secs(&bytes).unwrap(), Some(30.5));
    }

    #[test]
    fn live_recording_without_duration_reports_none() {
        let bytes = document(&element(&[0x2A, 0xD7, 0xB1], &[0x0F, 0x42, 0x40]));
        assert_eq!(probe_duration_secs(&bytes).unwrap(), None);
    }

    #[test]
    fn unknown_size_cluster_before_info_reports_none() {
        let mut out = header();
        out.extend_from_slice(&[0x18, 0x53, 0x80, 0x67, 0xFF]);
        out.extend_from_slice(&[0x1F, 0x43, 0xB6, 0x75, 0xFF, 0xA3, 0x81, 0x00]);
        assert_eq!(probe_duration_secs(&out).unwrap(), None);
    }

    #[test]
    fn rejects_non_ebml_input() {
        assert_eq!(probe_duration_secs(b"RIFF0000AVI "), Err(WebmError::NotEbml));
    }

    #[test]
    fn truncated_info_is_an_error() {
        let mut bytes = document(&element(&[0x44, 0x89], &33_000.0_f64.to_be_bytes()));
        bytes.truncate(bytes.len() - 3);
        assert!(probe_duration_secs(&bytes).is_err());
    }
}
