//! Removal of `<sheetProtection>` from worksheet parts

use crate::error::{Result, UnprotectError};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesDecl, Event};
use quick_xml::name::{LocalName, Namespace, ResolveResult};
use quick_xml::reader::{NsReader, Reader};
use quick_xml::Writer;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// SpreadsheetML main namespace
pub const SPREADSHEETML_NS: &[u8] = b"http://schemas.openxmlformats.org/spreadsheetml/2006/main";

const PROTECTION_TAG: &[u8] = b"sheetProtection";

/// Result of stripping one sheet part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripOutcome {
    /// Whether a protection element was found and removed
    pub removed: bool,
}

/// Strip sheet protection from the XML part at `sheet_part`, rewriting it in place.
///
/// Parts in other encodings are transcoded, so the part is always written back
/// as UTF-8 with a matching declaration. Running this on an
/// already stripped part leaves its content unchanged and reports `removed = false`.
pub fn strip(sheet_part: &Path) -> Result<StripOutcome> {
    let content = fs::read(sheet_part).map_err(|e| UnprotectError::io(sheet_part, e))?;
    let (xml, outcome) = strip_protection(&content, sheet_part)?;
    fs::write(sheet_part, xml).map_err(|e| UnprotectError::io(sheet_part, e))?;

    if outcome.removed {
        log::debug!("Removed sheet protection from {}", sheet_part.display());
    }
    Ok(outcome)
}

/// In-memory variant of [`strip`]; `origin` is only used for error messages
pub fn strip_protection(xml: &[u8], origin: &Path) -> Result<(Vec<u8>, StripOutcome)> {
    let decoded = to_utf8(xml, origin)?;
    let body: &[u8] = &decoded;
    let mut reader = NsReader::from_reader(body);
    reader.config_mut().check_end_names = true;

    let mut out = Output::new(body.len());
    let mut buf = Vec::new();
    let mut outcome = StripOutcome::default();
    let mut first_event = true;
    let mut saw_root = false;
    // Open elements in the source document
    let mut depth = 0usize;
    // Open elements inside a protection element being dropped
    let mut skip_depth = 0usize;

    loop {
        let (ns, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(pair) => pair,
            Err(e) => return Err(malformed(origin, e)),
        };

        if first_event {
            first_event = false;
            if !matches!(event, Event::Decl(_)) {
                out.declaration(None)?;
                out.raw(b"\n");
            }
        }

        match event {
            Event::Eof => break,
            Event::Decl(decl) => out.declaration(Some(&decl))?,
            Event::Start(e) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                } else if depth > 0 && is_protection(&ns, e.local_name()) {
                    skip_depth = 1;
                    outcome.removed = true;
                    out.discard_whitespace();
                } else {
                    out.write(Event::Start(e))?;
                }
                depth += 1;
                saw_root = true;
            }
            Event::End(e) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed(origin, "closing tag without an open element"))?;
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else {
                    out.write(Event::End(e))?;
                }
            }
            Event::Empty(e) => {
                if skip_depth > 0 {
                    // inside a dropped element
                } else if depth > 0 && is_protection(&ns, e.local_name()) {
                    outcome.removed = true;
                    out.discard_whitespace();
                } else {
                    out.write(Event::Empty(e))?;
                }
                saw_root = true;
            }
            Event::Text(t) if skip_depth == 0 && t.iter().all(u8::is_ascii_whitespace) => {
                out.hold_whitespace(&t);
            }
            other => {
                if skip_depth == 0 {
                    out.write(other)?;
                }
            }
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(malformed(origin, "unexpected end of document"));
    }
    if !saw_root {
        return Err(malformed(origin, "no root element"));
    }

    Ok((out.finish(), outcome))
}

/// Decode `xml` to UTF-8 without its byte order mark.
///
/// The encoding comes from the BOM, then the UTF-16 shape of `<?`, then the
/// `encoding` pseudo-attribute of the declaration; UTF-8 otherwise.
fn to_utf8<'a>(xml: &'a [u8], origin: &Path) -> Result<Cow<'a, [u8]>> {
    let (encoding, body) = match Encoding::for_bom(xml) {
        Some((encoding, bom_len)) => (encoding, &xml[bom_len..]),
        None if xml.starts_with(b"<\0?\0") => (UTF_16LE, xml),
        None if xml.starts_with(b"\0<\0?") => (UTF_16BE, xml),
        None => (declared_encoding(xml, origin)?, xml),
    };

    if encoding == UTF_8 {
        return Ok(Cow::Borrowed(body));
    }
    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    if had_errors {
        return Err(malformed(
            origin,
            format!("invalid {} byte sequence", encoding.name()),
        ));
    }
    log::debug!("Transcoded {} from {}", origin.display(), encoding.name());
    Ok(Cow::Owned(text.into_owned().into_bytes()))
}

fn declared_encoding(xml: &[u8], origin: &Path) -> Result<&'static Encoding> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let label = match reader.read_event_into(&mut buf) {
        Ok(Event::Decl(decl)) => match decl.encoding() {
            Some(Ok(label)) => label.into_owned(),
            Some(Err(e)) => return Err(malformed(origin, e)),
            None => return Ok(UTF_8),
        },
        // Anything else is parsed as UTF-8 and reported by the main pass
        _ => return Ok(UTF_8),
    };

    match Encoding::for_label(&label) {
        // A single-byte declaration cannot describe UTF-16 content
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => Ok(UTF_8),
        Some(encoding) => Ok(encoding),
        None => Err(malformed(
            origin,
            format!("unsupported encoding {}", String::from_utf8_lossy(&label)),
        )),
    }
}

fn is_protection(ns: &ResolveResult, name: LocalName) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == SPREADSHEETML_NS)
        && name.as_ref() == PROTECTION_TAG
}

fn malformed(origin: &Path, message: impl std::fmt::Display) -> UnprotectError {
    UnprotectError::MalformedXml {
        path: origin.to_path_buf(),
        message: message.to_string(),
    }
}

/// Serializer that holds back whitespace so it can be dropped with a removed element
struct Output {
    writer: Writer<Vec<u8>>,
    pending: Vec<u8>,
}

impl Output {
    fn new(capacity: usize) -> Self {
        Self {
            writer: Writer::new(Vec::with_capacity(capacity)),
            pending: Vec::new(),
        }
    }

    fn write(&mut self, event: Event) -> Result<()> {
        self.flush_whitespace();
        self.writer
            .write_event(event)
            .map_err(|e| UnprotectError::Unexpected(format!("XML serialization failed: {}", e)))
    }

    /// Emit an XML declaration that always names UTF-8, keeping version and standalone
    fn declaration(&mut self, original: Option<&BytesDecl>) -> Result<()> {
        let version = original
            .and_then(|d| d.version().ok())
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .unwrap_or_else(|| "1.0".to_string());
        let standalone = original
            .and_then(|d| d.standalone())
            .and_then(|s| s.ok())
            .map(|s| String::from_utf8_lossy(&s).into_owned());

        self.write(Event::Decl(BytesDecl::new(
            &version,
            Some("UTF-8"),
            standalone.as_deref(),
        )))
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.flush_whitespace();
        self.writer.get_mut().extend_from_slice(bytes);
    }

    fn hold_whitespace(&mut self, text: &[u8]) {
        self.pending.extend_from_slice(text);
    }

    fn discard_whitespace(&mut self) {
        self.pending.clear();
    }

    fn flush_whitespace(&mut self) {
        if !self.pending.is_empty() {
            self.writer.get_mut().extend_from_slice(&self.pending);
            self.pending.clear();
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.flush_whitespace();
        self.writer.into_inner()
    }
}
