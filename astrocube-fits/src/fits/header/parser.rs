use std::fmt;
use std::io::{ErrorKind, Read};

use tracing::debug;

use super::store::HeaderStore;
use crate::fits::{FitsError, Result};

pub const RECORD_SIZE: usize = 80;
pub const BLOCK_SIZE: usize = 2880;
pub const RECORDS_PER_BLOCK: usize = BLOCK_SIZE / RECORD_SIZE;

/// How far header decoding got. Anything but `Complete` leaves a partial
/// store; the caller decides whether that is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    Complete,
    /// Input ended on a block boundary without an `END` record.
    MissingEnd,
    /// Record `index` (0-based) was not printable ASCII.
    InvalidRecord { index: usize },
    /// Input ended inside a record or block.
    Truncated,
    /// No `END` within the configured block limit.
    TooLarge,
}

impl HeaderStatus {
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

impl fmt::Display for HeaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::MissingEnd => write!(f, "missing END record"),
            Self::InvalidRecord { index } => write!(f, "invalid header record {index}"),
            Self::Truncated => write!(f, "truncated header"),
            Self::TooLarge => write!(f, "header exceeds block limit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedHeader {
    pub store: HeaderStore,
    /// Byte offset of the data segment, a multiple of [`BLOCK_SIZE`].
    pub end_offset: u64,
    pub status: HeaderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCard {
    pub keyword: String,
    pub value: Option<String>,
    /// The value was a quoted string.
    pub quoted: bool,
    pub comment: Option<String>,
}

impl HeaderCard {
    pub fn parse(data: &[u8; RECORD_SIZE]) -> Result<Self> {
        if !data.iter().all(|b| (0x20..=0x7e).contains(b)) {
            return Err(FitsError::InvalidFormat(
                "Header record contains non-printable characters".to_string(),
            ));
        }
        // all bytes are ASCII, so the conversion cannot fail
        let card = std::str::from_utf8(data)
            .map_err(|_| FitsError::InvalidFormat("Invalid header record".to_string()))?;

        let keyword = card[..8].trim().to_ascii_uppercase();
        let mut parsed = HeaderCard {
            keyword,
            value: None,
            quoted: false,
            comment: None,
        };

        if parsed.keyword == "CONTINUE" {
            parsed.parse_value(&card[8..]);
        } else if &card[8..10] == "= " && !HeaderStore::is_commentary(&parsed.keyword) {
            parsed.parse_value(&card[10..]);
        } else {
            let text = card[8..].trim_end();
            if !text.is_empty() {
                parsed.comment = Some(text.to_string());
            }
        }

        Ok(parsed)
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    fn parse_value(&mut self, field: &str) {
        let field = field.trim_start();
        if let Some(rest) = field.strip_prefix('\'') {
            let (text, remainder) = split_quoted(rest);
            self.value = Some(text);
            self.quoted = true;
            self.comment = comment_after(remainder);
        } else {
            let (value, comment) = match field.split_once('/') {
                Some((value, comment)) => (value, Some(comment)),
                None => (field, None),
            };
            let value = value.trim();
            if !value.is_empty() {
                self.value = Some(value.to_string());
            }
            self.comment = comment
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
        }
    }
}

/// Splits the text after an opening quote into the unescaped string and the
/// remainder after the closing quote. An unterminated string runs to the end.
fn split_quoted(rest: &str) -> (String, &str) {
    let mut text = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                text.push('\'');
                continue;
            }
            return (text.trim_end().to_string(), &rest[i + 1..]);
        }
        text.push(c);
    }
    (text.trim_end().to_string(), "")
}

fn comment_after(remainder: &str) -> Option<String> {
    let (_, comment) = remainder.split_once('/')?;
    let comment = comment.trim();
    (!comment.is_empty()).then(|| comment.to_string())
}

enum Step {
    More,
    End,
    Invalid,
}

/// Record-at-a-time decoder shared by the slice and stream entry points.
#[derive(Default)]
struct Decoder {
    store: HeaderStore,
    /// Long string waiting for `CONTINUE` records.
    pending: Option<(String, String)>,
}

impl Decoder {
    fn feed(&mut self, record: &[u8]) -> Step {
        let mut data = [b' '; RECORD_SIZE];
        data.copy_from_slice(record);
        let card = match HeaderCard::parse(&data) {
            Ok(card) => card,
            Err(_) => return Step::Invalid,
        };

        if card.keyword == "CONTINUE" {
            match (self.pending.take(), card.value) {
                (Some((key, mut text)), Some(more)) if card.quoted => {
                    text.push_str(&more);
                    self.hold_or_insert(key, text);
                }
                (pending, _) => {
                    if let Some((key, text)) = pending {
                        self.finish_pending(key, text);
                    }
                    debug!("ignoring CONTINUE record without a long string to extend");
                }
            }
            return Step::More;
        }

        if let Some((key, text)) = self.pending.take() {
            self.finish_pending(key, text);
        }

        if card.is_end() {
            return Step::End;
        }

        if HeaderStore::is_commentary(&card.keyword) {
            self.store
                .append(&card.keyword, card.comment.unwrap_or_default());
            return Step::More;
        }

        if card.keyword.is_empty() {
            return Step::More;
        }

        match card.value {
            Some(value) if card.quoted => self.hold_or_insert(card.keyword, value),
            Some(value) => self.store.insert(&card.keyword, value),
            // undefined value
            None => self.store.insert(&card.keyword, ""),
        }
        Step::More
    }

    fn hold_or_insert(&mut self, key: String, text: String) {
        match text.strip_suffix('&') {
            Some(head) => self.pending = Some((key, head.to_string())),
            None => self.store.insert(&key, text),
        }
    }

    /// A trailing `&` not followed by `CONTINUE` is literal.
    fn finish_pending(&mut self, key: String, mut text: String) {
        text.push('&');
        self.store.insert(&key, text);
    }

    fn finish(mut self, end_offset: u64, status: HeaderStatus) -> DecodedHeader {
        if let Some((key, text)) = self.pending.take() {
            self.finish_pending(key, text);
        }
        DecodedHeader {
            store: self.store,
            end_offset,
            status,
        }
    }
}

fn align_to_block(offset: u64) -> u64 {
    offset.div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64
}

/// Decodes a header held in memory. Never fails; problems show up in
/// [`DecodedHeader::status`].
pub fn decode(bytes: &[u8]) -> DecodedHeader {
    let mut decoder = Decoder::default();
    let mut consumed = 0u64;

    for (index, record) in bytes.chunks(RECORD_SIZE).enumerate() {
        if record.len() < RECORD_SIZE {
            return decoder.finish(consumed, HeaderStatus::Truncated);
        }
        consumed += RECORD_SIZE as u64;
        match decoder.feed(record) {
            Step::More => {}
            Step::End => return decoder.finish(align_to_block(consumed), HeaderStatus::Complete),
            Step::Invalid => {
                return decoder.finish(consumed - RECORD_SIZE as u64, HeaderStatus::InvalidRecord { index })
            }
        }
    }

    let status = if bytes.len() % BLOCK_SIZE == 0 {
        HeaderStatus::MissingEnd
    } else {
        HeaderStatus::Truncated
    };
    decoder.finish(consumed, status)
}

/// Decodes a header block by block from a stream positioned at its start,
/// leaving the stream at the end of the last header block read.
pub fn decode_from<R: Read>(reader: &mut R, max_blocks: usize) -> Result<DecodedHeader> {
    let mut decoder = Decoder::default();
    let mut block = vec![0u8; BLOCK_SIZE];

    for block_index in 0..max_blocks {
        let filled = read_block(reader, &mut block)?;
        let block_start = (block_index * BLOCK_SIZE) as u64;
        if filled == 0 {
            return Ok(decoder.finish(block_start, HeaderStatus::MissingEnd));
        }

        for (i, record) in block[..filled].chunks(RECORD_SIZE).enumerate() {
            let index = block_index * RECORDS_PER_BLOCK + i;
            if record.len() < RECORD_SIZE {
                return Ok(decoder.finish(block_start, HeaderStatus::Truncated));
            }
            match decoder.feed(record) {
                Step::More => {}
                Step::End => {
                    let end = block_start + BLOCK_SIZE as u64;
                    let status = if filled == BLOCK_SIZE {
                        HeaderStatus::Complete
                    } else {
                        HeaderStatus::Truncated
                    };
                    return Ok(decoder.finish(end, status));
                }
                Step::Invalid => {
                    return Ok(decoder.finish(block_start, HeaderStatus::InvalidRecord { index }))
                }
            }
        }

        if filled < BLOCK_SIZE {
            return Ok(decoder.finish(block_start, HeaderStatus::Truncated));
        }
    }

    Ok(decoder.finish((max_blocks * BLOCK_SIZE) as u64, HeaderStatus::TooLarge))
}

/// Fills `buf` as far as the stream allows; returns the byte count.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FitsError::Io(e)),
        }
    }
    Ok(filled)
}
