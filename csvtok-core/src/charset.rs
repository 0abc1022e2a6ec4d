use std::fmt;
use std::mem;
use std::str::{self, FromStr};

use crate::error::{ConfigError, EncodeError};

const REPLACEMENT: char = '\u{FFFD}';

/// A character encoding used to read and write delimited text.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Charset {
    /// UTF-8. This is the default.
    Utf8,
    /// 7-bit ASCII.
    Ascii,
    /// ISO-8859-1, where every byte is the code point of the same value.
    Latin1,
    /// UTF-16, little endian, without a byte order mark.
    Utf16Le,
}

impl Default for Charset {
    fn default() -> Charset {
        Charset::Utf8
    }
}

impl Charset {
    /// Look up a charset by one of its common names.
    ///
    /// Names are case insensitive. `binary` is accepted as an alias of
    /// `latin1` and `ucs2` as an alias of `utf16le`.
    pub fn from_name(name: &str) -> Option<Charset> {
        let name = name.trim().to_ascii_lowercase();
        match &*name {
            "utf8" | "utf-8" => Some(Charset::Utf8),
            "ascii" | "us-ascii" => Some(Charset::Ascii),
            "latin1" | "latin-1" | "binary" | "iso-8859-1" => {
                Some(Charset::Latin1)
            }
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Some(Charset::Utf16Le),
            _ => None,
        }
    }

    /// The canonical name of this charset.
    pub fn name(&self) -> &'static str {
        match *self {
            Charset::Utf8 => "utf-8",
            Charset::Ascii => "ascii",
            Charset::Latin1 => "latin1",
            Charset::Utf16Le => "utf-16le",
        }
    }

    /// Encode `text`, appending the bytes to `out`.
    ///
    /// If a character cannot be represented, an error is returned and `out`
    /// is left with whatever was encoded before it.
    pub fn encode_into(
        &self,
        text: &str,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        match *self {
            Charset::Utf8 => out.extend_from_slice(text.as_bytes()),
            Charset::Ascii => {
                if let Some(ch) = text.chars().find(|c| !c.is_ascii()) {
                    return Err(self.unrepresentable(ch));
                }
                out.extend_from_slice(text.as_bytes());
            }
            Charset::Latin1 => {
                out.reserve(text.len());
                for ch in text.chars() {
                    if (ch as u32) > 0xFF {
                        return Err(self.unrepresentable(ch));
                    }
                    out.push(ch as u32 as u8);
                }
            }
            Charset::Utf16Le => {
                out.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
        }
        Ok(())
    }

    /// Encode `text` into a new buffer.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(text.len());
        self.encode_into(text, &mut out)?;
        Ok(out)
    }

    /// Create an incremental decoder for this charset.
    pub fn decoder(&self) -> Decoder {
        Decoder::new(*self)
    }

    fn unrepresentable(&self, ch: char) -> EncodeError {
        EncodeError::Unrepresentable { ch, charset: self.name() }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Charset, ConfigError> {
        Charset::from_name(s)
            .ok_or_else(|| ConfigError::UnknownEncoding { name: s.to_string() })
    }
}

/// An incremental decoder from bytes to characters.
///
/// Chunks may split multi-byte sequences anywhere; the incomplete tail of a
/// chunk is held until the next call. Malformed input decodes to U+FFFD.
#[derive(Clone, Debug)]
pub struct Decoder {
    charset: Charset,
    carry: Vec<u8>,
    high_surrogate: Option<u16>,
}

impl Decoder {
    /// Create a decoder for the given charset.
    pub fn new(charset: Charset) -> Decoder {
        Decoder { charset, carry: Vec::with_capacity(4), high_surrogate: None }
    }

    /// The charset this decoder reads.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Decode `input`, appending characters to `out`.
    pub fn decode(&mut self, input: &[u8], out: &mut String) {
        match self.charset {
            Charset::Utf8 => self.decode_utf8(input, out),
            Charset::Ascii => out.extend(input.iter().map(|&b| {
                if b.is_ascii() {
                    b as char
                } else {
                    REPLACEMENT
                }
            })),
            Charset::Latin1 => out.extend(input.iter().map(|&b| b as char)),
            Charset::Utf16Le => self.decode_utf16le(input, out),
        }
    }

    /// Signal the end of input, flushing any incomplete sequence as U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.carry.is_empty() {
            self.carry.clear();
            out.push(REPLACEMENT);
        }
        if self.high_surrogate.take().is_some() {
            out.push(REPLACEMENT);
        }
    }

    fn decode_utf8(&mut self, input: &[u8], out: &mut String) {
        let joined;
        let mut bytes = if self.carry.is_empty() {
            input
        } else {
            let mut buf = mem::take(&mut self.carry);
            buf.extend_from_slice(input);
            joined = buf;
            &joined[..]
        };
        while !bytes.is_empty() {
            match str::from_utf8(bytes) {
                Ok(s) => {
                    out.push_str(s);
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(str::from_utf8(&bytes[..valid]).unwrap_or(""));
                    bytes = &bytes[valid..];
                }
            }
            let (ch, size) = bstr::decode_utf8(bytes);
            match ch {
                Some(ch) => out.push(ch),
                None => {
                    if size == bytes.len() && size < utf8_width(bytes[0]) {
                        self.carry.extend_from_slice(bytes);
                        return;
                    }
                    out.push(REPLACEMENT);
                }
            }
            bytes = &bytes[size..];
        }
    }

    fn decode_utf16le(&mut self, input: &[u8], out: &mut String) {
        let mut bytes = input;
        if let Some(lo) = self.carry.pop() {
            match bytes.split_first() {
                None => {
                    self.carry.push(lo);
                    return;
                }
                Some((&hi, rest)) => {
                    self.push_unit(u16::from_le_bytes([lo, hi]), out);
                    bytes = rest;
                }
            }
        }
        let mut pairs = bytes.chunks_exact(2);
        for pair in &mut pairs {
            self.push_unit(u16::from_le_bytes([pair[0], pair[1]]), out);
        }
        self.carry.extend_from_slice(pairs.remainder());
    }

    fn push_unit(&mut self, unit: u16, out: &mut String) {
        if let Some(high) = self.high_surrogate.take() {
            if is_low_surrogate(unit) {
                let c = 0x10000
                    + (((high as u32) - 0xD800) << 10)
                    + ((unit as u32) - 0xDC00);
                out.push(std::char::from_u32(c).unwrap_or(REPLACEMENT));
                return;
            }
            out.push(REPLACEMENT);
        }
        if is_high_surrogate(unit) {
            self.high_surrogate = Some(unit);
        } else if is_low_surrogate(unit) {
            out.push(REPLACEMENT);
        } else {
            out.push(std::char::from_u32(unit as u32).unwrap_or(REPLACEMENT));
        }
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// The length of the UTF-8 sequence introduced by `lead`, or `0` if `lead`
/// can never start a sequence.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}
