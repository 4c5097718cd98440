//! Text form of binary keys and values.
//!
//! Keys and values are arbitrary bytes, but they are shown on a terminal and
//! typed back in on a command line. The text form keeps printable UTF-8 as
//! is and writes every other byte as `\xHH` (lowercase hex), so a value with
//! control bytes or newlines stays on one line and can be re-entered.

use std::borrow::Cow;
use std::fmt::Write;

use lazy_static::lazy_static;
use regex::bytes::{Captures, Regex};

/// Render bytes for display.
pub fn bytes_to_string(b: &[u8]) -> String {
    let mut out = String::with_capacity(b.len());
    for chunk in b.utf8_chunks() {
        push_text(&mut out, chunk.valid());
        for byte in chunk.invalid() {
            push_escape(&mut out, *byte);
        }
    }
    out
}

/// Turn typed text back into bytes: each `\xHH` becomes one byte, everything
/// else passes through.
pub fn string_to_bytes(s: &str) -> Vec<u8> {
    lazy_static! {
        static ref ESCAPE: Regex = Regex::new(r"\\x[0-9a-f]{2}").unwrap();
    }

    match ESCAPE.replace_all(s.as_bytes(), |caps: &Captures| {
        let m = &caps[0];
        vec![(hex_value(m[2]) << 4) | hex_value(m[3])]
    }) {
        Cow::Borrowed(b) => b.to_vec(),
        Cow::Owned(b) => b,
    }
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_control() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                push_escape(out, *byte);
            }
        } else {
            out.push(c);
        }
    }
}

fn push_escape(out: &mut String, byte: u8) {
    // Writing to a String cannot fail.
    let _ = write!(out, "\\x{:02x}", byte);
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => 0,
    }
}
