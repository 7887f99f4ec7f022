//! Encoding bridge: converts between host strings and the byte slices
//! stored on disk under a named code page.
//!
//! `utf-8`, `ascii`, and `gbk`/`cp936` are served by `encoding_rs`; `cp850`
//! has no WHATWG entry and is served by a local lookup table (see
//! [`cp850`]). Any other label `encoding_rs::Encoding::for_label` accepts
//! also works, widening the contract beyond the four names §6.3 requires.

mod cp850;

use crate::error::{Error, Result};

/// A resolved, named code page capable of lossless round-tripping of valid
/// text and lossy-but-consistent decoding of malformed bytes.
#[derive(Debug, Clone)]
pub struct TextEncoding {
    label: String,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Ascii,
    Cp850,
    Other(&'static encoding_rs::Encoding),
}

impl TextEncoding {
    /// Resolves `name` to a concrete encoding, failing with
    /// [`Error::EncodingUnsupported`] if nothing recognizes it.
    pub fn resolve(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let kind = match normalized.as_str() {
            "ascii" | "us-ascii" => Kind::Ascii,
            "cp850" | "ibm850" | "850" => Kind::Cp850,
            "gbk" | "cp936" | "gb2312" => Kind::Other(encoding_rs::GBK),
            _ => {
                let enc = encoding_rs::Encoding::for_label(normalized.as_bytes())
                    .ok_or_else(|| Error::EncodingUnsupported(name.to_string()))?;
                Kind::Other(enc)
            }
        };
        Ok(TextEncoding {
            label: normalized,
            kind,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Encodes `s` into raw bytes under this code page. Never fails: bytes
    /// outside the target code page are substituted the same way every
    /// time, so valid round-trips stay lossless.
    pub fn encode(&self, s: &str) -> Vec<u8> {
        match &self.kind {
            Kind::Ascii => s.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect(),
            Kind::Cp850 => cp850::encode(s),
            Kind::Other(enc) => {
                let (bytes, _, _) = enc.encode(s);
                bytes.into_owned()
            }
        }
    }

    /// Decodes `bytes` under this code page, substituting the Unicode
    /// replacement character for anything malformed.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match &self.kind {
            Kind::Ascii => bytes
                .iter()
                .map(|&b| if b < 0x80 { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
            Kind::Cp850 => cp850::decode(bytes),
            Kind::Other(enc) => {
                let (text, _, _) = enc.decode(bytes);
                text.into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_round_trips() {
        let enc = TextEncoding::resolve("utf-8").unwrap();
        let bytes = enc.encode("hello");
        assert_eq!(enc.decode(&bytes), "hello");
    }

    #[test]
    fn gbk_round_trips_cjk() {
        let enc = TextEncoding::resolve("gbk").unwrap();
        let bytes = enc.encode("张三");
        assert_eq!(enc.decode(&bytes), "张三");
    }

    #[test]
    fn cp936_is_an_alias_for_gbk() {
        assert!(TextEncoding::resolve("cp936").is_ok());
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = TextEncoding::resolve("not-a-real-encoding").unwrap_err();
        assert!(matches!(err, Error::EncodingUnsupported(_)));
    }

    #[test]
    fn ascii_substitutes_non_ascii_bytes() {
        let enc = TextEncoding::resolve("ascii").unwrap();
        assert_eq!(enc.encode("café"), b"caf?");
    }
}
