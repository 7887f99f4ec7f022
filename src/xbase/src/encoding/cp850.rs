//! Code page 850 (DOS Latin-1), which predates the WHATWG encoding standard
//! and therefore has no entry in `encoding_rs`. Bytes 0x00-0x7F are plain
//! ASCII; bytes 0x80-0xFF map to the table below.

/// `CP850_HIGH[b - 0x80]` is the Unicode scalar value code page 850 assigns
/// to byte `b`.
const CP850_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', // 0x80
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', 'ø', '£', 'Ø', '×', 'ƒ', // 0x90
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '®', '¬', '½', '¼', '¡', '«', '»', // 0xA0
    '░', '▒', '▓', '│', '┤', 'Á', 'Â', 'À', '©', '╣', '║', '╗', '╝', '¢', '¥', '┐', // 0xB0
    '└', '┴', '┬', '├', '─', '┼', 'ã', 'Ã', '╚', '╔', '╩', '╦', '╠', '═', '╬', '¤', // 0xC0
    'ð', 'Ð', 'Ê', 'Ë', 'È', 'ı', 'Í', 'Î', 'Ï', '┘', '┌', '█', '▄', '¦', 'Ì', '▀', // 0xD0
    'Ó', 'ß', 'Ô', 'Ò', 'õ', 'Õ', 'µ', 'þ', 'Þ', 'Ú', 'Û', 'Ù', 'ý', 'Ý', '¯', '´', // 0xE0
    '\u{ad}', '±', '‗', '¾', '¶', '§', '÷', '¸', '°', '¨', '·', '¹', '³', '²', '■', '\u{a0}', // 0xF0
];

pub fn decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP850_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// Encodes `s` as code page 850, substituting `?` for characters outside the
/// table (ASCII and the 128 mapped code points).
pub fn encode(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            if (c as u32) < 0x80 {
                c as u8
            } else {
                CP850_HIGH
                    .iter()
                    .position(|&candidate| candidate == c)
                    .map(|i| (i + 0x80) as u8)
                    .unwrap_or(b'?')
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_accented_latin() {
        let text = "Café Übung";
        let bytes = encode(text);
        assert_eq!(decode(&bytes), text);
    }

    #[test]
    fn plain_ascii_is_unchanged() {
        assert_eq!(decode(b"hello"), "hello");
        assert_eq!(encode("hello"), b"hello");
    }
}
