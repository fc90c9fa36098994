use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, Font as FontId, QueryFontReply};

use crate::errors::X11Error;

/// A server-side core font with its per-glyph advance widths cached, so
/// measuring text needs no round trip.
pub struct Font {
    id: FontId,
    ascent: i16,
    descent: i16,
    first_char: u16,
    widths: Vec<i16>,
    default_width: i16,
}

impl Font {
    pub fn open(connection: &impl Connection, name: &str) -> Result<Self, X11Error> {
        let id = connection.generate_id()?;
        connection
            .open_font(id, name.as_bytes())?
            .check()
            .map_err(|_| X11Error::FontLoadFailed(name.to_string()))?;

        let reply = connection.query_font(id)?.reply()?;
        Ok(Self::from_reply(id, &reply))
    }

    fn from_reply(id: FontId, reply: &QueryFontReply) -> Self {
        Self {
            id,
            ascent: reply.font_ascent,
            descent: reply.font_descent,
            first_char: reply.min_char_or_byte2,
            widths: reply
                .char_infos
                .iter()
                .map(|info| info.character_width)
                .collect(),
            default_width: reply.max_bounds.character_width,
        }
    }

    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn height(&self) -> i32 {
        (self.ascent + self.descent) as i32
    }

    pub fn ascent(&self) -> i32 {
        self.ascent as i32
    }

    pub fn text_width(&self, text: &str) -> i32 {
        encode(text)
            .iter()
            .map(|&byte| self.char_width(byte) as i32)
            .sum()
    }

    fn char_width(&self, byte: u8) -> i16 {
        let index = (byte as u16).checked_sub(self.first_char);
        index
            .and_then(|index| self.widths.get(index as usize).copied())
            .filter(|&width| width > 0)
            .unwrap_or(self.default_width)
    }

    /// Longest prefix of `text` that fits in `width`, marked with an ellipsis
    /// when shortened.
    pub fn truncate(&self, text: &str, width: i32) -> Vec<u8> {
        let bytes = encode(text);
        if self.text_width(text) <= width {
            return bytes;
        }

        let ellipsis = self.char_width(b'.') as i32 * 3;
        let mut used = 0;
        let mut kept = Vec::new();
        for byte in bytes {
            let advance = self.char_width(byte) as i32;
            if used + advance + ellipsis > width {
                break;
            }
            used += advance;
            kept.push(byte);
        }
        if used + ellipsis <= width {
            kept.extend_from_slice(b"...");
        }
        kept
    }

    pub fn close(&self, connection: &impl Connection) -> Result<(), X11Error> {
        connection.close_font(self.id)?;
        Ok(())
    }
}

/// Core fonts are Latin-1; anything outside it is shown as '?'. ImageText8
/// takes at most 255 bytes.
fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .take(255)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monospace(width: i16) -> Font {
        Font {
            id: 1,
            ascent: 10,
            descent: 3,
            first_char: 0,
            widths: Vec::new(),
            default_width: width,
        }
    }

    #[test]
    fn monospace_width_uses_max_bounds() {
        let font = monospace(6);
        assert_eq!(font.text_width("abc"), 18);
        assert_eq!(font.height(), 13);
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(encode("a\u{2603}"), b"a?".to_vec());
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let font = monospace(6);
        assert_eq!(font.truncate("hello", 60), b"hello".to_vec());
        assert_eq!(font.truncate("hello world", 48), b"hello...".to_vec());
    }
}
