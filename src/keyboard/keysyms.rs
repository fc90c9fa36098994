pub type Keysym = u32;

pub const XK_ESCAPE: Keysym = 0xff1b;
pub const XK_RETURN: Keysym = 0xff0d;
pub const XK_SPACE: Keysym = 0x0020;
pub const XK_TAB: Keysym = 0xff09;
pub const XK_BACKSPACE: Keysym = 0xff08;
pub const XK_DELETE: Keysym = 0xffff;
pub const XK_LEFT: Keysym = 0xff51;
pub const XK_NUM_LOCK: Keysym = 0xff7f;
pub const XK_UP: Keysym = 0xff52;
pub const XK_RIGHT: Keysym = 0xff53;
pub const XK_DOWN: Keysym = 0xff54;
pub const XK_HOME: Keysym = 0xff50;
pub const XK_END: Keysym = 0xff57;
pub const XK_PAGE_UP: Keysym = 0xff55;
pub const XK_PAGE_DOWN: Keysym = 0xff56;
pub const XK_INSERT: Keysym = 0xff63;
pub const XK_PRINT: Keysym = 0xff61;
pub const XK_F1: Keysym = 0xffbe;
pub const XK_F12: Keysym = 0xffc9;
pub const XK_MINUS: Keysym = 0x002d;
pub const XK_EQUAL: Keysym = 0x003d;
pub const XK_LEFT_BRACKET: Keysym = 0x005b;
pub const XK_RIGHT_BRACKET: Keysym = 0x005d;
pub const XK_SEMICOLON: Keysym = 0x003b;
pub const XK_APOSTROPHE: Keysym = 0x0027;
pub const XK_GRAVE: Keysym = 0x0060;
pub const XK_BACKSLASH: Keysym = 0x005c;
pub const XK_COMMA: Keysym = 0x002c;
pub const XK_PERIOD: Keysym = 0x002e;
pub const XK_SLASH: Keysym = 0x002f;
pub const XK_A: Keysym = 0x0061;
pub const XK_Z: Keysym = 0x007a;
pub const XK_0: Keysym = 0x0030;
pub const XK_9: Keysym = 0x0039;

pub const XK_B: Keysym = 0x0062;
pub const XK_D: Keysym = 0x0064;
pub const XK_E: Keysym = 0x0065;
pub const XK_F: Keysym = 0x0066;
pub const XK_H: Keysym = 0x0068;
pub const XK_I: Keysym = 0x0069;
pub const XK_J: Keysym = 0x006a;
pub const XK_K: Keysym = 0x006b;
pub const XK_L: Keysym = 0x006c;
pub const XK_M: Keysym = 0x006d;
pub const XK_O: Keysym = 0x006f;
pub const XK_Q: Keysym = 0x0071;
pub const XK_T: Keysym = 0x0074;
pub const XK_W: Keysym = 0x0077;

pub const XF86_AUDIO_RAISE_VOLUME: Keysym = 0x1008ff13;
pub const XF86_AUDIO_LOWER_VOLUME: Keysym = 0x1008ff11;
pub const XF86_AUDIO_MUTE: Keysym = 0x1008ff12;
pub const XF86_MON_BRIGHTNESS_UP: Keysym = 0x1008ff02;
pub const XF86_MON_BRIGHTNESS_DOWN: Keysym = 0x1008ff03;

const NAMED_KEYS: &[(&str, Keysym)] = &[
    ("Return", XK_RETURN),
    ("Escape", XK_ESCAPE),
    ("Space", XK_SPACE),
    ("Tab", XK_TAB),
    ("BackSpace", XK_BACKSPACE),
    ("Delete", XK_DELETE),
    ("Left", XK_LEFT),
    ("Right", XK_RIGHT),
    ("Up", XK_UP),
    ("Down", XK_DOWN),
    ("Home", XK_HOME),
    ("End", XK_END),
    ("Prior", XK_PAGE_UP),
    ("Next", XK_PAGE_DOWN),
    ("Insert", XK_INSERT),
    ("Print", XK_PRINT),
    ("minus", XK_MINUS),
    ("equal", XK_EQUAL),
    ("bracketleft", XK_LEFT_BRACKET),
    ("bracketright", XK_RIGHT_BRACKET),
    ("semicolon", XK_SEMICOLON),
    ("apostrophe", XK_APOSTROPHE),
    ("grave", XK_GRAVE),
    ("backslash", XK_BACKSLASH),
    ("comma", XK_COMMA),
    ("period", XK_PERIOD),
    ("slash", XK_SLASH),
    ("XF86AudioRaiseVolume", XF86_AUDIO_RAISE_VOLUME),
    ("XF86AudioLowerVolume", XF86_AUDIO_LOWER_VOLUME),
    ("XF86AudioMute", XF86_AUDIO_MUTE),
    ("XF86MonBrightnessUp", XF86_MON_BRIGHTNESS_UP),
    ("XF86MonBrightnessDown", XF86_MON_BRIGHTNESS_DOWN),
];

/// Accepts X keysym names ("Return", "comma"), single letters or digits and
/// F1 to F12. Letters are case-insensitive.
pub fn keysym_from_str(name: &str) -> Option<Keysym> {
    if let Some(&(_, keysym)) = NAMED_KEYS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
    {
        return Some(keysym);
    }

    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_alphabetic() {
            return Some(XK_A + (ch.to_ascii_lowercase() as u32 - 'a' as u32));
        }
        if ch.is_ascii_digit() {
            return Some(XK_0 + (ch as u32 - '0' as u32));
        }
    }

    let number = name
        .strip_prefix('F')
        .or_else(|| name.strip_prefix('f'))?
        .parse::<u32>()
        .ok()?;
    (1..=12).contains(&number).then(|| XK_F1 + number - 1)
}

pub fn format_keysym(keysym: Keysym) -> String {
    match keysym {
        XK_A..=XK_Z => char::from((keysym - XK_A) as u8 + b'A').to_string(),
        XK_0..=XK_9 => char::from((keysym - XK_0) as u8 + b'0').to_string(),
        XK_F1..=XK_F12 => format!("F{}", keysym - XK_F1 + 1),
        _ => NAMED_KEYS
            .iter()
            .find(|(_, known)| *known == keysym)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| format!("0x{:x}", keysym)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_letters_digits_and_names() {
        assert_eq!(keysym_from_str("j"), Some(XK_J));
        assert_eq!(keysym_from_str("J"), Some(XK_J));
        assert_eq!(keysym_from_str("5"), Some(XK_0 + 5));
        assert_eq!(keysym_from_str("comma"), Some(XK_COMMA));
        assert_eq!(keysym_from_str("return"), Some(XK_RETURN));
        assert_eq!(keysym_from_str("F11"), Some(XK_F1 + 10));
        assert_eq!(keysym_from_str("F13"), None);
        assert_eq!(keysym_from_str("nonsense"), None);
    }

    #[test]
    fn formats_back_to_readable_names() {
        assert_eq!(format_keysym(XK_Q), "Q");
        assert_eq!(format_keysym(XK_9), "9");
        assert_eq!(format_keysym(XK_F1), "F1");
        assert_eq!(format_keysym(XK_PERIOD), "period");
    }
}
