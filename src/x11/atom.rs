use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt};

use crate::x11::X11Result;

pub struct AtomCache {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_state: Atom,
    pub wm_take_focus: Atom,
    pub wm_name: Atom,
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_wm_name: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_active_window: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_client_list: Atom,
    pub utf8_string: Atom,
}

impl AtomCache {
    pub fn new(connection: &impl Connection) -> X11Result<Self> {
        let intern = |name: &[u8]| -> X11Result<Atom> {
            Ok(connection.intern_atom(false, name)?.reply()?.atom)
        };

        Ok(Self {
            wm_protocols: intern(b"WM_PROTOCOLS")?,
            wm_delete_window: intern(b"WM_DELETE_WINDOW")?,
            wm_state: intern(b"WM_STATE")?,
            wm_take_focus: intern(b"WM_TAKE_FOCUS")?,
            wm_name: AtomEnum::WM_NAME.into(),
            net_supported: intern(b"_NET_SUPPORTED")?,
            net_supporting_wm_check: intern(b"_NET_SUPPORTING_WM_CHECK")?,
            net_wm_name: intern(b"_NET_WM_NAME")?,
            net_wm_state: intern(b"_NET_WM_STATE")?,
            net_wm_state_fullscreen: intern(b"_NET_WM_STATE_FULLSCREEN")?,
            net_active_window: intern(b"_NET_ACTIVE_WINDOW")?,
            net_wm_window_type: intern(b"_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dialog: intern(b"_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_client_list: intern(b"_NET_CLIENT_LIST")?,
            utf8_string: intern(b"UTF8_STRING")?,
        })
    }

    /// Atoms advertised in `_NET_SUPPORTED`.
    pub fn supported(&self) -> [Atom; 9] {
        [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_wm_name,
            self.net_wm_state,
            self.net_wm_state_fullscreen,
            self.net_active_window,
            self.net_wm_window_type,
            self.net_wm_window_type_dialog,
            self.net_client_list,
        ]
    }
}
