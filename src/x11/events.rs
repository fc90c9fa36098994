//! The X event loop: translates server events into window manager calls.

use x11rb::protocol::Event;
use x11rb::protocol::xproto::Property as PropertyState;
use x11rb::protocol::xproto::*;

use super::X11Backend;
use super::atom::AtomCache;
use crate::backend::{ConfigureRequest, Protocol, WindowState, WmResult};
use crate::errors::{WmError, X11Error};
use crate::geometry::Rect;
use crate::keyboard::handlers::handle_key_press;
use crate::window_manager::{DragKind, Property, WindowManager};

type Manager = WindowManager<X11Backend>;

/// Set in `response_type` of events delivered through SendEvent.
const SEND_EVENT_MASK: u8 = 0x80;

/// Adopts existing windows, then handles events until quit is requested.
pub fn run(wm: &mut Manager) -> WmResult<()> {
    let bindings = wm.config().keybindings.clone();
    wm.backend_mut().grab_keys(&bindings)?;
    scan(wm)?;

    let status = wm.backend().root_name();
    wm.set_status_text(status)?;
    wm.start_autostart();

    while wm.is_running() {
        let event = wm.backend_mut().next_event()?;
        wm.reap_children();
        match handle_event(wm, event) {
            Ok(()) => {}
            Err(WmError::X11(X11Error::ReplyError(error))) => {
                tracing::debug!(%error, "request failed while handling event");
            }
            Err(error) => return Err(error),
        }
    }

    tracing::info!("shutting down");
    wm.shutdown()?;
    wm.backend_mut().cleanup()
}

/// Manages windows that were mapped before startup. Transients go second so
/// their parents are already known.
fn scan(wm: &mut Manager) -> WmResult<()> {
    let tree = wm
        .backend()
        .connection()
        .query_tree(wm.backend().root())?
        .reply()?;

    let mut transients = Vec::new();
    for &window in &tree.children {
        let Some(attributes) = attributes(wm.backend(), window) else {
            continue;
        };
        if attributes.override_redirect {
            continue;
        }
        if wm.backend().transient_for(window).is_some() {
            transients.push((window, attributes.map_state));
            continue;
        }
        if is_adoptable(wm.backend(), window, attributes.map_state) {
            adopt(wm, window)?;
        }
    }

    for (window, map_state) in transients {
        if is_adoptable(wm.backend(), window, map_state) {
            adopt(wm, window)?;
        }
    }

    tracing::info!(windows = tree.children.len(), "scanned existing windows");
    Ok(())
}

fn is_adoptable(backend: &X11Backend, window: Window, map_state: MapState) -> bool {
    map_state == MapState::VIEWABLE || backend.wm_state(window) == Some(WindowState::Iconic as u32)
}

fn attributes(backend: &X11Backend, window: Window) -> Option<GetWindowAttributesReply> {
    backend
        .connection()
        .get_window_attributes(window)
        .ok()?
        .reply()
        .ok()
}

fn adopt(wm: &mut Manager, window: Window) -> WmResult<()> {
    let Ok(geometry) = wm.backend().connection().get_geometry(window)?.reply() else {
        return Ok(());
    };
    let rect = Rect::new(
        geometry.x.into(),
        geometry.y.into(),
        geometry.width.into(),
        geometry.height.into(),
    );
    wm.manage(window, rect, geometry.border_width.into())
}

pub fn handle_event(wm: &mut Manager, event: Event) -> WmResult<()> {
    let root = wm.backend().root();

    match event {
        Event::MapRequest(event) => {
            let Some(attributes) = attributes(wm.backend(), event.window) else {
                return Ok(());
            };
            if attributes.override_redirect || wm.is_managed(event.window) {
                return Ok(());
            }
            adopt(wm, event.window)?;
        }
        Event::UnmapNotify(event) => {
            let synthetic = event.response_type & SEND_EVENT_MASK != 0;
            wm.unmap_notify(event.window, synthetic)?;
        }
        Event::DestroyNotify(event) => {
            wm.unmanage(event.window, true)?;
        }
        Event::ConfigureRequest(event) => {
            wm.configure_request(configure_request(&event))?;
        }
        Event::ConfigureNotify(event) => {
            if event.window == root {
                wm.root_configured(event.width.into(), event.height.into())?;
            }
        }
        Event::PropertyNotify(event) => {
            let atoms = wm.backend().atoms();
            if event.window == root && event.atom == atoms.wm_name {
                let status = wm.backend().root_name();
                wm.set_status_text(status)?;
            } else if event.state != PropertyState::DELETE
                && let Some(property) = property_kind(atoms, event.atom)
            {
                wm.property_changed(event.window, property)?;
            }
        }
        Event::ClientMessage(event) => {
            let atoms = wm.backend().atoms();
            let data = event.data.as_data32();
            if event.type_ == atoms.net_wm_state {
                let fullscreen = atoms.net_wm_state_fullscreen;
                if data[1] == fullscreen || data[2] == fullscreen {
                    wm.fullscreen_request(event.window, data[0])?;
                }
            } else if event.type_ == atoms.net_active_window {
                wm.activate_request(event.window)?;
            }
        }
        Event::EnterNotify(event) => {
            let ignored = event.mode != NotifyMode::NORMAL || event.detail == NotifyDetail::INFERIOR;
            if ignored && event.event != root {
                return Ok(());
            }
            wm.pointer_entered(event.event)?;
        }
        Event::MotionNotify(event) => {
            if event.event == root {
                wm.pointer_moved(event.root_x.into(), event.root_y.into())?;
            }
        }
        Event::Expose(event) => {
            if event.count == 0 {
                wm.bar_exposed(event.window)?;
            }
        }
        Event::FocusIn(event) => {
            wm.focus_in(event.event)?;
        }
        Event::MappingNotify(event) => {
            if event.request == Mapping::KEYBOARD {
                let bindings = wm.config().keybindings.clone();
                wm.backend_mut().grab_keys(&bindings)?;
            }
        }
        Event::KeyPress(event) => {
            let action = wm.backend().keyboard_mapping().and_then(|mapping| {
                handle_key_press(&event, &wm.config().keybindings, mapping)
            });
            if let Some((action, arg)) = action {
                wm.handle_key_action(action, &arg)?;
            }
            run_pending_drag(wm)?;
        }
        Event::ButtonPress(event) => {
            wm.button_pressed(
                event.event,
                event.event_x.into(),
                event.detail,
                u16::from(event.state),
            )?;
            if wm.is_managed(event.event) {
                wm.backend_mut().replay_pointer(event.time)?;
            }
            run_pending_drag(wm)?;
        }
        Event::Error(error) => {
            tracing::warn!(?error, "X error");
        }
        _ => {}
    }
    Ok(())
}

fn property_kind(atoms: &AtomCache, atom: Atom) -> Option<Property> {
    if atom == u32::from(AtomEnum::WM_TRANSIENT_FOR) {
        Some(Property::TransientFor)
    } else if atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
        Some(Property::NormalHints)
    } else if atom == u32::from(AtomEnum::WM_HINTS) {
        Some(Property::Hints)
    } else if atom == atoms.wm_name || atom == atoms.net_wm_name {
        Some(Property::Title)
    } else if atom == atoms.net_wm_window_type {
        Some(Property::WindowType)
    } else {
        None
    }
}

fn configure_request(event: &ConfigureRequestEvent) -> ConfigureRequest {
    let mask = event.value_mask;
    let has = |flag: ConfigWindow| mask.contains(flag);
    ConfigureRequest {
        window: event.window,
        x: has(ConfigWindow::X).then_some(event.x.into()),
        y: has(ConfigWindow::Y).then_some(event.y.into()),
        width: has(ConfigWindow::WIDTH).then_some(event.width.into()),
        height: has(ConfigWindow::HEIGHT).then_some(event.height.into()),
        border_width: has(ConfigWindow::BORDER_WIDTH).then_some(event.border_width.into()),
        sibling: has(ConfigWindow::SIBLING).then_some(event.sibling),
        stack_mode: has(ConfigWindow::STACK_MODE).then_some(event.stack_mode),
    }
}

/// Runs a mouse move or resize requested by the last binding, grabbing the
/// pointer until the button is released.
fn run_pending_drag(wm: &mut Manager) -> WmResult<()> {
    let Some(kind) = wm.take_pending_drag() else {
        return Ok(());
    };
    let pointer = wm.backend().pointer_position().unwrap_or((0, 0));
    let Some(mut drag) = wm.begin_drag(kind, pointer)? else {
        return Ok(());
    };
    if !wm.backend_mut().grab_pointer(kind)? {
        return Ok(());
    }
    if let Some((x, y)) = drag.anchor {
        wm.backend_mut().warp_pointer(drag.window, x, y)?;
    }

    loop {
        match wm.backend_mut().next_event()? {
            event @ (Event::ConfigureRequest(_) | Event::Expose(_) | Event::MapRequest(_)) => {
                handle_event(wm, event)?;
            }
            Event::MotionNotify(event) => {
                if drag.accept_motion(event.time) {
                    wm.drag_motion(&drag, event.root_x.into(), event.root_y.into())?;
                }
            }
            Event::ButtonRelease(_) => break,
            _ => {}
        }
        if !wm.is_managed(drag.window) {
            break;
        }
    }

    if drag.kind == DragKind::Resize
        && let Some(client) = wm.client(drag.window)
    {
        let x = client.width + client.border_width - 1;
        let y = client.height + client.border_width - 1;
        wm.backend_mut().warp_pointer(drag.window, x, y)?;
    }
    wm.backend_mut().ungrab_pointer()?;
    wm.backend_mut().sync_and_drain_enter()?;
    wm.end_drag(&drag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms() -> AtomCache {
        AtomCache {
            wm_protocols: 100,
            wm_delete_window: 101,
            wm_state: 102,
            wm_take_focus: 103,
            wm_name: AtomEnum::WM_NAME.into(),
            net_supported: 105,
            net_supporting_wm_check: 106,
            net_wm_name: 107,
            net_wm_state: 108,
            net_wm_state_fullscreen: 109,
            net_active_window: 110,
            net_wm_window_type: 111,
            net_wm_window_type_dialog: 112,
            net_client_list: 113,
            utf8_string: 114,
        }
    }

    #[test]
    fn property_atoms_map_to_client_updates() {
        let atoms = atoms();
        assert_eq!(
            property_kind(&atoms, AtomEnum::WM_NORMAL_HINTS.into()),
            Some(Property::NormalHints)
        );
        assert_eq!(property_kind(&atoms, 107), Some(Property::Title));
        assert_eq!(property_kind(&atoms, atoms.wm_name), Some(Property::Title));
        assert_eq!(property_kind(&atoms, 111), Some(Property::WindowType));
        assert_eq!(property_kind(&atoms, 999), None);
    }

    #[test]
    fn configure_request_keeps_only_requested_fields() {
        let event = ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: 1,
            window: 42,
            sibling: 0,
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            border_width: 2,
            value_mask: ConfigWindow::X | ConfigWindow::WIDTH | ConfigWindow::STACK_MODE,
        };
        let request = configure_request(&event);
        assert_eq!(request.window, 42);
        assert_eq!(request.x, Some(10));
        assert_eq!(request.y, None);
        assert_eq!(request.width, Some(300));
        assert_eq!(request.height, None);
        assert_eq!(request.border_width, None);
        assert_eq!(request.stack_mode, Some(StackMode::ABOVE));
    }
}
