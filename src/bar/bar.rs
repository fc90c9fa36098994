use super::BarState;
use super::font::Font;
use crate::ColorScheme;
use crate::errors::X11Error;
use crate::geometry::Rect;
use x11rb::COPY_DEPTH_FROM_PARENT;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;

pub struct Bar {
    window: Window,
    pixmap: Pixmap,
    graphics_context: Gcontext,
    width: u16,
    height: u16,
    depth: u8,
}

impl Bar {
    pub fn new(
        connection: &impl Connection,
        screen: &Screen,
        font: &Font,
        scheme: ColorScheme,
        rect: Rect,
    ) -> Result<Self, X11Error> {
        let window = connection.generate_id()?;
        let pixmap = connection.generate_id()?;
        let graphics_context = connection.generate_id()?;

        let width = rect.width.max(1) as u16;
        let height = rect.height.max(1) as u16;

        connection.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            screen.root,
            rect.x as i16,
            rect.y as i16,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            screen.root_visual,
            &CreateWindowAux::new()
                .background_pixel(scheme.background)
                .event_mask(EventMask::EXPOSURE | EventMask::BUTTON_PRESS)
                .override_redirect(1),
        )?;

        connection.create_pixmap(screen.root_depth, pixmap, window, width, height)?;

        connection.create_gc(
            graphics_context,
            pixmap,
            &CreateGCAux::new()
                .foreground(scheme.foreground)
                .background(scheme.background)
                .font(font.id()),
        )?;

        connection.map_window(window)?;

        Ok(Bar {
            window,
            pixmap,
            graphics_context,
            width,
            height,
            depth: screen.root_depth,
        })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn move_resize(&mut self, connection: &impl Connection, rect: Rect) -> Result<(), X11Error> {
        let width = rect.width.max(1) as u16;
        let height = rect.height.max(1) as u16;

        connection.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(width as u32)
                .height(height as u32),
        )?;

        if width != self.width || height != self.height {
            connection.free_pixmap(self.pixmap)?;
            connection.create_pixmap(self.depth, self.pixmap, self.window, width, height)?;
            self.width = width;
            self.height = height;
        }
        Ok(())
    }

    pub fn destroy(&self, connection: &impl Connection) -> Result<(), X11Error> {
        connection.free_gc(self.graphics_context)?;
        connection.free_pixmap(self.pixmap)?;
        connection.unmap_window(self.window)?;
        connection.destroy_window(self.window)?;
        Ok(())
    }

    /// Tags, layout symbol, monitor mark, then title and status, left to right.
    /// Status goes first so tags may overdraw it on narrow bars.
    pub fn draw(
        &self,
        connection: &impl Connection,
        font: &Font,
        normal: ColorScheme,
        selected: ColorScheme,
        state: &BarState,
    ) -> Result<(), X11Error> {
        let padding = font.height();
        let text_width = |text: &str| font.text_width(text) + padding;
        let height = self.height as i32;
        let box_size = font.height() / 9;
        let box_width = font.height() / 6 + 2;

        self.fill(connection, normal.background, 0, 0, self.width as i32, height)?;

        let mut status_width = 0;
        if let Some(status) = &state.status {
            status_width = font.text_width(status) + 2;
            let x = state.width - status_width;
            self.text(connection, font, normal, x, status_width, 0, status)?;
        }

        let mut x = 0;
        for tag in &state.tags {
            let width = text_width(&tag.name);
            let mut scheme = if tag.selected { selected } else { normal };
            if tag.urgent {
                scheme = invert(scheme);
            }
            self.text(connection, font, scheme, x, width, padding / 2, &tag.name)?;
            if tag.occupied {
                let color = scheme.foreground;
                if tag.has_focused {
                    self.fill(connection, color, x + box_size, box_size, box_width, box_width)?;
                } else {
                    self.outline(connection, color, x + box_size, box_size, box_width, box_width)?;
                }
            }
            x += width;
        }

        for text in [&state.layout_symbol, &state.monitor_mark] {
            let width = text_width(text);
            self.text(connection, font, normal, x, width, padding / 2, text)?;
            x += width;
        }

        let remaining = state.width - status_width - x;
        if remaining > height {
            match &state.title {
                Some(title) => {
                    let scheme = if state.is_selected_monitor { selected } else { normal };
                    self.text(connection, font, scheme, x, remaining, padding / 2, title)?;
                    if state.title_floating {
                        let color = scheme.foreground;
                        if state.title_fixed {
                            self.fill(connection, color, x + box_size, box_size, box_width, box_width)?;
                        } else {
                            self.outline(connection, color, x + box_size, box_size, box_width, box_width)?;
                        }
                    }
                }
                None => self.fill(connection, normal.background, x, 0, remaining, height)?,
            }
        }

        connection.copy_area(
            self.pixmap,
            self.window,
            self.graphics_context,
            0,
            0,
            0,
            0,
            self.width,
            self.height,
        )?;
        connection.flush()?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn text(
        &self,
        connection: &impl Connection,
        font: &Font,
        scheme: ColorScheme,
        x: i32,
        width: i32,
        left_pad: i32,
        text: &str,
    ) -> Result<(), X11Error> {
        self.fill(connection, scheme.background, x, 0, width, self.height as i32)?;
        connection.change_gc(
            self.graphics_context,
            &ChangeGCAux::new()
                .foreground(scheme.foreground)
                .background(scheme.background),
        )?;
        let bytes = font.truncate(text, width - left_pad);
        let baseline = (self.height as i32 - font.height()) / 2 + font.ascent();
        connection.image_text8(
            self.pixmap,
            self.graphics_context,
            (x + left_pad) as i16,
            baseline as i16,
            &bytes,
        )?;
        Ok(())
    }

    fn fill(
        &self,
        connection: &impl Connection,
        color: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), X11Error> {
        if width <= 0 || height <= 0 {
            return Ok(());
        }
        connection.change_gc(self.graphics_context, &ChangeGCAux::new().foreground(color))?;
        connection.poly_fill_rectangle(
            self.pixmap,
            self.graphics_context,
            &[Rectangle {
                x: x as i16,
                y: y as i16,
                width: width as u16,
                height: height as u16,
            }],
        )?;
        Ok(())
    }

    fn outline(
        &self,
        connection: &impl Connection,
        color: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), X11Error> {
        connection.change_gc(self.graphics_context, &ChangeGCAux::new().foreground(color))?;
        connection.poly_rectangle(
            self.pixmap,
            self.graphics_context,
            &[Rectangle {
                x: x as i16,
                y: y as i16,
                width: width.max(1) as u16,
                height: height.max(1) as u16,
            }],
        )?;
        Ok(())
    }
}

fn invert(scheme: ColorScheme) -> ColorScheme {
    ColorScheme {
        foreground: scheme.background,
        background: scheme.foreground,
    }
}
