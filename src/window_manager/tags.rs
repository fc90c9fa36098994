use super::WindowManager;
use crate::backend::{Backend, WmResult};
use crate::client::TagMask;

impl<B: Backend> WindowManager<B> {
    /// Bit for the tag at `index`, if such a tag is configured.
    pub(crate) fn tag_bit(&self, index: i32) -> Option<TagMask> {
        usize::try_from(index)
            .ok()
            .filter(|&index| index < self.config.tags.len())
            .map(|index| 1 << index)
    }

    /// Shows the tags in `mask`. A zero mask swaps back to the previous view.
    pub fn view(&mut self, mask: TagMask) -> WmResult<()> {
        let mask = mask & self.tag_mask();
        let index = self.selected_monitor;
        let Some(monitor) = self.monitors.get_mut(index) else {
            return Ok(());
        };
        if mask == monitor.get_selected_tag() {
            return Ok(());
        }

        monitor.selected_tags_index ^= 1;
        if mask != 0 {
            monitor.tagset[monitor.selected_tags_index] = mask;
        }

        self.focus(None)?;
        self.arrange(Some(index))
    }

    pub fn toggle_view(&mut self, mask: TagMask) -> WmResult<()> {
        let mask = mask & self.tag_mask();
        let index = self.selected_monitor;
        let Some(monitor) = self.monitors.get_mut(index) else {
            return Ok(());
        };
        let tags = monitor.get_selected_tag() ^ mask;
        if tags == 0 {
            return Ok(());
        }

        let slot = monitor.selected_tags_index;
        monitor.tagset[slot] = tags;
        self.focus(None)?;
        self.arrange(Some(index))
    }

    /// Retags the selected client.
    pub fn tag(&mut self, mask: TagMask) -> WmResult<()> {
        let mask = mask & self.tag_mask();
        if mask == 0 {
            return Ok(());
        }
        let Some(window) = self.selected_client() else {
            return Ok(());
        };
        if let Some(client) = self.clients.get_mut(&window) {
            client.tags = mask;
        }
        self.focus(None)?;
        self.arrange(Some(self.selected_monitor))
    }

    pub fn toggle_tag(&mut self, mask: TagMask) -> WmResult<()> {
        let Some(window) = self.selected_client() else {
            return Ok(());
        };
        let mask = mask & self.tag_mask();
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        let tags = client.tags ^ mask;
        if tags == 0 {
            return Ok(());
        }

        client.tags = tags;
        self.focus(None)?;
        self.arrange(Some(self.selected_monitor))
    }

    /// Runs `view` on every monitor, ending where it started.
    pub fn view_all_monitors(&mut self, mask: TagMask) -> WmResult<()> {
        for _ in 0..self.monitors.len() {
            self.focus_monitor(1)?;
            self.view(mask)?;
        }
        Ok(())
    }

    pub fn toggle_view_all_monitors(&mut self, mask: TagMask) -> WmResult<()> {
        for _ in 0..self.monitors.len() {
            self.focus_monitor(1)?;
            self.toggle_view(mask)?;
        }
        Ok(())
    }

    /// Restores the configured master settings and default view on every
    /// monitor.
    pub fn reset_view(&mut self) -> WmResult<()> {
        let reset_tags = self.config.reset_tags;
        for _ in 0..self.monitors.len() {
            self.focus_monitor(1)?;
            let index = self.selected_monitor;
            let monitor = &mut self.monitors[index];
            monitor.master_factor = self.config.master_factor;
            monitor.num_master = self.config.num_master;
            self.view(reset_tags)?;
            self.arrange(Some(index))?;
        }
        Ok(())
    }
}
