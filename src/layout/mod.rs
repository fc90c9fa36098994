pub mod monocle;
pub mod tiling;

use std::str::FromStr;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::geometry::Rect;

/// One client handed to a layout: only its border matters for the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiledClient {
    pub border_width: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    Tiling,
    Floating,
    Monocle,
}

impl LayoutType {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Tiling => "[]=",
            Self::Floating => "><>",
            Self::Monocle => "[M]",
        }
    }

    /// Floating has no arrange step; every other layout positions tiled clients.
    pub fn is_tiling(&self) -> bool {
        !matches!(self, Self::Floating)
    }

    /// Symbol shown in the bar once the layout has run over `tiled_count` clients.
    pub fn display_symbol(&self, tiled_count: usize) -> String {
        match self {
            Self::Monocle if tiled_count > 0 => format!("[{}]", tiled_count),
            _ => self.symbol().to_string(),
        }
    }

    /// Hands each tiled client its rect through `place`, in the order given.
    /// `place` returns the outer height the client took. Floating places
    /// nothing so clients keep whatever they were last given.
    pub fn arrange<E>(
        &self,
        area: Rect,
        clients: &[TiledClient],
        master_factor: f32,
        num_master: usize,
        mut place: impl FnMut(usize, Rect) -> Result<i32, E>,
    ) -> Result<(), E> {
        match self {
            Self::Tiling => tiling::tile(area, clients, master_factor, num_master, place),
            Self::Monocle => {
                for (index, rect) in monocle::monocle(area, clients).into_iter().enumerate() {
                    place(index, rect)?;
                }
                Ok(())
            }
            Self::Floating => Ok(()),
        }
    }
}

impl FromStr for LayoutType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "tiling" | "tile" | "[]=" => Ok(Self::Tiling),
            "floating" | "normie" | "><>" => Ok(Self::Floating),
            "monocle" | "[m]" => Ok(Self::Monocle),
            _ => Err(ConfigError::UnknownLayout(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_symbols() {
        assert_eq!("tile".parse::<LayoutType>().ok(), Some(LayoutType::Tiling));
        assert_eq!("><>".parse::<LayoutType>().ok(), Some(LayoutType::Floating));
        assert_eq!("Monocle".parse::<LayoutType>().ok(), Some(LayoutType::Monocle));
        assert!("spiral".parse::<LayoutType>().is_err());
    }

    #[test]
    fn floating_leaves_geometry_alone() {
        let clients = [TiledClient { border_width: 1 }; 3];
        let mut placed = 0;
        let result: Result<(), ()> =
            LayoutType::Floating.arrange(Rect::new(0, 0, 100, 100), &clients, 0.5, 1, |_, _| {
                placed += 1;
                Ok(0)
            });
        assert!(result.is_ok());
        assert_eq!(placed, 0);
        assert!(!LayoutType::Floating.is_tiling());
    }

    #[test]
    fn monocle_symbol_counts_tiled_clients() {
        assert_eq!(LayoutType::Monocle.display_symbol(0), "[M]");
        assert_eq!(LayoutType::Monocle.display_symbol(4), "[4]");
        assert_eq!(LayoutType::Tiling.display_symbol(4), "[]=");
    }
}
