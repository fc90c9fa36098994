use super::TiledClient;
use crate::geometry::Rect;

pub fn monocle(area: Rect, clients: &[TiledClient]) -> Vec<Rect> {
    clients
        .iter()
        .map(|client| {
            Rect::new(
                area.x,
                area.y,
                area.width - 2 * client.border_width,
                area.height - 2 * client.border_width,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_client_gets_the_full_area() {
        let area = Rect::new(0, 18, 1920, 1062);
        let clients = [TiledClient { border_width: 3 }; 4];
        let rects = monocle(area, &clients);
        assert_eq!(rects.len(), 4);
        assert!(rects.iter().all(|r| *r == Rect::new(0, 18, 1914, 1056)));
    }
}
