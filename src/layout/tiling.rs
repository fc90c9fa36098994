use super::TiledClient;
use crate::geometry::Rect;

/// Master column on the left, stack on the right. Each column is filled top
/// to bottom, every client taking the remaining height divided by the number
/// of clients still to place in that column.
///
/// `place` applies the rect for client `index` and returns the outer height
/// the client ended up with, which may differ once size hints are honored.
/// The column offset advances by that height.
pub fn tile<E>(
    area: Rect,
    clients: &[TiledClient],
    master_factor: f32,
    num_master: usize,
    mut place: impl FnMut(usize, Rect) -> Result<i32, E>,
) -> Result<(), E> {
    let count = clients.len();
    if count == 0 {
        return Ok(());
    }

    let master_width = if count > num_master {
        if num_master > 0 {
            (area.width as f32 * master_factor) as i32
        } else {
            0
        }
    } else {
        area.width
    };

    let mut master_y = 0;
    let mut stack_y = 0;

    for (index, client) in clients.iter().enumerate() {
        let border = 2 * client.border_width;

        if index < num_master {
            let slots = (count.min(num_master) - index) as i32;
            let height = (area.height - master_y) / slots;
            let rect = Rect::new(
                area.x,
                area.y + master_y,
                master_width - border,
                height - border,
            );
            let placed = place(index, rect)?;
            if master_y + placed < area.height {
                master_y += placed;
            }
        } else {
            let slots = (count - index) as i32;
            let height = (area.height - stack_y) / slots;
            let rect = Rect::new(
                area.x + master_width,
                area.y + stack_y,
                area.width - master_width - border,
                height - border,
            );
            let placed = place(index, rect)?;
            if stack_y + placed < area.height {
                stack_y += placed;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    fn clients(count: usize, border_width: i32) -> Vec<TiledClient> {
        vec![TiledClient { border_width }; count]
    }

    /// Rects as requested, every client taking exactly what it was given.
    fn requested(area: Rect, clients: &[TiledClient], factor: f32, masters: usize) -> Vec<Rect> {
        let mut rects = Vec::new();
        let result: Result<(), Infallible> = tile(area, clients, factor, masters, |index, rect| {
            rects.push(rect);
            Ok(rect.height + 2 * clients[index].border_width)
        });
        assert!(result.is_ok());
        rects
    }

    #[test]
    fn three_clients_split_master_and_stack() {
        let area = Rect::new(0, 0, 1000, 800);
        let rects = requested(area, &clients(3, 0), 0.5, 1);

        assert_eq!(rects[0], Rect::new(0, 0, 500, 800));
        assert_eq!(rects[1], Rect::new(500, 0, 500, 400));
        assert_eq!(rects[2], Rect::new(500, 400, 500, 400));

        let covered: i32 = rects.iter().map(|r| r.width * r.height).sum();
        assert_eq!(covered, 1000 * 800);
        for (i, a) in rects.iter().enumerate() {
            for b in rects.iter().skip(i + 1) {
                assert_eq!(a.intersection_area(b), 0);
            }
        }
    }

    #[test]
    fn borders_are_subtracted_per_axis() {
        let area = Rect::new(0, 20, 1000, 800);
        let rects = requested(area, &clients(3, 2), 0.5, 1);

        assert_eq!(rects[0], Rect::new(0, 20, 496, 796));
        assert_eq!(rects[1], Rect::new(500, 20, 496, 396));
        assert_eq!(rects[2], Rect::new(500, 420, 496, 396));
    }

    #[test]
    fn single_client_takes_whole_area() {
        let area = Rect::new(10, 10, 640, 480);
        let rects = requested(area, &clients(1, 1), 0.55, 1);
        assert_eq!(rects, vec![Rect::new(10, 10, 638, 478)]);
    }

    #[test]
    fn zero_masters_puts_everything_in_stack() {
        let area = Rect::new(0, 0, 900, 900);
        let rects = requested(area, &clients(3, 0), 0.5, 0);
        for rect in &rects {
            assert_eq!(rect.x, 0);
            assert_eq!(rect.width, 900);
            assert_eq!(rect.height, 300);
        }
    }

    #[test]
    fn odd_remainders_go_to_the_last_client() {
        let area = Rect::new(0, 0, 100, 100);
        let rects = requested(area, &clients(4, 0), 0.5, 1);
        let heights: Vec<i32> = rects[1..].iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![33, 33, 34]);
        assert_eq!(rects[3].bottom(), 100);
    }

    #[test]
    fn rerunning_is_idempotent() {
        let area = Rect::new(0, 0, 1280, 1024);
        let input = clients(5, 1);
        assert_eq!(requested(area, &input, 0.6, 2), requested(area, &input, 0.6, 2));
    }

    #[test]
    fn columns_advance_by_the_height_actually_taken() {
        let area = Rect::new(0, 0, 1000, 900);
        let mut rects = Vec::new();
        // Stack clients refuse to grow past 200 pixels.
        let result: Result<(), Infallible> = tile(area, &clients(4, 0), 0.5, 1, |_, rect| {
            rects.push(rect);
            Ok(rect.height.min(200))
        });
        assert!(result.is_ok());

        assert_eq!(rects[1].y, 0);
        assert_eq!(rects[2].y, 200);
        assert_eq!(rects[3].y, 400);
        // The last client is offered everything below the previous one.
        assert_eq!(rects[3].height, 500);
    }

    #[test]
    fn placement_errors_stop_the_layout() {
        let area = Rect::new(0, 0, 1000, 900);
        let mut placed = 0;
        let result = tile(area, &clients(3, 0), 0.5, 1, |index, _| {
            if index == 1 {
                return Err("gone");
            }
            placed += 1;
            Ok(100)
        });
        assert_eq!(result, Err("gone"));
        assert_eq!(placed, 1);
    }
}
