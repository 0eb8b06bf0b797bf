use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Keyboard block height: four key rows plus borders.
pub const KEYBOARD_HEIGHT: u16 = 7;

pub struct AppLayout {
    pub header: Rect,
    pub field: Rect,
    pub screen: Rect,
    pub keyboard: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect, footer_lines: u16) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
                Constraint::Length(KEYBOARD_HEIGHT),
                Constraint::Length(footer_lines.max(1)),
            ])
            .split(area);

        Self {
            header: vertical[0],
            screen: vertical[1],
            field: vertical[2],
            keyboard: vertical[3],
            footer: vertical[4],
        }
    }
}

/// Packs hints into as few lines as fit in `width`.
pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    if width == 0 || hints.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<String> = Vec::new();
    let mut current = String::from(" ");
    for hint in hints.iter().filter(|h| !h.is_empty()) {
        let candidate = if current.trim().is_empty() {
            format!("{current}{hint}")
        } else {
            format!("{current}  {hint}")
        };
        if candidate.chars().count() <= width || current.trim().is_empty() {
            current = candidate;
        } else {
            out.push(current);
            current = format!(" {hint}");
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_reserves_keyboard_and_field() {
        let layout = AppLayout::new(Rect::new(0, 0, 80, 24), 1);
        assert_eq!(layout.header.height, 3);
        assert_eq!(layout.field.height, 3);
        assert_eq!(layout.keyboard.height, KEYBOARD_HEIGHT);
        assert_eq!(layout.footer.height, 1);
        assert_eq!(layout.screen.height, 24 - 3 - 3 - KEYBOARD_HEIGHT - 1);
        assert!(layout.field.y > layout.screen.y);
    }

    #[test]
    fn test_pack_hint_lines_wraps() {
        let lines = pack_hint_lines(&["[F1-F7] phase", "[F8] player", "[Esc] back"], 30);
        assert_eq!(lines, vec![" [F1-F7] phase  [F8] player", " [Esc] back"]);
    }

    #[test]
    fn test_pack_hint_lines_empty() {
        assert!(pack_hint_lines(&[], 40).is_empty());
        assert!(pack_hint_lines(&["a"], 0).is_empty());
    }
}
