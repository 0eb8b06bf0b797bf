use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Clear, Widget};

use crate::keyboard::display::{key_label, key_width_units};
use crate::keyboard::layout::{GlyphSet, Key};
use crate::keyboard::popover::{AnchorMeasure, AnchorRect, PopoverState, Visibility};

/// Terminal cells per key width unit.
const UNIT: u16 = 5;

/// Where each key was drawn on the last frame. Shared between the renderer
/// and the engine's anchor measurement.
#[derive(Clone, Debug, Default)]
pub struct KeyRects(Rc<RefCell<HashMap<Key, AnchorRect>>>);

impl KeyRects {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, key: Key, rect: Rect) {
        self.0.borrow_mut().insert(
            key,
            AnchorRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            },
        );
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl AnchorMeasure for KeyRects {
    fn measure(&self, key: Key) -> Option<AnchorRect> {
        self.0.borrow().get(&key).copied()
    }
}

pub struct KeyboardView<'a> {
    pub glyphs: &'a GlyphSet,
    pub pressed: &'a [Key],
    pub disabled: bool,
    pub rects: &'a KeyRects,
}

impl<'a> KeyboardView<'a> {
    pub fn new(glyphs: &'a GlyphSet, pressed: &'a [Key], disabled: bool, rects: &'a KeyRects) -> Self {
        Self {
            glyphs,
            pressed,
            disabled,
            rects,
        }
    }
}

impl Widget for KeyboardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if self.disabled {
            Color::DarkGray
        } else {
            Color::Cyan
        };
        let block = Block::bordered()
            .title(" Keyboard ")
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        block.render(area, buf);

        self.rects.clear();
        let rows = self.glyphs.rows();
        if inner.height < rows.len() as u16 {
            return;
        }

        for (row_idx, row) in rows.iter().enumerate() {
            let y = inner.y + row_idx as u16;
            let row_width: u16 = row.iter().map(|&k| key_width_units(k) * UNIT).sum();
            let mut x = inner.x + inner.width.saturating_sub(row_width) / 2;

            for &key in row {
                let width = key_width_units(key) * UNIT;
                if x + width > inner.x + inner.width {
                    break;
                }

                let style = if self.disabled {
                    Style::default().fg(Color::DarkGray)
                } else if self.pressed.contains(&key) {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else if self.glyphs.alternates_for(key).is_some() {
                    Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED)
                } else {
                    Style::default().fg(Color::White)
                };

                let label = key_label(key, &self.glyphs.locale);
                let inner_width = usize::from(width.saturating_sub(2));
                let display = format!("[{label:^inner_width$}]");
                buf.set_string(x, y, &display, style);
                self.rects.record(key, Rect::new(x, y, width, 1));
                x += width;
            }
        }
    }
}

/// Alternates overlay drawn above its anchor key, numbered for selection.
pub struct PopoverView<'a> {
    pub state: &'a PopoverState,
    pub progress: f32,
}

impl<'a> PopoverView<'a> {
    pub fn new(state: &'a PopoverState, progress: f32) -> Self {
        Self { state, progress }
    }

    /// Box for the popover inside `bounds`, above the anchor when it fits.
    pub fn placement(&self, bounds: Rect) -> Rect {
        let entries: u16 = self.state.alternatives.len() as u16;
        let width = (entries * 4 + 2).min(bounds.width);
        let height = 3.min(bounds.height);
        let anchor = self.state.anchor_rect;

        let max_x = bounds.x + bounds.width.saturating_sub(width);
        let x = anchor.x.clamp(bounds.x, max_x.max(bounds.x));
        let y = if anchor.y >= bounds.y + height {
            anchor.y - height
        } else {
            (anchor.y + anchor.height).min(bounds.y + bounds.height.saturating_sub(height))
        };
        Rect::new(x, y, width, height)
    }
}

impl Widget for PopoverView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut style = Style::default().fg(Color::White).bg(Color::Black);
        if self.state.visibility() != Visibility::Open || self.progress < 1.0 {
            style = style.add_modifier(Modifier::DIM);
        }

        let rect = self.placement(area);
        Clear.render(rect, buf);
        let block = Block::bordered()
            .border_style(style.fg(Color::Yellow))
            .style(style);
        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height == 0 {
            return;
        }

        for (idx, glyph) in self.state.alternatives.iter().enumerate().take(9) {
            let x = inner.x + idx as u16 * 4;
            if x + 3 > inner.x + inner.width {
                break;
            }
            buf.set_string(x, inner.y, format!("{}:{glyph}", idx + 1), style);
        }
    }
}
