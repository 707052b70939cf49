use blockfall_engine::PieceKind;
use ratatui::{
    prelude::{Buffer, Rect},
    style::Style,
    widgets::{Paragraph, Widget},
};

use crate::ui::widgets::palette;

/// What occupies one cell of the drawn field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCell {
    Empty,
    Locked,
    Piece(PieceKind),
}

#[derive(Debug)]
pub struct CellDisplay {
    style: Style,
    symbol: &'static str,
}

impl CellDisplay {
    pub const fn new(style: Style, symbol: &'static str) -> Self {
        Self { style, symbol }
    }

    pub const fn width() -> u16 {
        2
    }

    pub const fn height() -> u16 {
        1
    }

    pub fn from_cell(cell: FieldCell) -> Self {
        let symbol = match cell {
            FieldCell::Empty => ".",
            FieldCell::Locked | FieldCell::Piece(_) => "",
        };
        Self::new(palette::cell(cell), symbol)
    }
}

impl Widget for CellDisplay {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        Widget::render(&self, area, buf);
    }
}

impl Widget for &CellDisplay {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        // Paragraph fills the whole area, not only the cells holding the symbol
        Paragraph::new(self.symbol)
            .style(self.style)
            .centered()
            .render(area, buf);
    }
}
