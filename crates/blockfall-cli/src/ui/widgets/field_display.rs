use std::iter;

use blockfall_engine::{Field, Piece};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    widgets::{Block as BlockWidget, BlockExt, Widget},
};

use crate::ui::widgets::{CellDisplay, FieldCell};

/// The locked cells with the active piece drawn on top.
#[derive(Debug)]
pub struct FieldDisplay<'a> {
    field: &'a Field,
    piece: Option<Piece>,
    block: Option<BlockWidget<'a>>,
}

impl<'a> FieldDisplay<'a> {
    pub fn new(field: &'a Field) -> Self {
        Self {
            field,
            piece: None,
            block: None,
        }
    }

    pub fn piece(self, piece: Piece) -> Self {
        Self {
            piece: Some(piece),
            ..self
        }
    }

    pub fn block(self, block: BlockWidget<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    fn size(&self) -> (u16, u16) {
        let columns = u16::try_from(self.field.width()).unwrap();
        let rows = u16::try_from(self.field.height()).unwrap();
        super::outer_size(
            self.block.as_ref(),
            columns * CellDisplay::width(),
            rows * CellDisplay::height(),
        )
    }

    pub fn width(&self) -> u16 {
        self.size().0
    }

    pub fn height(&self) -> u16 {
        self.size().1
    }

    fn cell(&self, x: i32, y: i32) -> FieldCell {
        match self.piece {
            Some(piece) if piece.occupies(x, y) => FieldCell::Piece(piece.kind()),
            _ if self.field.cell(x, y) == Some(true) => FieldCell::Locked,
            _ => FieldCell::Empty,
        }
    }
}

impl Widget for FieldDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        Widget::render(&self, area, buf);
    }
}

impl Widget for &FieldDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.block.as_ref().render(area, buf);
        let area = self.block.inner_if_some(area);

        let col_constraints =
            (0..self.field.width()).map(|_| Constraint::Length(CellDisplay::width()));
        let row_constraints =
            (0..self.field.height()).map(|_| Constraint::Length(CellDisplay::height()));
        let horizontal = Layout::horizontal(col_constraints).flex(Flex::Center);
        let vertical = Layout::vertical(row_constraints);

        for (y, row_area) in iter::zip(0.., vertical.split(area).iter()) {
            for (x, cell_area) in iter::zip(0.., horizontal.split(*row_area).iter()) {
                CellDisplay::from_cell(self.cell(x, y)).render(*cell_area, buf);
            }
        }
    }
}
