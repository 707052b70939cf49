use ratatui::{layout::Rect, widgets::Block as BlockWidget};

pub use self::{cell_display::*, field_display::*, game_display::*, stats_display::*};

mod cell_display;
mod field_display;
mod game_display;
mod stats_display;

/// Colors of the play screen, looked up by what is being drawn.
pub mod palette {
    use blockfall_engine::PieceKind;
    use ratatui::style::{Color, Style};

    use crate::ui::widgets::{FieldCell, GameStatus};

    const BACKGROUND: Color = Color::Rgb(0, 0, 0);
    const FOREGROUND: Color = Color::Rgb(255, 255, 255);
    const WARNING: Color = Color::Rgb(255, 255, 0);
    const DANGER: Color = Color::Rgb(255, 0, 0);

    /// Text and borders of the field and stats panels.
    pub const PANEL: Style = Style::new().fg(FOREGROUND).bg(BACKGROUND);

    /// A solid block: the symbol, if any, vanishes into the background.
    const fn solid(color: Color) -> Style {
        Style::new().fg(color).bg(color)
    }

    const fn piece_color(kind: PieceKind) -> Color {
        match kind {
            PieceKind::I => Color::Rgb(0, 255, 255),
            PieceKind::O => Color::Rgb(255, 255, 0),
            PieceKind::S => Color::Rgb(0, 255, 0),
            PieceKind::Z => Color::Rgb(255, 0, 0),
            PieceKind::J => Color::Rgb(0, 0, 255),
            PieceKind::L => Color::Rgb(255, 127, 0),
            PieceKind::T => Color::Rgb(255, 0, 255),
        }
    }

    pub const fn cell(cell: FieldCell) -> Style {
        match cell {
            FieldCell::Empty => Style::new().fg(Color::Rgb(64, 64, 64)).bg(BACKGROUND),
            FieldCell::Locked => solid(Color::Rgb(127, 127, 127)),
            FieldCell::Piece(kind) => solid(piece_color(kind)),
        }
    }

    pub const fn border(status: GameStatus) -> Color {
        match status {
            GameStatus::Playing => FOREGROUND,
            GameStatus::Paused => WARNING,
            GameStatus::GameOver => DANGER,
        }
    }

    /// Text and style of the banner drawn over the field, if any.
    pub const fn banner(status: GameStatus) -> Option<(&'static str, Style)> {
        match status {
            GameStatus::Playing => None,
            GameStatus::Paused => Some(("PAUSED", Style::new().fg(BACKGROUND).bg(WARNING))),
            GameStatus::GameOver => {
                Some(("GAME OVER!!", Style::new().fg(FOREGROUND).bg(DANGER)))
            }
        }
    }
}

/// Size of a widget whose content is `width` x `height` once `block` is
/// wrapped around it.
fn outer_size(block: Option<&BlockWidget>, width: u16, height: u16) -> (u16, u16) {
    let Some(block) = block else {
        return (width, height);
    };
    let frame = Rect::new(0, 0, 100, 100);
    let inner = block.inner(frame);
    (
        width + (frame.width - inner.width),
        height + (frame.height - inner.height),
    )
}
