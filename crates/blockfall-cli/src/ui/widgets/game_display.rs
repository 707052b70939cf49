use std::time::Duration;

use blockfall_engine::{SessionSnapshot, TickConfig};
use ratatui::{
    layout::{Constraint, Flex, Layout},
    prelude::{Buffer, Rect},
    text::{Line, Text},
    widgets::{Block, Clear, Padding, Widget},
};

use crate::ui::widgets::{FieldDisplay, GameStats, StatsDisplay, palette};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Paused,
    GameOver,
}

/// Field and score panel, with a banner while paused or after game over.
#[derive(Debug)]
pub struct GameDisplay<'a> {
    snapshot: &'a SessionSnapshot,
    score: u64,
    status: GameStatus,
    period: Duration,
}

impl<'a> GameDisplay<'a> {
    pub fn new(snapshot: &'a SessionSnapshot, score: u64, status: GameStatus) -> Self {
        Self {
            snapshot,
            score,
            status,
            period: TickConfig::default().period,
        }
    }

    pub fn period(self, period: Duration) -> Self {
        Self { period, ..self }
    }

    fn field_display(&self) -> FieldDisplay<'a> {
        FieldDisplay::new(&self.snapshot.field)
            .piece(self.snapshot.piece)
            .block(
                Block::bordered()
                    .border_style(palette::border(self.status))
                    .style(palette::PANEL),
            )
    }

    fn stats_display(&self) -> StatsDisplay<'static> {
        let stats = GameStats {
            score: self.score,
            period: self.period,
            width: self.snapshot.field.width(),
            height: self.snapshot.field.height(),
        };
        StatsDisplay::new(stats).block(
            Block::bordered()
                .title(Line::from("STATS").centered())
                .padding(Padding::horizontal(1))
                .border_style(palette::border(self.status))
                .style(palette::PANEL),
        )
    }

    pub fn height(&self) -> u16 {
        u16::max(
            self.field_display().height(),
            self.stats_display().height(),
        )
    }
}

impl Widget for GameDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        Widget::render(&self, area, buf);
    }
}

impl Widget for &GameDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let field_display = self.field_display();
        let stats_display = self.stats_display();

        let [field_column, stats_column] = Layout::horizontal([
            Constraint::Length(field_display.width()),
            Constraint::Length(stats_display.width()),
        ])
        .flex(Flex::Center)
        .spacing(1)
        .areas(area);

        let [field_area] =
            Layout::vertical([Constraint::Length(field_display.height())]).areas(field_column);
        let [stats_area] =
            Layout::vertical([Constraint::Length(stats_display.height())]).areas(stats_column);

        let field_width = field_display.width();
        field_display.render(field_area, buf);
        stats_display.render(stats_area, buf);

        if let Some((text, style)) = palette::banner(self.status) {
            let block = Block::new().style(style);
            let text = Text::styled(text, style).centered();
            let area = field_area.centered(Constraint::Length(field_width), Constraint::Length(3));
            let inner = block.inner(area);
            Clear.render(area, buf);
            block.render(area, buf);
            text.render(inner.centered_vertically(Constraint::Length(1)), buf);
        }
    }
}
