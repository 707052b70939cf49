use std::{iter, time::Duration};

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    text::Line,
    widgets::{Block as BlockWidget, BlockExt as _, Widget},
};

use crate::ui::widgets::palette;

/// Numbers shown beside the field.
#[derive(Debug, Clone, Copy)]
pub struct GameStats {
    pub score: u64,
    pub period: Duration,
    pub width: usize,
    pub height: usize,
}

pub struct StatsDisplay<'a> {
    stats: GameStats,
    block: Option<BlockWidget<'a>>,
}

impl<'a> StatsDisplay<'a> {
    pub fn new(stats: GameStats) -> Self {
        Self { stats, block: None }
    }

    pub fn block(self, block: BlockWidget<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    fn size(&self) -> (u16, u16) {
        let rows = u16::try_from(ROWS.len()).unwrap();
        super::outer_size(self.block.as_ref(), 16, rows)
    }

    pub fn width(&self) -> u16 {
        self.size().0
    }

    pub fn height(&self) -> u16 {
        self.size().1
    }
}

#[derive(Clone, Copy)]
enum Row {
    Empty,
    FullLabel(&'static str),
    FullValue(fn(&GameStats) -> String),
    LabelValue(&'static str, fn(&GameStats) -> String),
}

const ROWS: &[Row] = &[
    Row::FullLabel("SCORE:"),
    Row::FullValue(|stats| stats.score.to_string()),
    Row::Empty,
    Row::LabelValue("GRAVITY:", |stats| {
        format!("{}ms", stats.period.as_millis())
    }),
    Row::LabelValue("FIELD:", |stats| {
        format!("{}x{}", stats.width, stats.height)
    }),
];

impl Widget for StatsDisplay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.block.as_ref().render(area, buf);
        let area = self.block.inner_if_some(area);

        let style = palette::PANEL;

        let rows_areas =
            Layout::vertical((0..ROWS.len()).map(|_| Constraint::Length(1))).split(area);

        for (row, area) in iter::zip(ROWS.iter().copied(), rows_areas.iter().copied()) {
            match row {
                Row::Empty => {}
                Row::FullLabel(label) => {
                    Line::styled(label, style).left_aligned().render(area, buf);
                }
                Row::FullValue(value) => {
                    Line::styled(value(&self.stats), style)
                        .right_aligned()
                        .render(area, buf);
                }
                Row::LabelValue(label, value) => {
                    let [label_area, value_area] = area.layout(&Layout::horizontal([
                        Constraint::Fill(1),
                        Constraint::Fill(1),
                    ]));
                    Line::styled(label, style)
                        .left_aligned()
                        .render(label_area, buf);
                    Line::styled(value(&self.stats), style)
                        .right_aligned()
                        .render(value_area, buf);
                }
            }
        }
    }
}
