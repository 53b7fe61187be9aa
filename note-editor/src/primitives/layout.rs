//! Pixel placement of measures.
//!
//! A [`MeasureLayout`] writes `x`, `y`, `width`, height and visibility of
//! every measure for the given viewport. The geometry resolver only reads
//! those fields, so any layout can be plugged in.

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use super::Measure;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSettings {
    #[derivative(Default(value = "300.0"))]
    pub measure_width: f64,
    #[derivative(Default(value = "300.0"))]
    pub measure_height: f64,
    /// Measures stacked in one column of the default layout.
    #[derivative(Default(value = "3"))]
    pub vertical_lane_count: u32,
    #[derivative(Default(value = "8.0"))]
    pub horizontal_padding: f64,
    #[derivative(Default(value = "40.0"))]
    pub vertical_padding: f64,
}

/// Visible area of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Horizontal scroll, positive to the right.
    pub scroll_x: f64,
    /// Playback position in seconds, followed by [`GameMeasureLayout`].
    pub current_time: f64,
}

pub trait MeasureLayout {
    fn name(&self) -> &'static str;
    fn layout(
        &self,
        settings: &LayoutSettings,
        viewport: &Viewport,
        measures: &mut [Measure],
    );
}

/// Columns of measures growing upwards, wrapping into the next column.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMeasureLayout;

impl MeasureLayout for DefaultMeasureLayout {
    fn name(&self) -> &'static str {
        "default"
    }

    fn layout(
        &self,
        settings: &LayoutSettings,
        viewport: &Viewport,
        measures: &mut [Measure],
    ) {
        let lane_count = settings.vertical_lane_count.max(1) as f64;
        let lane_width = settings.measure_width;
        let base_height =
            (viewport.height - settings.vertical_padding * 2.0) / lane_count;

        let mut x = settings.horizontal_padding;
        let mut y = viewport.height - settings.vertical_padding;
        let mut total_height = 0.0;
        for measure in measures.iter_mut() {
            measure.width = lane_width;
            let height = base_height * measure.beat.to01();
            measure.set_height(height, total_height);
            total_height += height;
            y -= height;
            if y < 0.0 {
                x += lane_width + settings.horizontal_padding;
                y = viewport.height - settings.vertical_padding - height;
            }
            measure.x = x;
            measure.y = y;
            measure.is_visible = x + lane_width > viewport.scroll_x
                && x < viewport.scroll_x + viewport.width;
        }
    }
}

/// One column scrolling with the playback position.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameMeasureLayout;

impl MeasureLayout for GameMeasureLayout {
    fn name(&self) -> &'static str {
        "game"
    }

    fn layout(
        &self,
        settings: &LayoutSettings,
        viewport: &Viewport,
        measures: &mut [Measure],
    ) {
        let mut total_height = 0.0;
        for measure in measures.iter_mut() {
            let height = settings.measure_height * measure.beat.to01();
            measure.set_height(height, total_height);
            total_height += height;
        }

        let mut y = viewport.height;
        let mut scroll_offset = 0.0;
        for measure in measures.iter_mut() {
            measure.y = y - measure.height();
            if measure.contains_time(viewport.current_time) {
                let duration = measure.end_time - measure.begin_time;
                let progress =
                    (viewport.current_time - measure.begin_time) / duration;
                scroll_offset =
                    y - viewport.height - measure.height() * progress;
            }
            y -= measure.height();
        }

        for measure in measures.iter_mut() {
            measure.x = viewport.width / 2.0;
            measure.y -= scroll_offset + settings.horizontal_padding;
            measure.width = settings.measure_width;
            measure.is_visible = measure.y + measure.height() > 0.0
                && measure.y < viewport.height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Fraction;

    fn measures(count: usize) -> Vec<Measure> {
        (0..count)
            .map(|i| Measure::new(i, Fraction::new(4, 4)))
            .collect()
    }

    #[test]
    fn default_layout_wraps_columns() {
        let settings = LayoutSettings {
            vertical_lane_count: 2,
            vertical_padding: 0.0,
            horizontal_padding: 10.0,
            measure_width: 100.0,
            ..Default::default()
        };
        let viewport = Viewport {
            width: 400.0,
            height: 200.0,
            ..Default::default()
        };
        let mut ms = measures(3);
        ms[1].beat = Fraction::new(1, 2);
        DefaultMeasureLayout.layout(&settings, &viewport, &mut ms);
        assert_eq!(ms[0].height(), 100.0);
        assert_eq!((ms[0].x, ms[0].y), (10.0, 100.0));
        assert_eq!((ms[1].x, ms[1].y), (10.0, 50.0));
        assert_eq!(ms[1].total_height(), 100.0);
        assert_eq!((ms[2].x, ms[2].y), (120.0, 100.0));
        assert_eq!(ms[2].total_height(), 150.0);
        assert!(ms.iter().all(|m| m.is_visible));
    }

    #[test]
    fn game_layout_follows_time() {
        let settings = LayoutSettings {
            measure_height: 100.0,
            horizontal_padding: 0.0,
            ..Default::default()
        };
        let viewport = Viewport {
            width: 400.0,
            height: 300.0,
            current_time: 3.0,
            ..Default::default()
        };
        let mut ms = measures(4);
        for (i, m) in ms.iter_mut().enumerate() {
            m.begin_time = i as f64 * 2.0;
            m.end_time = (i + 1) as f64 * 2.0;
        }
        GameMeasureLayout.layout(&settings, &viewport, &mut ms);
        // half of measure 1 is below the bottom edge
        assert_eq!(ms[1].y, 250.0);
        assert_eq!(ms[0].y, 350.0);
        assert!(!ms[0].is_visible);
        assert!(ms[1].is_visible);
        assert_eq!(ms[0].x, 200.0);
    }
}
