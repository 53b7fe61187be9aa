//! Main "ruler" converting musical positions into seconds.
//!
//! Positions are first converted into quarter beats from the chart start,
//! using the beat of every measure. Tempo events split the beat axis into
//! pieces of constant BPM; a stop freezes the position for some beats of
//! the current tempo.
//!
//! # Example
//!
//! ```
//! use note_editor::primitives::{
//!     time_calculator::{TempoChange, TempoEvent, TimeCalculator},
//!     ChartPosition, Fraction, Measure,
//! };
//!
//! let measures: Vec<Measure> =
//!     (0..4).map(|i| Measure::new(i, Fraction::new(4, 4))).collect();
//! let at = |index, change| {
//!     TempoEvent::new(ChartPosition::measure_start(index), change)
//! };
//! let events = vec![
//!     at(0, TempoChange::Bpm(120.0)),
//!     at(1, TempoChange::Stop(4.0)),
//!     at(2, TempoChange::Bpm(240.0)),
//! ];
//! let calculator = TimeCalculator::new(&measures, &events);
//! assert_eq!(calculator.get_time(1.0), 2.0);
//! assert_eq!(calculator.get_time(1.5), 5.0);
//! assert_eq!(calculator.get_time(3.0), 7.0);
//! ```

use std::cmp::Ordering;

use itertools::Itertools;

use super::{
    measure::{sort_measure, MeasureObject, QUARTERS_PER_WHOLE},
    ChartPosition, Fraction, Measure,
};

/// Tempo of a chart without any BPM event at its start.
pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempoChange {
    Bpm(f64),
    /// Pause measured in quarter beats of the current tempo.
    Stop(f64),
}

impl TempoChange {
    /// BPM changes go before stops at the same position.
    fn order(&self) -> u8 {
        match self {
            Self::Bpm(_) => 0,
            Self::Stop(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEvent {
    pub position: ChartPosition,
    pub change: TempoChange,
}

impl TempoEvent {
    pub fn new(position: ChartPosition, change: TempoChange) -> Self {
        Self { position, change }
    }
}

/// Every distinct position holding tempo events.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimingPoint {
    value: f64,
    beats: f64,
    /// Time when the position is reached.
    time_at: f64,
    /// Time when the position is left, after stops.
    time_after: f64,
    bpm_after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeCalculator {
    /// Quarter beats before every measure, and after the last one.
    measure_beats: Vec<f64>,
    points: Vec<TimingPoint>,
}

impl TimeCalculator {
    /// Build from measures (in index order) and tempo events in any order.
    ///
    /// Non-positive or non-finite BPM values are skipped, negative stops
    /// count as zero.
    pub fn new(measures: &[Measure], events: &[TempoEvent]) -> Self {
        let mut measure_beats = Vec::with_capacity(measures.len() + 1);
        let mut beats = 0.0;
        measure_beats.push(beats);
        for measure in measures {
            beats += measure.beats().max(0.0);
            measure_beats.push(beats);
        }
        let mut calculator = Self {
            measure_beats,
            points: Vec::new(),
        };

        let groups = events
            .iter()
            .sorted_by(|a, b| sort_tempo_events(a, b))
            .group_by(|e| e.position);

        let mut time = 0.0;
        let mut bpm = DEFAULT_BPM;
        let mut last_beats = 0.0;
        for (position, group) in &groups {
            let value = position.measure_value().max(0.0);
            let beats = calculator.beats_at(value);
            time += (beats - last_beats) * 60.0 / bpm;
            let time_at = time;
            for event in group {
                match event.change {
                    TempoChange::Bpm(value)
                        if value.is_finite() && value > 0.0 =>
                    {
                        bpm = value
                    }
                    TempoChange::Bpm(value) => log::warn!(
                        "ignoring invalid BPM {} at {:?}",
                        value,
                        position
                    ),
                    TempoChange::Stop(value) if value.is_finite() => {
                        time += value.max(0.0) * 60.0 / bpm
                    }
                    TempoChange::Stop(value) => log::warn!(
                        "ignoring invalid stop {} at {:?}",
                        value,
                        position
                    ),
                }
            }
            calculator.points.push(TimingPoint {
                value,
                beats,
                time_at,
                time_after: time,
                bpm_after: bpm,
            });
            last_beats = beats;
        }
        calculator
    }

    /// Quarter beats from the chart start to `value`.
    ///
    /// Past the last measure the measures are assumed to be `4/4`.
    pub fn beats_at(&self, value: f64) -> f64 {
        let value = value.max(0.0);
        let last = self.measure_beats.len() - 1;
        let index = value.floor() as usize;
        if index >= last {
            return self.measure_beats[last]
                + (value - last as f64) * QUARTERS_PER_WHOLE;
        }
        let start = self.measure_beats[index];
        let length = self.measure_beats[index + 1] - start;
        start + (value - index as f64) * length
    }

    /// Inverse of [`Self::beats_at`].
    pub fn value_at_beats(&self, beats: f64) -> f64 {
        let beats = beats.max(0.0);
        let last = self.measure_beats.len() - 1;
        if beats >= self.measure_beats[last] {
            return last as f64
                + (beats - self.measure_beats[last]) / QUARTERS_PER_WHOLE;
        }
        let index = self.measure_beats.partition_point(|b| *b <= beats) - 1;
        let start = self.measure_beats[index];
        let length = self.measure_beats[index + 1] - start;
        match length > 0.0 {
            true => index as f64 + (beats - start) / length,
            false => index as f64,
        }
    }

    /// Point with the greatest `beats` not after the given ones.
    fn point_before(&self, beats: f64) -> Option<&TimingPoint> {
        let index = self.points.partition_point(|p| p.beats <= beats);
        index.checked_sub(1).map(|i| &self.points[i])
    }

    /// Seconds from the chart start to `value`.
    ///
    /// At a stop position the time of arrival is returned.
    pub fn get_time(&self, value: f64) -> f64 {
        let beats = self.beats_at(value);
        match self.point_before(beats) {
            None => beats * 60.0 / DEFAULT_BPM,
            Some(point) if point.beats == beats => point.time_at,
            Some(point) => {
                let beats = beats - point.beats;
                point.time_after + beats * 60.0 / point.bpm_after
            }
        }
    }

    pub fn get_time_at(
        &self,
        measure_index: usize,
        measure_position: Fraction,
    ) -> f64 {
        let position = ChartPosition::new(measure_index, measure_position);
        self.get_time(position.measure_value())
    }

    /// Position reached at `time`. During a stop it is the stop position.
    pub fn get_measure_value(&self, time: f64) -> f64 {
        let time = time.max(0.0);
        let index = self.points.partition_point(|p| p.time_at <= time);
        let beats = match index.checked_sub(1).map(|i| &self.points[i]) {
            None => time * DEFAULT_BPM / 60.0,
            Some(point) if time <= point.time_after => {
                return point.value;
            }
            Some(point) => {
                let time = time - point.time_after;
                point.beats + time * point.bpm_after / 60.0
            }
        };
        self.value_at_beats(beats)
    }

    /// Tempo in effect right after `value`.
    pub fn bpm_at(&self, value: f64) -> f64 {
        self.point_before(self.beats_at(value))
            .map(|p| p.bpm_after)
            .unwrap_or(DEFAULT_BPM)
    }

    /// Fill `begin_time` and `end_time` of every measure.
    pub fn update_measure_times(&self, measures: &mut [Measure]) {
        for measure in measures.iter_mut() {
            let index = measure.index as f64;
            measure.begin_time = self.get_time(index);
            measure.end_time = self.get_time(index + 1.0);
        }
    }
}

/// Order tempo events the way the calculator applies them.
pub fn sort_tempo_events(a: &TempoEvent, b: &TempoEvent) -> Ordering {
    sort_measure(&a.position, &b.position)
        .then_with(|| a.change.order().cmp(&b.change.order()))
}
