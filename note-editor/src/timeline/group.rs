//! Moving several objects at once without losing their spacing.
//!
//! All positions are expressed in ticks of the least common denominator,
//! so a move is an integer offset.
//!
//! ```
//! use note_editor::primitives::{ChartPosition, Fraction};
//! use note_editor::timeline::group::MeasureObjectGroup;
//!
//! let group = MeasureObjectGroup::new(vec![
//!     ("a".to_string(), ChartPosition::new(1, Fraction::new(1, 3))),
//!     ("b".to_string(), ChartPosition::new(1, Fraction::new(3, 4))),
//! ]);
//! let moved = group.move_to(ChartPosition::new(2, Fraction::new(5, 6)));
//! assert_eq!(moved[0].1, ChartPosition::new(2, Fraction::new(5, 6)));
//! assert_eq!(moved[1].1, ChartPosition::new(3, Fraction::new(1, 4)));
//! ```

use crate::{
    model::Guid,
    primitives::{lcm_denominator, ChartPosition, Fraction},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureObjectGroup {
    denominator: i64,
    ticks: Vec<(Guid, i64)>,
}

impl MeasureObjectGroup {
    /// Unset positions count as measure starts.
    pub fn new(members: Vec<(Guid, ChartPosition)>) -> Self {
        let members = members
            .into_iter()
            .map(|(guid, position)| (guid, position_terms(&position)))
            .collect::<Vec<_>>();
        let denominator = members
            .iter()
            .map(|(_, (_, _, denominator))| *denominator)
            .fold(1, lcm_denominator);
        let ticks = members
            .into_iter()
            .map(|(guid, (index, numerator, position_denominator))| {
                let tick = index * denominator
                    + numerator * (denominator / position_denominator);
                (guid, tick)
            })
            .collect();
        Self { denominator, ticks }
    }

    /// Ticks per measure.
    pub fn lcm_denominator(&self) -> i64 {
        self.denominator
    }

    pub fn min_tick(&self) -> Option<i64> {
        self.ticks.iter().map(|(_, tick)| *tick).min()
    }

    pub fn max_tick(&self) -> Option<i64> {
        self.ticks.iter().map(|(_, tick)| *tick).max()
    }

    /// New positions with the earliest member placed at `target`.
    pub fn move_to(
        &self,
        target: ChartPosition,
    ) -> Vec<(Guid, ChartPosition)> {
        let Some(min_tick) = self.min_tick() else {
            return Vec::new();
        };
        let (index, numerator, target_denominator) = position_terms(&target);
        let denominator =
            lcm_denominator(self.denominator, target_denominator);
        let scale = denominator / self.denominator;
        let offset = index * denominator
            + numerator * (denominator / target_denominator)
            - min_tick * scale;
        self.ticks
            .iter()
            .map(|(guid, tick)| {
                // never below the target tick
                let tick = tick * scale + offset;
                let measure_index = tick.div_euclid(denominator) as usize;
                let position =
                    Fraction::new(tick.rem_euclid(denominator), denominator)
                        .reduced();
                (guid.clone(), ChartPosition::new(measure_index, position))
            })
            .collect()
    }
}

/// Measure index, numerator and positive denominator of a position.
fn position_terms(position: &ChartPosition) -> (i64, i64, i64) {
    let fraction = match position.measure_position.is_none() {
        true => Fraction::new(0, 1),
        false => position.measure_position.reduced(),
    };
    (
        position.measure_index as i64,
        fraction.numerator,
        fraction.denominator,
    )
}
