//! Legal-range folding and target face selection.

use crate::dice::FaceRange;
use crate::sources::EffectStack;
use tracing::debug;

/// Fold every range-narrowing effect over the die's native interval.
///
/// The result is always a subset of `[1, max_face]`. It may be empty when the
/// modifiers over-constrain the die; callers treat that as "no legal
/// correction possible", not as an error.
pub fn legal_range(stack: &EffectStack<'_>) -> FaceRange {
    let native = stack.die.native_range();
    let range = stack
        .iter()
        .filter(|(_, effect)| effect.narrows_range())
        .fold(native, |range, (origin, effect)| {
            // Intersecting with the incoming window keeps each fold step narrowing.
            let narrowed = effect.kind.narrow(range, native).intersect(range);
            debug!(?origin, effect = %effect.name, from = %range, to = %narrowed, "Range narrowed");
            narrowed
        });
    debug!(die = %stack.die, %range, "Computed legal range");
    range
}

/// Pick the face a candidate value should be corrected to.
///
/// Returns the candidate itself when it is already legal, the nearest legal
/// face otherwise (the smaller face wins a tie), and `None` when the range is
/// empty.
pub fn select_target(candidate: i32, range: FaceRange) -> Option<i32> {
    if range.is_empty() {
        return None;
    }
    if range.contains(candidate) {
        return Some(candidate);
    }
    // min_by_key keeps the first minimum, and faces() ascends.
    range
        .faces()
        .min_by_key(|face| (i64::from(*face) - i64::from(candidate)).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SlotId;
    use crate::dice::DieType;
    use crate::dice::Parity;
    use crate::effect::{Effect, EffectKind};
    use crate::sources::{aggregate, RolledDie};
    use crate::table::RollTable;

    fn range_for(die: DieType, kinds: Vec<EffectKind>) -> FaceRange {
        let mut table = RollTable::new();
        let mut rolled = RolledDie::new(die);
        for kind in kinds {
            rolled = rolled.with_effect(Effect::new("test", kind));
        }
        let slot: SlotId = table.place(rolled);
        legal_range(&aggregate(&table, slot).unwrap())
    }

    #[test]
    fn test_native_when_no_modifiers() {
        assert_eq!(range_for(DieType::D20, vec![]), FaceRange::new(1, 20));
    }

    #[test]
    fn test_min_value_narrows() {
        let range = range_for(DieType::D6, vec![EffectKind::MinValue(4), EffectKind::Additive(0)]);
        assert_eq!(range, FaceRange::new(4, 6));
    }

    #[test]
    fn test_out_of_bounds_modifiers_never_widen() {
        let range = range_for(DieType::D6, vec![EffectKind::MinValue(-3), EffectKind::MaxValue(40)]);
        assert_eq!(range, FaceRange::new(1, 6));
        let range = range_for(DieType::D6, vec![EffectKind::Clamp { min: 0, max: 9 }]);
        assert_eq!(range, FaceRange::new(1, 6));
    }

    #[test]
    fn test_conflicting_clamps_empty() {
        let range = range_for(DieType::D6, vec![EffectKind::MinValue(5), EffectKind::MaxValue(3)]);
        assert!(range.is_empty());
        assert_eq!(range, FaceRange::new(5, 3));
    }

    #[test]
    fn test_parity_and_halving_combine() {
        let range = range_for(
            DieType::D12,
            vec![EffectKind::UpperHalf, EffectKind::Parity(Parity::Odd)],
        );
        assert_eq!(range, FaceRange::with_parity(7, 11, Parity::Odd));

        // The half bound ignores the MaxValue narrowing that came first.
        let range = range_for(DieType::D12, vec![EffectKind::MaxValue(4), EffectKind::LowerHalf]);
        assert_eq!(range, FaceRange::new(1, 4));
    }

    #[test]
    fn test_select_keeps_legal_candidate() {
        assert_eq!(select_target(5, FaceRange::new(1, 6)), Some(5));
    }

    #[test]
    fn test_select_nearest_face() {
        assert_eq!(select_target(2, FaceRange::new(4, 6)), Some(4));
        assert_eq!(select_target(9, FaceRange::new(4, 6)), Some(6));
    }

    #[test]
    fn test_select_tie_prefers_smaller_face() {
        let range = range_for(
            DieType::D6,
            vec![EffectKind::MinValue(4), EffectKind::Parity(Parity::Even)],
        );
        assert_eq!(range.faces().collect::<Vec<_>>(), vec![4, 6]);
        assert_eq!(select_target(5, range), Some(4));
    }

    #[test]
    fn test_select_respects_parity() {
        let odd = FaceRange::with_parity(1, 6, Parity::Odd);
        assert_eq!(select_target(4, odd), Some(3));
        assert_eq!(select_target(6, odd), Some(5));
        assert_eq!(select_target(3, odd), Some(3));
    }

    #[test]
    fn test_select_empty_range() {
        assert_eq!(select_target(2, FaceRange::new(5, 3)), None);
    }
}
