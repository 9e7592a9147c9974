//! Steering the physical die toward a legal face.
//!
//! The host's physics layer reports faces; the pipeline answers with optional
//! corrective instructions. A correction is requested twice at most per roll:
//! a steer while the die is airborne, and a snap after it lands if the face
//! still misses the legal window.

use crate::context::SlotId;
use crate::coordinator::{DecisionPrompt, ResolutionState};
use crate::pipeline::{RollError, RollListener, RollOutcome, RollPipeline};
use crate::range::{legal_range, select_target};
use crate::resolver::resolve_value;
use crate::sources::{aggregate, EffectSources};
use tracing::debug;

/// Corrective instructions sent to the physics layer.
pub trait PhysicsDriver {
    /// Nudge an airborne die so it lands on `face`.
    fn steer_toward(&mut self, slot: SlotId, face: i32);

    /// Rotate a landed die onto `face`. The layer reports the new face back
    /// through [`RollPipeline::land`].
    fn snap_to(&mut self, slot: SlotId, face: i32);
}

/// What, if anything, a face needs to become legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// The resolved value is already legal.
    NotNeeded,
    /// Move the die to this face.
    SteerTo(i32),
    /// No legal face exists, or the slot has no die. The roll stands as is.
    Impossible,
}

/// Result of reporting a landed face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Landing {
    /// A snap was requested; report the corrected face with another `land`.
    Snapping(i32),
    Resolved(RollOutcome),
}

impl<P: DecisionPrompt, L: RollListener> RollPipeline<P, L> {
    /// Decide whether `raw` needs correcting.
    ///
    /// The candidate is the previewed value, and the target is drawn from the
    /// same legal range that decided a correction was needed.
    pub fn plan_correction<S: EffectSources + ?Sized>(
        &self,
        sources: &S,
        slot: SlotId,
        raw: i32,
    ) -> Correction {
        let Some(stack) = aggregate(sources, slot) else {
            return Correction::Impossible;
        };
        let range = legal_range(&stack);
        let candidate = resolve_value(&stack, raw, &self.context(slot));
        match select_target(candidate, range) {
            None => Correction::Impossible,
            Some(face) if face == candidate => Correction::NotNeeded,
            Some(face) => {
                debug!(%slot, raw, candidate, face, %range, "Correction planned");
                Correction::SteerTo(face)
            }
        }
    }

    /// Report the face an airborne die is heading for; steers if needed.
    pub fn mid_air<S: EffectSources + ?Sized, D: PhysicsDriver + ?Sized>(
        &self,
        sources: &S,
        slot: SlotId,
        projected: i32,
        physics: &mut D,
    ) -> Correction {
        let correction = self.plan_correction(sources, slot, projected);
        if let Correction::SteerTo(face) = correction {
            physics.steer_toward(slot, face);
        }
        correction
    }

    /// Report a landed face.
    ///
    /// The first landing of a roll may request one snap. Whatever face is
    /// reported after that is resolved as-is.
    pub fn land<S: EffectSources + ?Sized, D: PhysicsDriver + ?Sized>(
        &mut self,
        sources: &mut S,
        slot: SlotId,
        raw: i32,
        physics: &mut D,
    ) -> Result<Landing, RollError> {
        if self.resolution_state(slot) == ResolutionState::AwaitingChoice {
            return Err(RollError::AwaitingChoice(slot));
        }
        if !self.snapped.remove(&slot) {
            if let Correction::SteerTo(face) = self.plan_correction(&*sources, slot, raw) {
                if face != raw {
                    self.snapped.insert(slot);
                    physics.snap_to(slot, face);
                    return Ok(Landing::Snapping(face));
                }
            }
        }
        self.resolve(sources, slot, raw).map(Landing::Resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::dice::DieType;
    use crate::effect::{Effect, EffectKind};
    use crate::records::RollRecord;
    use crate::sources::RolledDie;
    use crate::table::RollTable;
    use crate::testing::{RecordingListener, RecordingPhysics, ScriptedPrompt};

    fn pipeline() -> RollPipeline<ScriptedPrompt, RecordingListener> {
        RollPipeline::new(PipelineConfig::new(), ScriptedPrompt::new(), RecordingListener::new())
    }

    fn floored_d6(table: &mut RollTable) -> SlotId {
        table.place(
            RolledDie::new(DieType::D6)
                .with_effect(Effect::new("Floor", EffectKind::MinValue(4)))
                .with_effect(Effect::new("Nothing", EffectKind::Additive(0))),
        )
    }

    #[test]
    fn test_plan_under_roll() {
        let mut table = RollTable::new();
        let slot = floored_d6(&mut table);
        let pipeline = pipeline();
        assert_eq!(pipeline.plan_correction(&table, slot, 2), Correction::SteerTo(4));
        assert_eq!(pipeline.plan_correction(&table, slot, 5), Correction::NotNeeded);
        assert_eq!(pipeline.plan_correction(&table, SlotId::new(), 5), Correction::Impossible);
    }

    #[test]
    fn test_mid_air_steers() {
        let mut table = RollTable::new();
        let slot = floored_d6(&mut table);
        let pipeline = pipeline();
        let mut physics = RecordingPhysics::new();

        pipeline.mid_air(&table, slot, 1, &mut physics);
        pipeline.mid_air(&table, slot, 6, &mut physics);
        assert_eq!(physics.steers, vec![(slot, 4)]);
        assert!(physics.snaps.is_empty());
    }

    #[test]
    fn test_land_snaps_once_then_resolves() {
        let mut table = RollTable::new();
        let slot = floored_d6(&mut table);
        let mut pipeline = pipeline();
        let mut physics = RecordingPhysics::new();

        let landing = pipeline.land(&mut table, slot, 2, &mut physics).unwrap();
        assert_eq!(landing, Landing::Snapping(4));
        assert_eq!(physics.snaps, vec![(slot, 4)]);
        assert_eq!(pipeline.record(slot), None);

        // The physics layer missed again; the second report stands.
        let landing = pipeline.land(&mut table, slot, 3, &mut physics).unwrap();
        assert_eq!(
            landing,
            Landing::Resolved(RollOutcome::Completed(RollRecord::new(3, 3)))
        );
        assert_eq!(physics.snaps.len(), 1);
    }

    #[test]
    fn test_snap_answered_by_direct_resolve() {
        let mut table = RollTable::new();
        let slot = floored_d6(&mut table);
        let mut pipeline = pipeline();
        let mut physics = RecordingPhysics::new();

        assert_eq!(
            pipeline.land(&mut table, slot, 2, &mut physics).unwrap(),
            Landing::Snapping(4)
        );
        pipeline.resolve(&mut table, slot, 4).unwrap();

        // The next roll gets its own snap.
        assert_eq!(
            pipeline.land(&mut table, slot, 1, &mut physics).unwrap(),
            Landing::Snapping(4)
        );
        assert_eq!(physics.snaps, vec![(slot, 4), (slot, 4)]);
    }

    #[test]
    fn test_snap_answered_by_decision() {
        let mut table = RollTable::new();
        let slot = floored_d6(&mut table);
        table.grant_buff(Effect::new("Nudge", EffectKind::Nudge));
        let mut pipeline = pipeline();
        let mut physics = RecordingPhysics::new();

        pipeline.land(&mut table, slot, 2, &mut physics).unwrap();
        let landing = pipeline.land(&mut table, slot, 4, &mut physics).unwrap();
        assert!(matches!(landing, Landing::Resolved(RollOutcome::AwaitingChoice(_))));
        pipeline.submit_choice(slot, 1).unwrap();

        assert_eq!(
            pipeline.land(&mut table, slot, 3, &mut physics).unwrap(),
            Landing::Snapping(4)
        );
    }

    #[test]
    fn test_land_without_correction() {
        let mut table = RollTable::new();
        let slot = table.place(
            RolledDie::new(DieType::D6)
                .with_effect(Effect::new("Floor", EffectKind::MinValue(5)))
                .with_effect(Effect::new("Ceiling", EffectKind::MaxValue(3))),
        );
        let mut pipeline = pipeline();
        let mut physics = RecordingPhysics::new();

        // Empty range: nothing to steer toward, so the raw face is reported.
        let landing = pipeline.land(&mut table, slot, 2, &mut physics).unwrap();
        assert_eq!(
            landing,
            Landing::Resolved(RollOutcome::Completed(RollRecord::new(2, 2)))
        );
        assert!(physics.snaps.is_empty());
    }
}
