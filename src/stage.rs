//! The stage assignment driving `Staged` scheduling.
//!
//! Every signal belongs to exactly one stage, numbered from `0`. Signals
//! left unassigned default to stage `0`. Stages run in ascending order;
//! every signal in a stage starts before the coordinator waits on any of
//! that stage's results, and a stage only advances to the next once its own
//! policy-driven completion condition is met (see `StagedEngine`).

use std::collections::HashMap;

/// Maps each registered signal's index to its stage number.
pub struct StageTable {
    stage_of: Vec<u32>,
}

impl StageTable {
    /// Starts building a stage table over `len` signals, all defaulting to
    /// stage `0`.
    #[must_use]
    pub fn builder(len: usize) -> StageTableBuilder {
        StageTableBuilder {
            len,
            overrides: HashMap::new(),
        }
    }

    /// The stage number for a given registry index.
    #[must_use]
    pub fn stage_of(&self, index: usize) -> u32 {
        self.stage_of[index]
    }

    /// The distinct stage numbers present, in ascending order.
    #[must_use]
    pub fn stages(&self) -> Vec<u32> {
        let mut stages: Vec<u32> = self.stage_of.iter().copied().collect();
        stages.sort_unstable();
        stages.dedup();
        stages
    }

    /// The registry indices assigned to a given stage, in registration order.
    #[must_use]
    pub fn members_of(&self, stage: u32) -> Vec<usize> {
        self.stage_of
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == stage)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Accumulates explicit stage assignments before a [`StageTable`] is built.
pub struct StageTableBuilder {
    len: usize,
    overrides: HashMap<usize, u32>,
}

impl StageTableBuilder {
    /// Assigns `index` to `stage`, consuming and returning `self` for
    /// chaining. Indices not given an explicit assignment default to `0`.
    #[must_use]
    pub fn assign(mut self, index: usize, stage: u32) -> Self {
        self.overrides.insert(index, stage);
        self
    }

    /// Finalizes the stage table.
    #[must_use]
    pub fn build(self) -> StageTable {
        let mut stage_of = vec![0u32; self.len];
        for (index, stage) in self.overrides {
            stage_of[index] = stage;
        }
        StageTable { stage_of }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_signals_default_to_stage_zero() {
        let table = StageTable::builder(3).assign(1, 2).build();
        assert_eq!(table.stage_of(0), 0);
        assert_eq!(table.stage_of(1), 2);
        assert_eq!(table.stage_of(2), 0);
    }

    #[test]
    fn stages_lists_distinct_values_in_ascending_order() {
        let table = StageTable::builder(4).assign(0, 2).assign(1, 0).assign(2, 1).assign(3, 2).build();
        assert_eq!(table.stages(), vec![0, 1, 2]);
    }

    #[test]
    fn members_of_preserves_registration_order() {
        let table = StageTable::builder(4).assign(0, 1).assign(2, 1).build();
        assert_eq!(table.members_of(1), vec![0, 2]);
        assert_eq!(table.members_of(0), vec![1, 3]);
    }
}
