use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::{AgentId, TreatmentMonth};

type MonthKey = (AgentId, TreatmentMonth);

/// Mutual exclusion per (agent, treatment month). Approvals and recalculations for the same
/// agent-month run one at a time; unrelated agent-months proceed concurrently.
#[derive(Debug, Default)]
pub struct AgentMonthLocks {
    slots: Mutex<HashMap<MonthKey, Arc<Mutex<()>>>>,
}

impl AgentMonthLocks {
    /// Run `work` while holding the lock of every listed month for `agent`. Months are
    /// locked in sorted order so overlapping callers cannot deadlock.
    pub fn run_exclusive<R, F>(&self, agent: &AgentId, months: &[TreatmentMonth], work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mut months = months.to_vec();
        months.sort();
        months.dedup();

        let slots: Vec<Arc<Mutex<()>>> = months
            .into_iter()
            .map(|month| self.slot((agent.clone(), month)))
            .collect();

        hold_all(&slots, work)
    }

    fn slot(&self, key: MonthKey) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        slots.entry(key).or_default().clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// The slot mutexes guard no data, so a poisoned one is simply taken over.
fn hold_all<R, F>(slots: &[Arc<Mutex<()>>], work: F) -> R
where
    F: FnOnce() -> R,
{
    match slots.split_first() {
        None => work(),
        Some((first, rest)) => {
            let _guard = first.lock().unwrap_or_else(PoisonError::into_inner);
            hold_all(rest, work)
        }
    }
}
