use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{Error, Result};

/// At most one in-flight optimization per tour.
#[derive(Default)]
pub struct OptimizationGate {
    in_flight: Mutex<HashSet<String>>,
}

impl OptimizationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, tour_id: &str) -> Result<OptimizationPermit<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| Error::other("optimization gate poisoned"))?;
        if !in_flight.insert(tour_id.to_owned()) {
            log::debug!("gate: rejected tour={tour_id}");
            return Err(Error::OptimizationInFlight(tour_id.to_owned()));
        }
        Ok(OptimizationPermit {
            gate: self,
            tour_id: tour_id.to_owned(),
        })
    }

    pub fn is_in_flight(&self, tour_id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(tour_id))
            .unwrap_or(false)
    }
}

/// Released when dropped.
pub struct OptimizationPermit<'a> {
    gate: &'a OptimizationGate,
    tour_id: String,
}

impl OptimizationPermit<'_> {
    pub fn tour_id(&self) -> &str {
        &self.tour_id
    }
}

impl Drop for OptimizationPermit<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.gate.in_flight.lock() {
            in_flight.remove(&self.tour_id);
        }
    }
}

/// Shared cancellation flag. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn ensure_active(&self, tour_id: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled(tour_id.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, OptimizationGate};
    use crate::Error;

    #[test]
    fn second_acquire_for_same_tour_is_rejected() {
        let gate = OptimizationGate::new();
        let permit = gate.acquire("t1").expect("first acquire");
        let err = gate.acquire("t1").err().expect("second acquire rejected");
        assert!(matches!(err, Error::OptimizationInFlight(ref id) if id == "t1"));
        gate.acquire("t2").expect("other tours unaffected");
        assert!(gate.is_in_flight("t1"));

        drop(permit);
        assert!(!gate.is_in_flight("t1"));
        gate.acquire("t1").expect("released on drop");
    }

    #[test]
    fn concurrent_acquires_admit_exactly_one() {
        let gate = OptimizationGate::new();
        let barrier = std::sync::Barrier::new(8);
        let admitted = std::thread::scope(|scope| {
            let (tx, rx) = std::sync::mpsc::channel();
            for _ in 0..8 {
                let (tx, gate, barrier) = (tx.clone(), &gate, &barrier);
                scope.spawn(move || {
                    let permit = gate.acquire("t1");
                    let ok = permit.is_ok();
                    barrier.wait();
                    tx.send(ok).expect("send");
                });
            }
            drop(tx);
            rx.iter().filter(|ok| *ok).count()
        });
        assert_eq!(admitted, 1);
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.ensure_active("t1").expect("active");
        token.cancel();
        assert!(clone.is_cancelled());
        let err = clone.ensure_active("t1").expect_err("cancelled");
        assert!(matches!(err, Error::Cancelled(_)));
    }
}
