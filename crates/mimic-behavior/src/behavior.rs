//! Behavior trait and chain dispatch
//!
//! Provides the [`Behavior`] capability and [`BehaviorChain`], which offers a
//! call to supplementary units and then fallback units, stopping at the first
//! unit that claims it.

use crate::error::BehaviorError;
use crate::invocation::Invocation;
use std::fmt;
use std::sync::Arc;

/// A unit that may inspect and claim an intercepted call
///
/// A unit claims a call by marking the [`Invocation`] decided. A unit that
/// leaves it undecided declines and the next unit is asked.
pub trait Behavior: Send + Sync + fmt::Debug {
    /// Inspect the call and optionally claim it
    ///
    /// # Errors
    /// Returns an error to abort the call (strict policy, failed construction)
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError>;

    /// Unit name (for tracing and introspection)
    fn name(&self) -> &'static str;

    /// Name plus configuration, e.g. `strict(value_returning_only)`
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Result of offering a call to a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The call was already decided before any unit ran
    Preclaimed,

    /// The named unit claimed the call
    Claimed(&'static str),

    /// No unit claimed the call
    Unclaimed,
}

impl Dispatch {
    /// Whether a unit decided the call
    #[inline]
    #[must_use]
    pub fn is_claimed(self) -> bool {
        !matches!(self, Self::Unclaimed)
    }
}

/// Ordered supplementary and fallback units of one substitute
#[derive(Debug, Clone, Default)]
pub struct BehaviorChain {
    supplementary: Vec<Arc<dyn Behavior>>,
    fallback: Vec<Arc<dyn Behavior>>,
}

impl BehaviorChain {
    /// Chain consulting `supplementary` units before `fallback` ones
    #[must_use]
    pub fn new(supplementary: Vec<Arc<dyn Behavior>>, fallback: Vec<Arc<dyn Behavior>>) -> Self {
        Self {
            supplementary,
            fallback,
        }
    }

    /// Units consulted first
    #[inline]
    #[must_use]
    pub fn supplementary(&self) -> &[Arc<dyn Behavior>] {
        &self.supplementary
    }

    /// Units consulted after every supplementary unit declined
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> &[Arc<dyn Behavior>] {
        &self.fallback
    }

    /// Descriptions of every unit, supplementary first
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.units().map(|unit| unit.describe()).collect()
    }

    /// Offer `invocation` to each unit in order until one claims it
    ///
    /// # Errors
    /// Propagates the first unit failure; later units are not consulted.
    pub fn dispatch(&self, invocation: &mut Invocation) -> Result<Dispatch, BehaviorError> {
        if invocation.is_decided() {
            return Ok(Dispatch::Preclaimed);
        }

        for unit in self.units() {
            unit.process(invocation)?;
            if invocation.is_decided() {
                tracing::trace!(call = %invocation, unit = unit.name(), "claimed");
                return Ok(Dispatch::Claimed(unit.name()));
            }
        }

        tracing::trace!(call = %invocation, "no unit claimed the call");
        Ok(Dispatch::Unclaimed)
    }

    fn units(&self) -> impl Iterator<Item = &Arc<dyn Behavior>> {
        self.supplementary.iter().chain(self.fallback.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{MemberInfo, MemberKind, Value};
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        name: &'static str,
        claims: bool,
        seen: Mutex<usize>,
    }

    impl Recorder {
        fn new(name: &'static str, claims: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                claims,
                seen: Mutex::new(0),
            })
        }
    }

    impl Behavior for Recorder {
        fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
            *self.seen.lock() += 1;
            if self.claims {
                invocation.claim_with_value(Value::Int(1));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl Behavior for Failing {
        fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
            Err(BehaviorError::PolicyViolation {
                call: invocation.to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn call() -> Invocation {
        Invocation::new(None, MemberInfo::detached("Run", MemberKind::Method), [])
    }

    #[test]
    fn first_claim_wins() {
        let a = Recorder::new("a", false);
        let b = Recorder::new("b", true);
        let c = Recorder::new("c", true);
        let chain = BehaviorChain::new(vec![a.clone()], vec![b.clone(), c.clone()]);

        let mut inv = call();
        assert_eq!(chain.dispatch(&mut inv).unwrap(), Dispatch::Claimed("b"));
        assert_eq!(*a.seen.lock(), 1);
        assert_eq!(*b.seen.lock(), 1);
        assert_eq!(*c.seen.lock(), 0);
    }

    #[test]
    fn preclaimed_calls_skip_units() {
        let a = Recorder::new("a", true);
        let chain = BehaviorChain::new(vec![a.clone()], vec![]);
        let mut inv = call();
        inv.claim_original(true);

        assert_eq!(chain.dispatch(&mut inv).unwrap(), Dispatch::Preclaimed);
        assert_eq!(*a.seen.lock(), 0);
    }

    #[test]
    fn unclaimed_when_everyone_declines() {
        let chain = BehaviorChain::new(vec![], vec![Recorder::new("a", false)]);
        let mut inv = call();
        let outcome = chain.dispatch(&mut inv).unwrap();
        assert!(!outcome.is_claimed());
    }

    #[test]
    fn failure_stops_the_chain() {
        let after = Recorder::new("after", true);
        let chain = BehaviorChain::new(vec![Arc::new(Failing)], vec![after.clone()]);
        let mut inv = call();

        let err = chain.dispatch(&mut inv).unwrap_err();
        assert!(err.is_policy_violation());
        assert_eq!(*after.seen.lock(), 0);
    }

    #[test]
    fn describe_lists_supplementary_first() {
        let chain = BehaviorChain::new(
            vec![Recorder::new("first", false)],
            vec![Recorder::new("second", false)],
        );
        assert_eq!(chain.describe(), vec!["first", "second"]);
    }
}
