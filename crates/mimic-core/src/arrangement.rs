//! Hook for user arrangements
//!
//! The arrangement front end lives outside this crate. It plugs in through
//! [`ArrangementSource`]; a matching arrangement decides the call before the
//! substitute's behavior chain sees it.

use mimic_behavior::Invocation;
use mimic_reflect::Value;

/// Outcome chosen by a user arrangement
#[derive(Debug, Clone, PartialEq)]
pub enum ArrangedOutcome {
    /// Return this value
    Return(Value),

    /// Run the original implementation
    CallOriginal,

    /// Skip the original and return the member's default
    DoNothing,
}

/// Looks up the arrangement matching a call
pub trait ArrangementSource: Send + Sync {
    /// Arranged outcome for `invocation`, if any
    fn find(&self, invocation: &Invocation) -> Option<ArrangedOutcome>;
}

/// Apply `outcome` to `invocation` as a user-provided decision
pub(crate) fn apply(invocation: &mut Invocation, outcome: ArrangedOutcome) {
    match outcome {
        ArrangedOutcome::Return(value) => invocation.claim_with_value(value),
        ArrangedOutcome::CallOriginal => invocation.claim_original(true),
        ArrangedOutcome::DoNothing => invocation.claim_original(false),
    }
    invocation.mark_user_provided();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{MemberInfo, MemberKind};

    #[test]
    fn outcomes_decide_and_mark() {
        let member = MemberInfo::detached("Run", MemberKind::Method);

        let mut invocation = Invocation::new(None, member.clone(), Vec::new());
        apply(&mut invocation, ArrangedOutcome::Return(Value::Int(4)));
        assert!(invocation.is_decided());
        assert!(invocation.is_user_provided());
        assert_eq!(invocation.return_value(), Some(&Value::Int(4)));

        let mut invocation = Invocation::new(None, member.clone(), Vec::new());
        apply(&mut invocation, ArrangedOutcome::CallOriginal);
        assert!(invocation.should_call_original());

        let mut invocation = Invocation::new(None, member, Vec::new());
        apply(&mut invocation, ArrangedOutcome::DoNothing);
        assert!(invocation.is_decided());
        assert!(!invocation.should_call_original());
        assert!(!invocation.is_return_value_set());
    }
}
