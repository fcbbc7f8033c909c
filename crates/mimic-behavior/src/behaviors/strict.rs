//! Strict policy

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;

/// Rejects calls nothing else answered
///
/// Calls being recorded by the arrangement front end and calls with a user
/// supplied outcome always pass. With `value_returning_only` the unit only
/// rejects members that return a value, and it does so even while an
/// arrangement is being defined. Without it, every remaining call is
/// rejected except those made during arrangement definition.
#[derive(Debug, Clone, Copy)]
pub struct StrictBehavior {
    value_returning_only: bool,
}

impl StrictBehavior {
    /// With `value_returning_only`, void members are tolerated
    #[inline]
    #[must_use]
    pub fn new(value_returning_only: bool) -> Self {
        Self {
            value_returning_only,
        }
    }
}

impl Behavior for StrictBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.is_decided() || invocation.is_user_provided() || invocation.is_recording() {
            return Ok(());
        }
        let violates = if self.value_returning_only {
            !invocation.method().returns_void()
        } else {
            !invocation.is_in_arrange()
        };
        if violates {
            tracing::debug!(call = %invocation, "strict policy rejected call");
            return Err(BehaviorError::PolicyViolation {
                call: invocation.to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "strict"
    }

    fn describe(&self) -> String {
        if self.value_returning_only {
            "strict(value_returning_only)".to_string()
        } else {
            self.name().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_reflect::{int_type, TypeInfo};

    fn service() -> mimic_reflect::TypeRef {
        TypeInfo::interface("IService")
            .method("Get", int_type(), |m| m)
            .void_method("Ping", |m| m)
            .build()
    }

    #[test]
    fn value_only_rejects_value_members() {
        let ty = service();
        let unit = StrictBehavior::new(true);

        let mut get = Invocation::new(None, ty.find_member("Get").unwrap(), []).in_arrange(true);
        let err = unit.process(&mut get).unwrap_err();
        assert!(err.is_policy_violation());
        assert_eq!(err.to_string(), "strict substitute received an unarranged call: IService.Get()");

        let mut ping = Invocation::new(None, ty.find_member("Ping").unwrap(), []);
        assert!(unit.process(&mut ping).is_ok());
    }

    #[test]
    fn full_strict_tolerates_arrangement_definition() {
        let ty = service();
        let unit = StrictBehavior::new(false);
        let ping = ty.find_member("Ping").unwrap();

        let mut during = Invocation::new(None, ping.clone(), []).in_arrange(true);
        assert!(unit.process(&mut during).is_ok());

        let mut real = Invocation::new(None, ping, []);
        assert!(unit.process(&mut real).is_err());
    }

    #[test]
    fn recording_and_user_outcomes_pass() {
        let ty = service();
        let unit = StrictBehavior::new(false);

        let mut recorded = Invocation::new(None, ty.find_member("Get").unwrap(), []).recording(true);
        assert!(unit.process(&mut recorded).is_ok());

        let mut provided = Invocation::new(None, ty.find_member("Get").unwrap(), []);
        provided.mark_user_provided();
        assert!(unit.process(&mut provided).is_ok());
    }
}
