//! Constructor control

use crate::behavior::Behavior;
use crate::error::BehaviorError;
use crate::invocation::Invocation;
use mimic_reflect::MemberKind;

/// Decides whether a substitute's type initializer runs
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticConstructorMockBehavior;

impl Behavior for StaticConstructorMockBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.method().kind() != MemberKind::StaticConstructor {
            return Ok(());
        }
        let mocked = invocation
            .mixin()
            .is_some_and(|mixin| mixin.is_static_constructor_mocked());
        invocation.claim_original(!mocked);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "static_constructor_mock"
    }
}

/// Decides whether a substitute's instance constructor runs
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteConstructorBehavior;

impl Behavior for ExecuteConstructorBehavior {
    fn process(&self, invocation: &mut Invocation) -> Result<(), BehaviorError> {
        if invocation.method().kind() != MemberKind::Constructor {
            return Ok(());
        }
        let mocked = invocation
            .mixin()
            .is_some_and(|mixin| mixin.is_constructor_mocked());
        invocation.claim_original(!mocked);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "execute_constructor"
    }
}
