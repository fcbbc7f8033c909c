//! Arrangement markers
//!
//! The arrangement front end evaluates user expressions against substitutes
//! to discover which member they target. While it does so it pushes an
//! [`ArrangeMarker`] naming the type whose code declared the arrangement;
//! behavior units inspect the innermost marker instead of walking a stack trace.

use crate::types::TypeRef;
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static ARRANGE_CALLERS: RefCell<Vec<TypeRef>> = const { RefCell::new(Vec::new()) };
}

/// Scope guard marking an arrangement body on the current thread
///
/// Not `Send`: the marker belongs to the thread that entered it.
#[derive(Debug)]
#[must_use = "the marker is removed as soon as it is dropped"]
pub struct ArrangeMarker {
    _thread_bound: PhantomData<*const ()>,
}

impl ArrangeMarker {
    /// Enter an arrangement declared by code belonging to `caller`
    pub fn enter(caller: &TypeRef) -> Self {
        ARRANGE_CALLERS.with(|stack| stack.borrow_mut().push(caller.clone()));
        Self {
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for ArrangeMarker {
    fn drop(&mut self) {
        ARRANGE_CALLERS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Type that declared the innermost active arrangement on this thread
#[must_use]
pub fn innermost_arrange_caller() -> Option<TypeRef> {
    ARRANGE_CALLERS.with(|stack| stack.borrow().last().cloned())
}

/// Whether an arrangement body is being evaluated on this thread
#[must_use]
pub fn is_within_arrangement() -> bool {
    ARRANGE_CALLERS.with(|stack| !stack.borrow().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    #[test]
    fn markers_nest_and_unwind() {
        let outer = TypeInfo::class("OuterTest").build();
        let inner = TypeInfo::class("InnerTest").build();
        assert!(!is_within_arrangement());

        {
            let _outer = ArrangeMarker::enter(&outer);
            assert_eq!(innermost_arrange_caller().unwrap().name(), "OuterTest");
            {
                let _inner = ArrangeMarker::enter(&inner);
                assert_eq!(innermost_arrange_caller().unwrap().name(), "InnerTest");
            }
            assert_eq!(innermost_arrange_caller().unwrap().name(), "OuterTest");
        }

        assert!(innermost_arrange_caller().is_none());
    }

    #[test]
    fn markers_are_thread_local() {
        let caller = TypeInfo::class("Caller").build();
        let _marker = ArrangeMarker::enter(&caller);
        let seen = std::thread::spawn(is_within_arrangement).join().unwrap();
        assert!(!seen);
        assert!(is_within_arrangement());
    }
}
