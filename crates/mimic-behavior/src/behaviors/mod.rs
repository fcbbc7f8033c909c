//! Built-in behavior units

mod call_original;
mod collection;
mod constructors;
mod event_stubs;
mod property_stubs;
mod recursive;
mod strict;

pub use call_original::{CallOriginalBehavior, CallOriginalObjectMethodsBehavior};
pub use collection::{CollectionContents, CollectionStubsBehavior, MockCollection};
pub use constructors::{ExecuteConstructorBehavior, StaticConstructorMockBehavior};
pub use event_stubs::{EventStubsBehavior, EventSubscriptions};
pub use property_stubs::PropertyStubsBehavior;
pub use recursive::{RecursiveMockingBehavior, RecursiveMode};
pub use strict::StrictBehavior;
