pub mod debounce;
pub mod ledger;
pub mod state;

pub use debounce::{DebounceBank, EdgeDetector};
pub use ledger::{DurationAccumulator, DurationLedger};
pub use state::{FocusStateMachine, Transition};
