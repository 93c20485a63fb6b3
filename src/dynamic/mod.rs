//! Dynamic (AI-feedback loop) executor (spec §3, §4.7): the alternative to
//! the statically-planned Task Executor for goals where the plan isn't known
//! ahead of time. An `ExecutionContext` accumulates collected data, action
//! history, and visited URLs across iterations; `PageStateExtractor` bounds
//! what of a page is ever handed to the `AiOracle`; `DynamicExecutor` ties
//! the two together into the iterate-decide-act loop.

mod context;
mod executor;
mod page_state;

pub use context::{ActionHistoryEntry, CycleDetection, ExecutionContext, TerminationReason};
pub use executor::{DynamicExecutionOutcome, DynamicExecutor, DynamicExecutorError};
pub use page_state::{Clickable, FormInput, FormSummary, Link, PageState, PageStateExtractor};
