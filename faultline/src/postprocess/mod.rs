//! Post-processing that runs once a unit reaches a terminal state.

mod chain;
mod transaction;

pub use chain::{ChainOutput, Decision, PostProcessor, PostProcessorChain};
pub use transaction::{
    rollback_required, InMemoryTransactionManager, RollbackDecision, TransactionEvent, TransactionManager,
    TransactionMode, TransactionalPostProcessor,
};
