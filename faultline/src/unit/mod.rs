//! Units of work.
//!
//! A unit pairs a fallible setup phase, which builds the fixture the body
//! needs (the injected dependencies), with a body that only runs once that
//! fixture exists.

use crate::postprocess::TransactionMode;
use std::collections::BTreeMap;
use std::fmt::Debug;
use uuid::Uuid;

/// Tag key carrying the transaction mode requested by a unit.
pub const TRANSACTION_TAG: &str = "transaction";

/// Boxed setup closure.
pub type SetupFn<F> = Box<dyn FnOnce() -> anyhow::Result<F> + Send>;

/// Boxed body closure.
pub type BodyFn<F> = Box<dyn FnOnce(F) -> anyhow::Result<serde_json::Value> + Send>;

/// Read-only view of a unit handed to post-processors.
#[derive(Debug, Clone)]
pub struct UnitContext {
    unit_id: String,
    run_id: Uuid,
    tags: BTreeMap<String, String>,
}

impl UnitContext {
    /// Creates a context with a fresh run id.
    #[must_use]
    pub fn new(unit_id: impl Into<String>, tags: BTreeMap<String, String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            run_id: Uuid::new_v4(),
            tags,
        }
    }

    /// Returns the unit identifier.
    #[must_use]
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Returns the id of this particular execution.
    ///
    /// Fresh per run, so two executions of the same unit never share it.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns all tags.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns a single tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// A unit of work: identifier, setup, body.
pub struct UnitOfWork<F> {
    id: String,
    tags: BTreeMap<String, String>,
    setup: SetupFn<F>,
    body: BodyFn<F>,
}

impl<F> UnitOfWork<F> {
    /// Creates a new unit.
    pub fn new<S, B>(id: impl Into<String>, setup: S, body: B) -> Self
    where
        S: FnOnce() -> anyhow::Result<F> + Send + 'static,
        B: FnOnce(F) -> anyhow::Result<serde_json::Value> + Send + 'static,
    {
        Self {
            id: id.into(),
            tags: BTreeMap::new(),
            setup: Box::new(setup),
            body: Box::new(body),
        }
    }

    /// Adds a descriptive tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Requests a transaction mode for this unit.
    #[must_use]
    pub fn transactional(self, mode: TransactionMode) -> Self {
        self.with_tag(TRANSACTION_TAG, mode.to_string())
    }

    /// Returns the unit identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the unit tags.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Splits the unit into its context and phases. Each call mints a new run id.
    pub(crate) fn into_parts(self) -> (UnitContext, SetupFn<F>, BodyFn<F>) {
        (UnitContext::new(self.id, self.tags), self.setup, self.body)
    }
}

impl UnitOfWork<()> {
    /// Creates a unit whose setup always succeeds with no fixture.
    pub fn without_setup<B>(id: impl Into<String>, body: B) -> Self
    where
        B: FnOnce() -> anyhow::Result<serde_json::Value> + Send + 'static,
    {
        Self::new(id, || Ok(()), move |()| body())
    }
}

impl<F> Debug for UnitOfWork<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_tags() {
        let unit = UnitOfWork::without_setup("tagged", || Ok(json!(null)))
            .with_tag("suite", "regression")
            .transactional(TransactionMode::Rollback);

        assert_eq!(unit.id(), "tagged");
        assert_eq!(unit.tags().get("suite"), Some(&"regression".to_string()));
        assert_eq!(unit.tags().get(TRANSACTION_TAG), Some(&"rollback".to_string()));
    }

    #[test]
    fn test_into_parts_runs_phases() {
        let unit = UnitOfWork::new("parts", || Ok(21), |n: i32| Ok(json!(n * 2)));
        let (ctx, setup, body) = unit.into_parts();

        assert_eq!(ctx.unit_id(), "parts");
        let fixture = setup().unwrap();
        assert_eq!(body(fixture).unwrap(), json!(42));
    }

    #[test]
    fn test_each_run_gets_a_fresh_run_id() {
        let a = UnitContext::new("same", BTreeMap::new());
        let b = UnitContext::new("same", BTreeMap::new());
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_debug_hides_closures() {
        let unit = UnitOfWork::without_setup("dbg", || Ok(json!(1)));
        let rendered = format!("{unit:?}");
        assert!(rendered.contains("dbg"));
        assert!(rendered.contains(".."));
    }
}
