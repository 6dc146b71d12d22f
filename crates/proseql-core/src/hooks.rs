use crate::value::Value;
use std::fmt;
use std::sync::Arc;

///
/// HookError
///
/// Failure raised by a `before*` hook; aborts the operation before any
/// state change (spec.md §4.8, testable property 7).
///

#[derive(Clone, Debug)]
pub struct HookError(pub String);

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HookError {}

/// `beforeCreate`/`beforeUpdate`: may transform the record/patch, may fail.
pub type BeforeFn = Arc<dyn Fn(Value) -> Result<Value, HookError> + Send + Sync>;
/// `beforeDelete`: may fail, has no record to transform.
pub type BeforeDeleteFn = Arc<dyn Fn(&Value) -> Result<(), HookError> + Send + Sync>;
/// `afterCreate`/`afterUpdate`/`afterDelete`: infallible w.r.t. the
/// operation — any internal error is logged and dropped (spec.md §4.8).
pub type AfterFn = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// `onChange`: receives the tagged union described in spec.md §4.8.
pub type OnChangeFn = Arc<dyn Fn(ChangeKind, &str, Option<&Value>, Option<&Value>) + Send + Sync>;

///
/// Hooks
///
/// Ordered lists of lifecycle callbacks per collection (spec.md §4.8).
///

#[derive(Clone, Default)]
pub struct Hooks {
    pub before_create: Vec<BeforeFn>,
    pub before_update: Vec<BeforeFn>,
    pub before_delete: Vec<BeforeDeleteFn>,
    pub after_create: Vec<AfterFn>,
    pub after_update: Vec<AfterFn>,
    pub after_delete: Vec<AfterFn>,
    pub on_change: Vec<OnChangeFn>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_create", &self.before_create.len())
            .field("before_update", &self.before_update.len())
            .field("before_delete", &self.before_delete.len())
            .field("after_create", &self.after_create.len())
            .field("after_update", &self.after_update.len())
            .field("after_delete", &self.after_delete.len())
            .field("on_change", &self.on_change.len())
            .finish()
    }
}

impl Hooks {
    #[must_use]
    pub fn with_before_create(mut self, f: BeforeFn) -> Self {
        self.before_create.push(f);
        self
    }

    #[must_use]
    pub fn with_before_update(mut self, f: BeforeFn) -> Self {
        self.before_update.push(f);
        self
    }

    #[must_use]
    pub fn with_before_delete(mut self, f: BeforeDeleteFn) -> Self {
        self.before_delete.push(f);
        self
    }

    #[must_use]
    pub fn with_after_create(mut self, f: AfterFn) -> Self {
        self.after_create.push(f);
        self
    }

    #[must_use]
    pub fn with_after_update(mut self, f: AfterFn) -> Self {
        self.after_update.push(f);
        self
    }

    #[must_use]
    pub fn with_after_delete(mut self, f: AfterFn) -> Self {
        self.after_delete.push(f);
        self
    }

    #[must_use]
    pub fn with_on_change(mut self, f: OnChangeFn) -> Self {
        self.on_change.push(f);
        self
    }

    /// Runs `beforeCreate`/`beforeUpdate` pipelines: each hook sees the
    /// output of the previous one and may reject the whole operation.
    pub(crate) fn run_before(hooks: &[BeforeFn], mut value: Value) -> Result<Value, HookError> {
        for hook in hooks {
            value = hook(value)?;
        }
        Ok(value)
    }

    pub(crate) fn run_before_delete(hooks: &[BeforeDeleteFn], entity: &Value) -> Result<(), HookError> {
        for hook in hooks {
            hook(entity)?;
        }
        Ok(())
    }

    /// Runs `afterCreate`/`afterUpdate`/`afterDelete`: errors are not
    /// representable by `AfterFn`'s signature, matching spec.md §4.8 (any
    /// internal failure must be logged and swallowed, not propagated).
    pub(crate) fn run_after(hooks: &[AfterFn], entity: &Value) {
        for hook in hooks {
            hook(entity);
        }
    }

    pub(crate) fn run_on_change(
        &self,
        kind: ChangeKind,
        id: &str,
        before: Option<&Value>,
        after: Option<&Value>,
    ) {
        for hook in &self.on_change {
            hook(kind, id, before, after);
        }
    }
}
