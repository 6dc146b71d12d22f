use crate::value::Value;
use std::sync::Arc;

///
/// Migration
///
/// A pure function transforming a raw collection object from version
/// `from` to `to` (spec.md §6). Migrations must not perform I/O; gaps in
/// the chain fail the load.
///

#[derive(Clone)]
pub struct Migration {
    pub from: u32,
    pub to: u32,
    pub transform: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl Migration {
    #[must_use]
    pub fn new(from: u32, to: u32, transform: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            from,
            to,
            transform: Arc::new(transform),
        }
    }
}

/// Applies the configured chain in order from `current` up to `target`,
/// failing if a step is missing (spec.md §6 "Migration interface").
pub(super) fn apply_chain(
    chain: &[Migration],
    mut value: Value,
    mut current: u32,
    target: u32,
) -> Result<Value, String> {
    while current < target {
        let Some(step) = chain.iter().find(|m| m.from == current) else {
            return Err(format!("no migration step from version {current}"));
        };
        value = (step.transform)(value);
        current = step.to;
    }
    Ok(value)
}
