use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

///
/// IdKind
///
/// The five id flavours of spec.md §4.3. `Timestamp` is the default when a
/// collection declares none.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum IdKind {
    #[default]
    Timestamp,
    Nano,
    Uuid,
    Ulid,
    Prefixed(String),
}

/// Monotonic counter disambiguating ids minted within the same millisecond,
/// so `Timestamp` ids stay strictly increasing within a process even under
/// rapid-fire `createMany` batches.
static TIMESTAMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[must_use]
pub fn generate(kind: &IdKind) -> String {
    match kind {
        IdKind::Timestamp => timestamp_id(),
        IdKind::Nano => nanoid::nanoid!(12),
        IdKind::Uuid => uuid::Uuid::new_v4().to_string(),
        IdKind::Ulid => Ulid::new().to_string(),
        IdKind::Prefixed(prefix) => format!("{prefix}_{}", nanoid::nanoid!(16)),
    }
}

fn timestamp_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = TIMESTAMP_SEQ.fetch_add(1, Ordering::Relaxed) % 0xFFFF;
    let suffix = nanoid::nanoid!(6);
    format!("{millis:013x}{seq:04x}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_ids_are_unique_and_monotonic_within_a_millisecond() {
        let a = generate(&IdKind::Timestamp);
        let b = generate(&IdKind::Timestamp);
        assert_ne!(a, b);
        assert!(a < b, "expected {a} < {b}");
    }

    #[test]
    fn ulid_ids_are_lexicographically_sortable() {
        let a = generate(&IdKind::Ulid);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = generate(&IdKind::Ulid);
        assert!(a < b);
    }

    #[test]
    fn prefixed_ids_carry_the_declared_prefix() {
        let id = generate(&IdKind::Prefixed("usr".to_string()));
        assert!(id.starts_with("usr_"));
    }
}
