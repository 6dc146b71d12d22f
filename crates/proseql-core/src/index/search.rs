use crate::value::Value;
use indexmap::IndexSet;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Small, fixed English stop list (spec.md §4.4 "Text search").
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "for", "is", "are", "was", "were",
    "be", "by", "with", "at", "as", "it", "this", "that", "from", "but", "not",
];

/// Lowercases, splits on non-alphanumeric boundaries, and drops stop words
/// (spec.md §4.4).
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

///
/// SearchIndex
///
/// Tokenised inverted index keyed by `(field, token) -> id set` backing
/// `$search` (spec.md §8, component 8). `declared_fields` is the
/// collection's configured field list; `None` means every string field is
/// indexed, decided per entity at insert time.
///

pub struct SearchIndex {
    declared_fields: Option<Vec<String>>,
    by_field_token: RwLock<HashMap<(String, String), IndexSet<String>>>,
}

impl SearchIndex {
    #[must_use]
    pub fn new(declared_fields: Option<Vec<String>>) -> Self {
        Self {
            declared_fields,
            by_field_token: RwLock::new(HashMap::new()),
        }
    }

    fn fields_for(&self, entity: &Value) -> Vec<String> {
        match &self.declared_fields {
            Some(fields) => fields.clone(),
            None => entity
                .string_fields()
                .into_iter()
                .map(|(k, _)| k.to_string())
                .collect(),
        }
    }

    pub fn insert(&self, id: &str, entity: &Value) {
        let fields = self.fields_for(entity);
        let mut guard = self.by_field_token.write();
        for field in fields {
            let Some(text) = entity.get(&field).and_then(Value::as_str) else {
                continue;
            };
            for token in tokenize(text) {
                guard
                    .entry((field.clone(), token))
                    .or_default()
                    .insert(id.to_string());
            }
        }
    }

    pub fn remove(&self, id: &str, entity: &Value) {
        let fields = self.fields_for(entity);
        let mut guard = self.by_field_token.write();
        for field in fields {
            let Some(text) = entity.get(&field).and_then(Value::as_str) else {
                continue;
            };
            for token in tokenize(text) {
                let key = (field.clone(), token);
                if let Some(ids) = guard.get_mut(&key) {
                    ids.shift_remove(id);
                    if ids.is_empty() {
                        guard.remove(&key);
                    }
                }
            }
        }
    }

    pub fn reindex(&self, id: &str, before: &Value, after: &Value) {
        self.remove(id, before);
        self.insert(id, after);
    }

    /// Tokens must all match (AND); a token may match any of the scoped
    /// fields (OR) (spec.md §4.4). `fields` is the query-level override;
    /// falling back to the collection's declared fields, and finally to
    /// every field the index has ever seen.
    #[must_use]
    pub fn search(&self, query: &str, fields: Option<&[String]>) -> IndexSet<String> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return IndexSet::new();
        }

        let guard = self.by_field_token.read();
        let scoped_fields: Vec<String> = fields
            .map(<[String]>::to_vec)
            .or_else(|| self.declared_fields.clone())
            .unwrap_or_else(|| {
                let mut seen = IndexSet::new();
                for (field, _) in guard.keys() {
                    seen.insert(field.clone());
                }
                seen.into_iter().collect()
            });

        let mut result: Option<IndexSet<String>> = None;
        for token in &tokens {
            let mut hits = IndexSet::new();
            for field in &scoped_fields {
                if let Some(ids) = guard.get(&(field.clone(), token.clone())) {
                    hits.extend(ids.iter().cloned());
                }
            }
            result = Some(match result {
                Some(acc) => acc.intersection(&hits).cloned().collect(),
                None => hits,
            });
            if result.as_ref().is_some_and(IndexSet::is_empty) {
                break;
            }
        }
        result.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, summary: &str) -> Value {
        Value::Map(vec![
            ("title".into(), Value::Text(title.into())),
            ("summary".into(), Value::Text(summary.into())),
        ])
    }

    #[test]
    fn tokenize_lowercases_splits_and_drops_stop_words() {
        assert_eq!(
            tokenize("The Great Gatsby, and the Beautiful."),
            vec!["great", "gatsby", "beautiful"]
        );
    }

    #[test]
    fn search_ands_across_tokens_and_ors_across_fields() {
        let index = SearchIndex::new(None);
        index.insert("b1", &book("Dune", "a desert planet"));
        index.insert("b2", &book("Desert Rose", "a love story"));

        let hits = index.search("desert planet", None);
        assert_eq!(hits.len(), 1);
        assert!(hits.contains("b1"));
    }

    #[test]
    fn search_respects_query_level_field_override() {
        let index = SearchIndex::new(None);
        index.insert("b1", &book("Dune", "a desert planet"));
        let fields = vec!["title".to_string()];
        assert!(index.search("desert", Some(&fields)).is_empty());
        assert!(!index.search("dune", Some(&fields)).is_empty());
    }
}
