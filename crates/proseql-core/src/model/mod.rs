use crate::hooks::Hooks;
use crate::id::IdKind;
use crate::persistence::PersistenceConfig;
use crate::schema::Schema;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

///
/// RelationshipKind
///
/// Directionality of a relationship (spec.md §3/§4.7 GLOSSARY: Ref / Inverse).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationshipKind {
    /// The foreign key lives on *this* collection.
    Ref,
    /// The foreign key lives on the *target* collection.
    Inverse,
}

#[derive(Clone, Debug)]
pub struct RelationshipDef {
    pub name: String,
    pub kind: RelationshipKind,
    pub target: String,
    pub foreign_key: String,
}

impl RelationshipDef {
    #[must_use]
    pub fn ref_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let default_fk = format!("{name}Id");
        Self {
            name,
            kind: RelationshipKind::Ref,
            target: target.into(),
            foreign_key: default_fk,
        }
    }

    #[must_use]
    pub fn inverse(
        name: impl Into<String>,
        target: impl Into<String>,
        owner_singular: impl Into<String>,
    ) -> Self {
        let owner_singular = owner_singular.into();
        Self {
            name: name.into(),
            kind: RelationshipKind::Inverse,
            target: target.into(),
            foreign_key: format!("{owner_singular}Id"),
        }
    }

    #[must_use]
    pub fn with_foreign_key(mut self, field: impl Into<String>) -> Self {
        self.foreign_key = field.into();
        self
    }
}

/// One declared unique constraint: a single field or a compound tuple.
#[derive(Clone, Debug)]
pub struct UniqueConstraint {
    pub fields: Vec<String>,
}

impl UniqueConstraint {
    #[must_use]
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
        }
    }

    #[must_use]
    pub fn compound(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("unique_{}", self.fields.join("_"))
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchConfig {
    pub fields: Option<Vec<String>>,
    pub enabled: bool,
}

impl SearchConfig {
    #[must_use]
    pub fn all_string_fields() -> Self {
        Self {
            fields: None,
            enabled: true,
        }
    }

    #[must_use]
    pub fn fields(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: Some(fields.into_iter().map(Into::into).collect()),
            enabled: true,
        }
    }
}

pub type ComputedFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct ComputedFields(pub HashMap<String, ComputedFn>);

impl ComputedFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, f: ComputedFn) -> Self {
        self.0.insert(name.into(), f);
        self
    }
}

impl std::fmt::Debug for ComputedFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedFields")
            .field("names", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

///
/// CollectionConfig
///
/// Everything spec.md §3 attaches to a collection: schema, relationships,
/// indexes, unique constraints, hooks, search config, computed fields, id
/// generator, and optional persistence.
///

#[derive(Debug)]
pub struct CollectionConfig {
    pub name: String,
    pub schema: Schema,
    pub relationships: Vec<RelationshipDef>,
    pub indexes: Vec<String>,
    pub unique_fields: Vec<UniqueConstraint>,
    pub hooks: Hooks,
    pub search: SearchConfig,
    pub computed: ComputedFields,
    pub persistence: Option<PersistenceConfig>,
    pub id_kind: IdKind,
}

impl CollectionConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            relationships: Vec::new(),
            indexes: Vec::new(),
            unique_fields: Vec::new(),
            hooks: Hooks::default(),
            search: SearchConfig::default(),
            computed: ComputedFields::default(),
            persistence: None,
            id_kind: IdKind::default(),
        }
    }

    #[must_use]
    pub fn with_relationship(mut self, rel: RelationshipDef) -> Self {
        self.relationships.push(rel);
        self
    }

    #[must_use]
    pub fn with_index(mut self, field: impl Into<String>) -> Self {
        self.indexes.push(field.into());
        self
    }

    #[must_use]
    pub fn with_unique(mut self, constraint: UniqueConstraint) -> Self {
        self.unique_fields.push(constraint);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_computed(mut self, computed: ComputedFields) -> Self {
        self.computed = computed;
        self
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = Some(persistence);
        self
    }

    #[must_use]
    pub fn with_id_kind(mut self, kind: IdKind) -> Self {
        self.id_kind = kind;
        self
    }

    pub(crate) fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }
}
