mod aggregate;
mod cursor;
mod pipeline;
mod populate;
mod predicate;
mod select;
mod sort;

pub use aggregate::{aggregate, AggregateResult, AggregateSpec};
pub use cursor::{Cursor, PageInfo};
pub use pipeline::{run_query, PageResult, Pagination, QuerySpec};
pub use populate::{populate, PopulateSource, PopulateSpec, MAX_POPULATE_DEPTH};
pub use predicate::{eval, parse_where, Op, Predicate, Quantifier, RelationSnapshot};
pub use select::{project, Select, SelectChild};
pub use sort::{compare_nulls_last, compare_with_tiebreak, sort_rows, SortDirection, SortKey};
