//! Fully qualified name helpers
//!
//! FQNs are dot separated; a segment that itself contains dots is wrapped in double
//! quotes (`svc.db."my.schema".orders`).

/// Segment of a table FQN (`service.database.schema.table.column`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FqnPart {
    Service,
    Database,
    Schema,
    Table,
    Column,
}

impl FqnPart {
    fn index(&self) -> usize {
        match self {
            FqnPart::Service => 0,
            FqnPart::Database => 1,
            FqnPart::Schema => 2,
            FqnPart::Table => 3,
            FqnPart::Column => 4,
        }
    }
}

pub fn split(fqn: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in fqn.chars() {
        match ch {
            '"' => quoted = !quoted,
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || !parts.is_empty() {
        parts.push(current);
    }
    parts
}

/// Returns the requested segment of a table or column FQN.
///
/// Column names may be nested (`...orders.address.city`); the column part keeps every
/// trailing segment.
pub fn table_part(fqn: &str, part: FqnPart) -> String {
    let parts = split(fqn);
    let idx = part.index();
    match part {
        FqnPart::Column if parts.len() > idx => parts[idx..].join("."),
        _ => parts.get(idx).cloned().unwrap_or_default(),
    }
}

/// Name of a non-table entity: the segment following the service, empty when absent.
pub fn entity_name(fqn: &str) -> String {
    split(fqn).into_iter().nth(1).unwrap_or_default()
}
