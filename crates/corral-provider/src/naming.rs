//! Container naming.

use uuid::Uuid;

/// `{service}-{first 8 hex chars of a v4 uuid}`.
pub fn container_name(service: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{service}-{}", &id[..8])
}
