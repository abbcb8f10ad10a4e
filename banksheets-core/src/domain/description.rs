//! Description registry entity

use serde::Serialize;

/// A distinct description text with its stable identifier and aliases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub id: i64,
    pub name: String,
    pub aliases: Vec<String>,
}
