use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortBy {
    UpdatedAt,
    CreatedAt,
    Name,
    Model,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::UpdatedAt => "updatedAt",
            SortBy::CreatedAt => "createdAt",
            SortBy::Name => "name",
            SortBy::Model => "model",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "updatedAt" => Some(SortBy::UpdatedAt),
            "createdAt" => Some(SortBy::CreatedAt),
            "name" => Some(SortBy::Name),
            "model" => Some(SortBy::Model),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// The user's conversation-list ordering preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortMode {
    pub by: SortBy,
    pub order: SortOrder,
}

impl SortMode {
    pub fn new(by: SortBy, order: SortOrder) -> Self {
        Self { by, order }
    }
}

impl Default for SortMode {
    fn default() -> Self {
        Self {
            by: SortBy::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}
