//! List-query pagination: clamped limits and an allow-listed sort column.
//!
//! The sort field maps to a fixed column name, never to caller input, so it
//! can be spliced into `ORDER BY` without any injection surface.

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

impl SortField {
    /// Parse a client-supplied sort key. Unknown keys return `None`; callers
    /// surface that as a validation error rather than silently defaulting.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created_at" | "createdAt" => Some(Self::CreatedAt),
            "updated_at" | "updatedAt" => Some(Self::UpdatedAt),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl Pagination {
    /// Build pagination from raw query values.
    ///
    /// `limit` of zero or less falls back to the default of 20 and anything
    /// above 100 is clamped down; a negative `offset` becomes 0.
    #[must_use]
    pub fn new(
        limit: Option<i64>,
        offset: Option<i64>,
        sort_field: SortField,
        sort_order: SortOrder,
    ) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };
        let offset = offset.unwrap_or(0).max(0);
        Self {
            limit,
            offset,
            sort_field,
            sort_order,
        }
    }

    /// Render the `ORDER BY ... OFFSET ... LIMIT ...` tail of a list query.
    /// Only allow-listed column names and fixed keywords are interpolated.
    #[must_use]
    pub fn order_clause(&self) -> String {
        format!(
            "ORDER BY {} {} OFFSET {} LIMIT {}",
            self.sort_field.column(),
            self.sort_order.keyword(),
            self.offset,
            self.limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_clamps_to_max() {
        let page = Pagination::new(Some(500), None, SortField::CreatedAt, SortOrder::Desc);
        assert_eq!(page.limit, MAX_LIMIT);
    }

    #[test]
    fn zero_and_negative_limits_fall_back_to_default() {
        for raw in [Some(0), Some(-5), None] {
            let page = Pagination::new(raw, None, SortField::CreatedAt, SortOrder::Desc);
            assert_eq!(page.limit, DEFAULT_LIMIT, "limit {raw:?}");
        }
    }

    #[test]
    fn negative_offset_becomes_zero() {
        let page = Pagination::new(None, Some(-3), SortField::CreatedAt, SortOrder::Desc);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn sort_field_rejects_unknown_columns() {
        assert_eq!(SortField::parse("created_at"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("createdAt"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("name"), Some(SortField::Name));
        assert_eq!(SortField::parse("id; DROP TABLE media"), None);
    }

    #[test]
    fn order_clause_uses_allow_listed_column() {
        let page = Pagination::new(Some(10), Some(40), SortField::Name, SortOrder::Asc);
        assert_eq!(page.order_clause(), "ORDER BY name ASC OFFSET 40 LIMIT 10");
    }
}
