//! SQL generation
//!
//! Rows are selected as a single `jsonb` value per row so that callers get
//! the same JSON shape no matter which columns a table has. The base table
//! is aliased `t`; embedded relations are aliased `e0`, `e1`, ...

use crate::errors::StoreError;
use crate::query_builder::builder::QueryBuilder;
use crate::query_builder::filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
use crate::query_builder::join::{Embed, EmbedKind};
use crate::query_builder::ordering::SortOrder;
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use serde_json::Value;

pub const BASE_ALIAS: &str = "t";
pub const ROW_COLUMN: &str = "__row__";

pub struct SqlGenerator;

impl SqlGenerator {
    pub fn validate(query: &QueryBuilder) -> Result<(), StoreError> {
        ValidatedTableName::new(&query.table)?;

        for filter in &query.conditions {
            for field in filter.fields() {
                ValidatedFieldName::qualified(field)?;
            }
        }
        for (field, _) in &query.order_by {
            ValidatedFieldName::qualified(field)?;
        }

        if let Some(limit) = query.limit {
            if limit < 0 {
                return Err(StoreError::Validation(format!(
                    "LIMIT must not be negative: {}",
                    limit
                )));
            }
        }
        if let Some(offset) = query.offset {
            if offset < 0 {
                return Err(StoreError::Validation(format!(
                    "OFFSET must not be negative: {}",
                    offset
                )));
            }
        }

        for embed in &query.embeds {
            ValidatedTableName::new(&embed.table)?;
            for column in &embed.columns {
                ValidatedFieldName::new(column)?;
            }
            match &embed.kind {
                EmbedKind::ToOne { local_column, .. } => {
                    ValidatedFieldName::new(local_column)?;
                }
                EmbedKind::ToMany {
                    foreign_column,
                    filters,
                } => {
                    ValidatedFieldName::new(foreign_column)?;
                    for filter in filters {
                        for field in filter.fields() {
                            ValidatedFieldName::new(field)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// `SELECT <row json> FROM table AS t [JOIN ...] [WHERE] [ORDER BY] [LIMIT/OFFSET]`
    pub fn build_select(query: &QueryBuilder) -> Result<(String, Vec<Value>), StoreError> {
        Self::validate(query)?;

        let mut values = Vec::new();
        // Parameters are numbered in text order: select list first, then WHERE
        let row_expression = Self::build_row_expression(&query.embeds, &mut values);
        let join_clause = Self::build_join_clause(&query.embeds);
        let where_clause = Self::build_where_clause(&query.conditions, BASE_ALIAS, &mut values);
        let order_clause = Self::build_order_clause(&query.order_by, BASE_ALIAS);
        let limit_clause = Self::build_limit_clause(query.limit, query.offset);

        let sql = [
            format!(
                "SELECT {} AS {} FROM {} AS {}",
                row_expression, ROW_COLUMN, query.table, BASE_ALIAS
            ),
            join_clause,
            where_clause,
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok((sql, values))
    }

    /// `SELECT COUNT(*)` over the same FROM/JOIN/WHERE as `build_select`
    pub fn build_count(query: &QueryBuilder) -> Result<(String, Vec<Value>), StoreError> {
        Self::validate(query)?;

        let mut values = Vec::new();
        let join_clause = Self::build_join_clause(&query.embeds);
        let where_clause = Self::build_where_clause(&query.conditions, BASE_ALIAS, &mut values);

        let sql = [
            format!("SELECT COUNT(*) FROM {} AS {}", query.table, BASE_ALIAS),
            join_clause,
            where_clause,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok((sql, values))
    }

    fn embed_alias(index: usize) -> String {
        format!("e{}", index)
    }

    fn build_object(columns: &[String], alias: &str) -> String {
        if columns.is_empty() {
            return format!("to_jsonb({})", alias);
        }
        let pairs: Vec<String> = columns
            .iter()
            .map(|column| format!("'{}', {}.{}", column, alias, column))
            .collect();
        format!("jsonb_build_object({})", pairs.join(", "))
    }

    fn build_row_expression(embeds: &[Embed], values: &mut Vec<Value>) -> String {
        if embeds.is_empty() {
            return format!("to_jsonb({})", BASE_ALIAS);
        }

        let pairs: Vec<String> = embeds
            .iter()
            .enumerate()
            .map(|(index, embed)| {
                let alias = Self::embed_alias(index);
                let object = Self::build_object(&embed.columns, &alias);
                match &embed.kind {
                    EmbedKind::ToOne { .. } => format!(
                        "'{}', CASE WHEN {}.id IS NULL THEN NULL ELSE {} END",
                        embed.key(),
                        alias,
                        object
                    ),
                    EmbedKind::ToMany {
                        foreign_column,
                        filters,
                    } => {
                        let mut conditions =
                            vec![format!("{}.{} = {}.id", alias, foreign_column, BASE_ALIAS)];
                        conditions.extend(
                            filters
                                .iter()
                                .map(|f| Self::build_condition_sql(f, &alias, values)),
                        );
                        format!(
                            "'{}', COALESCE((SELECT jsonb_agg({}) FROM {} AS {} WHERE {}), '[]'::jsonb)",
                            embed.key(),
                            object,
                            embed.table,
                            alias,
                            conditions.join(" AND ")
                        )
                    }
                }
            })
            .collect();

        format!(
            "to_jsonb({}) || jsonb_build_object({})",
            BASE_ALIAS,
            pairs.join(", ")
        )
    }

    /// JOINs for to-one embeds; to-many embeds are correlated sub-selects
    pub fn build_join_clause(embeds: &[Embed]) -> String {
        embeds
            .iter()
            .enumerate()
            .filter_map(|(index, embed)| match &embed.kind {
                EmbedKind::ToOne {
                    local_column,
                    inner,
                } => {
                    let alias = Self::embed_alias(index);
                    let join_type = if *inner { "INNER JOIN" } else { "LEFT JOIN" };
                    Some(format!(
                        "{} {} AS {} ON {}.id = {}.{}",
                        join_type, embed.table, alias, alias, BASE_ALIAS, local_column
                    ))
                }
                EmbedKind::ToMany { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build WHERE clause from conditions, qualifying bare fields with `alias`
    pub fn build_where_clause(
        conditions: &[QueryFilter],
        alias: &str,
        values: &mut Vec<Value>,
    ) -> String {
        if conditions.is_empty() {
            return String::new();
        }

        let conditions_sql = conditions
            .iter()
            .map(|condition| Self::build_condition_sql(condition, alias, values))
            .collect::<Vec<_>>()
            .join(" AND ");

        format!("WHERE {}", conditions_sql)
    }

    fn build_condition_sql(filter: &QueryFilter, alias: &str, values: &mut Vec<Value>) -> String {
        match filter {
            QueryFilter::Condition(condition) => {
                Self::build_single_condition_sql(condition, alias, values)
            }
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    return match operator {
                        LogicalOperator::And => "TRUE".to_string(),
                        LogicalOperator::Or => "FALSE".to_string(),
                    };
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_condition_sql(f, alias, values))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }

    fn qualify(field: &str, alias: &str) -> String {
        if field.contains('.') {
            field.to_string()
        } else {
            format!("{}.{}", alias, field)
        }
    }

    fn push_param(values: &mut Vec<Value>, value: Value) -> String {
        values.push(value);
        format!("${}", values.len())
    }

    fn build_single_condition_sql(
        condition: &QueryCondition,
        alias: &str,
        values: &mut Vec<Value>,
    ) -> String {
        let field = Self::qualify(&condition.field, alias);

        match (&condition.operator, &condition.value) {
            (QueryOperator::Eq, None) => format!("{} IS NULL", field),
            (QueryOperator::Ne, None) => format!("{} IS NOT NULL", field),
            (QueryOperator::IsNull, _) => format!("{} IS NULL", field),
            (QueryOperator::IsNotNull, _) => format!("{} IS NOT NULL", field),
            (QueryOperator::In, Some(Value::Array(items))) => {
                if items.is_empty() {
                    return "FALSE".to_string();
                }
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| Self::push_param(values, item.clone()))
                    .collect();
                format!("{} IN ({})", field, placeholders.join(", "))
            }
            (QueryOperator::NotIn, Some(Value::Array(items))) => {
                if items.is_empty() {
                    return "TRUE".to_string();
                }
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|item| Self::push_param(values, item.clone()))
                    .collect();
                format!("{} NOT IN ({})", field, placeholders.join(", "))
            }
            (QueryOperator::In, _) => "FALSE".to_string(),
            (QueryOperator::NotIn, _) => "TRUE".to_string(),
            (operator, Some(value)) => match operator.comparison_sql() {
                Some(op) => {
                    let param = Self::push_param(values, value.clone());
                    format!("{} {} {}", field, op, param)
                }
                None => "FALSE".to_string(),
            },
            (_, None) => "FALSE".to_string(),
        }
    }

    pub fn build_order_clause(order_by: &[(String, SortOrder)], alias: &str) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", Self::qualify(field, alias), order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        let mut clauses = Vec::new();

        if let Some(limit) = limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }

        clauses.join(" ")
    }
}
