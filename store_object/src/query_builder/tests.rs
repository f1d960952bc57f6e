//! Query builder tests

#[cfg(test)]
mod tests {
    use crate::errors::StoreError;
    use crate::query_builder::{CountMode, Embed, QueryBuilder, QueryFilter, SortOrder};
    use serde_json::json;

    // ========================================
    // Filters
    // ========================================

    #[test]
    fn test_contains_escapes_wildcards() {
        let filter = QueryFilter::contains("name", "50%_off\\");
        match filter {
            QueryFilter::Condition(condition) => {
                assert_eq!(condition.value, Some(json!("%50\\%\\_off\\\\%")));
            }
            _ => panic!("expected a condition"),
        }
    }

    #[test]
    fn test_fields_walks_groups() {
        let filter = QueryFilter::and(vec![
            QueryFilter::eq("status", json!("active")),
            QueryFilter::or(vec![
                QueryFilter::contains("name", "rose"),
                QueryFilter::contains("description", "rose"),
            ]),
        ]);
        assert_eq!(filter.fields(), vec!["status", "name", "description"]);
    }

    // ========================================
    // SELECT generation
    // ========================================

    #[test]
    fn test_plain_select() {
        let (sql, values) = QueryBuilder::new("enhanced_products").build_select().unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) AS __row__ FROM enhanced_products AS t"
        );
        assert!(values.is_empty());
    }

    #[test]
    fn test_select_with_filters_order_and_limit() {
        let query = QueryBuilder::new("enhanced_products")
            .filter(QueryFilter::eq("brand_id", json!("b1")))
            .filter(QueryFilter::gte("price", json!(10)))
            .filter(QueryFilter::lte("price", json!(50)))
            .order_by("featured", SortOrder::Desc)
            .order_by("created_at", SortOrder::Desc)
            .limit(20)
            .offset(40);

        let (sql, values) = query.build_select().unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) AS __row__ FROM enhanced_products AS t \
             WHERE t.brand_id = $1 AND t.price >= $2 AND t.price <= $3 \
             ORDER BY t.featured DESC, t.created_at DESC LIMIT 20 OFFSET 40"
        );
        assert_eq!(values, vec![json!("b1"), json!(10), json!(50)]);
    }

    #[test]
    fn test_or_group_and_null_checks() {
        let query = QueryBuilder::new("enhanced_brands")
            .filter(QueryFilter::or(vec![
                QueryFilter::contains("name", "aqua"),
                QueryFilter::contains("description", "aqua"),
            ]))
            .filter(QueryFilter::is_null("logo_url"));

        let (sql, values) = query.build_select().unwrap();
        assert!(sql.ends_with(
            "WHERE (t.name ILIKE $1 OR t.description ILIKE $2) AND t.logo_url IS NULL"
        ));
        assert_eq!(values, vec![json!("%aqua%"), json!("%aqua%")]);
    }

    #[test]
    fn test_empty_in_and_groups() {
        let query = QueryBuilder::new("enhanced_orders")
            .filter(QueryFilter::in_values("status", vec![]))
            .filter(QueryFilter::not_in_values("status", vec![]))
            .filter(QueryFilter::and(vec![]))
            .filter(QueryFilter::or(vec![]));

        let (sql, values) = query.build_select().unwrap();
        assert!(sql.ends_with("WHERE FALSE AND TRUE AND TRUE AND FALSE"));
        assert!(values.is_empty());
    }

    #[test]
    fn test_in_values_numbering() {
        let query = QueryBuilder::new("enhanced_orders")
            .filter(QueryFilter::in_values(
                "status",
                vec![json!("pending"), json!("paid")],
            ))
            .filter(QueryFilter::eq("customer_id", json!("c1")));

        let (sql, _) = query.build_select().unwrap();
        assert!(sql.ends_with("WHERE t.status IN ($1, $2) AND t.customer_id = $3"));
    }

    #[test]
    fn test_count_ignores_order_and_limit() {
        let query = QueryBuilder::new("enhanced_products")
            .filter(QueryFilter::eq("featured", json!(true)))
            .order_by("created_at", SortOrder::Desc)
            .limit(5)
            .count(CountMode::Exact);

        let (sql, values) = query.build_count().unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM enhanced_products AS t WHERE t.featured = $1"
        );
        assert_eq!(values, vec![json!(true)]);
    }

    // ========================================
    // Embeds
    // ========================================

    #[test]
    fn test_to_one_embed() {
        let query = QueryBuilder::new("enhanced_products")
            .embed(Embed::to_one("enhanced_categories", "category_id").columns(&["name", "slug"]))
            .filter(QueryFilter::eq("status", json!("active")));

        let (sql, values) = query.build_select().unwrap();
        assert_eq!(
            sql,
            "SELECT to_jsonb(t) || jsonb_build_object('enhanced_categories', \
             CASE WHEN e0.id IS NULL THEN NULL ELSE jsonb_build_object('name', e0.name, 'slug', e0.slug) END) \
             AS __row__ FROM enhanced_products AS t \
             LEFT JOIN enhanced_categories AS e0 ON e0.id = t.category_id \
             WHERE t.status = $1"
        );
        assert_eq!(values, vec![json!("active")]);
    }

    #[test]
    fn test_to_many_embed_numbers_parameters_first() {
        let query = QueryBuilder::new("enhanced_products")
            .filter(QueryFilter::eq("id", json!("p1")))
            .embed(
                Embed::to_many("product_reviews", "product_id")
                    .filter(QueryFilter::eq("status", json!("approved"))),
            );

        let (sql, values) = query.build_select().unwrap();
        assert!(sql.contains(
            "COALESCE((SELECT jsonb_agg(to_jsonb(e0)) FROM product_reviews AS e0 \
             WHERE e0.product_id = t.id AND e0.status = $1), '[]'::jsonb)"
        ));
        assert!(sql.ends_with("WHERE t.id = $2"));
        assert_eq!(values, vec![json!("approved"), json!("p1")]);
    }

    #[test]
    fn test_inner_embed_is_counted() {
        let query = QueryBuilder::new("enhanced_products")
            .embed(Embed::to_one("enhanced_brands", "brand_id").inner());

        let (sql, _) = query.build_count().unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM enhanced_products AS t \
             INNER JOIN enhanced_brands AS e0 ON e0.id = t.brand_id"
        );
    }

    // ========================================
    // Validation
    // ========================================

    #[test]
    fn test_rejects_unsafe_identifiers() {
        assert!(matches!(
            QueryBuilder::new("").build_select(),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            QueryBuilder::new("enhanced_products")
                .order_by("price; DROP TABLE x", SortOrder::Asc)
                .build_select(),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            QueryBuilder::new("enhanced_products")
                .filter(QueryFilter::eq("name OR 1=1", json!(1)))
                .build_count(),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_negative_limit() {
        let result = QueryBuilder::new("enhanced_products").limit(-1).validate();
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_qualified_fields_are_kept() {
        let query = QueryBuilder::new("enhanced_products")
            .embed(Embed::to_one("enhanced_brands", "brand_id"))
            .filter(QueryFilter::eq("e0.slug", json!("aqua")));

        let (sql, _) = query.build_select().unwrap();
        assert!(sql.ends_with("WHERE e0.slug = $1"));
    }
}
