use super::*;
use crate::usage::SchemaStat;

const COMPOSITE_QUERY: &str =
    "SELECT * FROM orders WHERE customer_id = 1 AND order_date > '2023-01-01'";

fn find<'a>(entries: &'a [UsageEntry], columns: &[&str], usage_type: UsageType) -> &'a UsageEntry {
    entries
        .iter()
        .find(|e| e.usage_type() == usage_type && e.columns() == columns)
        .unwrap_or_else(|| panic!("no {:?} entry for {:?}", usage_type, columns))
}

mod aggregation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_accumulate_across_calls() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze("SELECT * FROM users WHERE email = 'a'");
        let once = analyzer.table_stats("users").unwrap().column_filter_counts["email"];

        analyzer.analyze("SELECT * FROM users WHERE email = 'a'");
        let twice = analyzer.table_stats("users").unwrap().column_filter_counts["email"];

        assert_eq!(once, 1);
        assert_eq!(twice, 2);
        assert_eq!(analyzer.queries_analyzed(), 2);
    }

    #[test]
    fn test_composite_frequency() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze_batch(std::iter::repeat_n(COMPOSITE_QUERY, 6));

        let stats = analyzer.get_usage_stats();
        let orders = &stats["orders"];
        let composite = find(
            orders,
            &["customer_id", "order_date"],
            UsageType::CompositeFilter,
        );
        assert_eq!(composite.frequency(), 6);
        assert_eq!(composite.source(), "WHERE_CLAUSE (composite)");
        assert!(composite.is_composite());

        let single = find(orders, &["customer_id"], UsageType::FilterHighCardinality);
        assert_eq!(single.frequency(), 6);
        assert_eq!(single.source(), "WHERE_CLAUSE (single)");
    }

    #[test]
    fn test_join_keys_counted_per_table() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze("SELECT * FROM a JOIN b ON a.id = b.a_id");

        assert_eq!(
            analyzer.table_stats("a").unwrap().column_join_counts["id"],
            1
        );
        assert_eq!(
            analyzer.table_stats("b").unwrap().column_join_counts["a_id"],
            1
        );
        assert_eq!(analyzer.tables(), vec!["a", "b"]);
    }

    #[test]
    fn test_reference_and_write_counts() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze("UPDATE accounts SET balance = 0 WHERE id = 1");
        analyzer.analyze("SELECT * FROM accounts");
        analyzer.analyze("DELETE FROM accounts WHERE id = 2");

        let stats = analyzer.table_stats("accounts").unwrap();
        assert_eq!(stats.query_reference_count, 3);
        assert_eq!(stats.write_statement_count, 2);
        assert_eq!(analyzer.write_statement_count("accounts"), 2);
        assert_eq!(analyzer.write_statement_count("missing"), 0);
    }

    #[test]
    fn test_total_column_count_spans_roles() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze("SELECT * FROM events WHERE created_at > '2024-01-01' ORDER BY created_at");

        let stats = analyzer.table_stats("events").unwrap();
        assert_eq!(stats.total_column_count("created_at"), 2);
        assert_eq!(stats.total_column_count("missing"), 0);
    }

    #[test]
    fn test_analyze_script() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        let count = analyzer.analyze_script(
            "SELECT * FROM t WHERE a = 1;\nSELECT * FROM t ORDER BY b;\n-- done\n",
        );

        assert_eq!(count, 3);
        assert_eq!(analyzer.queries_analyzed(), 3);
        let stats = analyzer.table_stats("t").unwrap();
        assert_eq!(stats.column_filter_counts["a"], 1);
        assert_eq!(stats.column_order_counts["b"], 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze(COMPOSITE_QUERY);
        analyzer.reset();

        assert!(analyzer.get_usage_stats().is_empty());
        assert!(analyzer.tables().is_empty());
        assert_eq!(analyzer.queries_analyzed(), 0);
    }

    #[test]
    fn test_table_names_are_case_insensitive() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze_batch(std::iter::repeat_n("SELECT * FROM Orders WHERE status = 1", 3));
        analyzer.analyze_batch(std::iter::repeat_n("select * from orders where status = 1", 3));
        analyzer.analyze("DELETE FROM ORDERS WHERE id = 1");

        assert_eq!(analyzer.tables(), vec!["Orders"]);
        let stats = analyzer.table_stats("orders").unwrap();
        assert_eq!(stats.column_filter_counts["status"], 6);
        assert_eq!(stats.query_reference_count, 7);
        assert_eq!(analyzer.write_statement_count("oRdErS"), 1);
        assert_eq!(analyzer.get_usage_stats().len(), 1);
    }

    #[test]
    fn test_tables_without_column_usage_are_omitted() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze("SELECT * FROM plain");

        assert_eq!(analyzer.tables(), vec!["plain"]);
        assert!(analyzer.get_usage_stats().is_empty());
    }
}

mod selectivity_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> SchemaStatistics {
        SchemaStatistics::new().with_table(
            SchemaStat::new("orders", 10_000)
                .with_column("status", 5)
                .with_column("customer_id", 8_000)
                .with_column("order_date", 2_000),
        )
    }

    #[test]
    fn test_filter_cardinality_classification() {
        let mut analyzer = ColumnUsageAnalyzer::new().with_schema_stats(schema());
        analyzer.analyze("SELECT * FROM orders WHERE status = 'open' OR customer_id = 3 OR note = 'x'");

        let stats = analyzer.get_usage_stats();
        let orders = &stats["orders"];

        let status = find(orders, &["status"], UsageType::FilterLowCardinality);
        assert_eq!(status.selectivity(), Some(0.0005));

        let customer = find(orders, &["customer_id"], UsageType::FilterHighCardinality);
        assert_eq!(customer.selectivity(), Some(0.8));

        let note = find(orders, &["note"], UsageType::FilterHighCardinality);
        assert_eq!(note.selectivity(), None);
    }

    #[test]
    fn test_composite_selectivity_is_member_minimum() {
        let mut analyzer = ColumnUsageAnalyzer::new().with_schema_stats(schema());
        analyzer.analyze(COMPOSITE_QUERY);

        let stats = analyzer.get_usage_stats();
        let composite = find(
            &stats["orders"],
            &["customer_id", "order_date"],
            UsageType::CompositeFilter,
        );
        assert_eq!(composite.selectivity(), Some(0.2));
    }

    #[test]
    fn test_composite_selectivity_unknown_if_any_member_unknown() {
        let mut analyzer = ColumnUsageAnalyzer::new().with_schema_stats(schema());
        analyzer.analyze("SELECT * FROM orders WHERE status = 'open' AND region = 'EU'");

        let stats = analyzer.get_usage_stats();
        let composite = find(
            &stats["orders"],
            &["region", "status"],
            UsageType::CompositeFilter,
        );
        assert_eq!(composite.selectivity(), None);
    }

    #[test]
    fn test_custom_low_cardinality_threshold() {
        let mut analyzer = ColumnUsageAnalyzer::new()
            .with_schema_stats(schema())
            .with_low_cardinality_threshold(0.9);
        analyzer.analyze("SELECT * FROM orders WHERE customer_id = 3");

        let stats = analyzer.get_usage_stats();
        find(&stats["orders"], &["customer_id"], UsageType::FilterLowCardinality);
    }
}

mod merge_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queries() -> Vec<String> {
        let mut queries = Vec::new();
        for i in 0..40 {
            queries.push(format!("SELECT * FROM users WHERE id = {}", i));
            queries.push(COMPOSITE_QUERY.to_string());
            queries.push("SELECT * FROM a JOIN b ON a.id = b.a_id ORDER BY a.created_at".to_string());
            queries.push("UPDATE orders SET status = 'x' WHERE id = 1".to_string());
        }
        queries
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let queries = queries();

        let mut sequential = ColumnUsageAnalyzer::new();
        sequential.analyze_batch(&queries);

        let mut parallel = ColumnUsageAnalyzer::new();
        parallel.analyze_batch_parallel(&queries);

        assert_eq!(parallel.aggregate(), sequential.aggregate());
        assert_eq!(parallel.get_usage_stats(), sequential.get_usage_stats());
    }

    #[test]
    fn test_merge_independent_analyzers() {
        let queries = queries();
        let (left, right) = queries.split_at(queries.len() / 2);

        let mut first = ColumnUsageAnalyzer::new();
        first.analyze_batch(left);
        let mut second = ColumnUsageAnalyzer::new();
        second.analyze_batch(right);
        first.merge(second);

        let mut whole = ColumnUsageAnalyzer::new();
        whole.analyze_batch(&queries);

        assert_eq!(first.aggregate(), whole.aggregate());
    }

    #[test]
    fn test_usage_entry_serialization() {
        let mut analyzer = ColumnUsageAnalyzer::new();
        analyzer.analyze(COMPOSITE_QUERY);

        let json = serde_json::to_value(analyzer.get_usage_stats()).unwrap();
        let orders = json["orders"].as_array().unwrap();

        assert_eq!(orders[0]["usage_type"], "COMPOSITE_FILTER");
        assert_eq!(orders[0]["columns"][1], "order_date");
        assert_eq!(orders[1]["usage_type"], "FILTER_HIGH_CARDINALITY");
        assert_eq!(orders[1]["column"], "customer_id");
        assert!(orders[1]["selectivity"].is_null());
    }
}
