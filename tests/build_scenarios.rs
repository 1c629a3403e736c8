use criterium::{
    BindValue, CriteriaState, FilterCriteria, QuerySource, Result, SortOrder, SqlStatement,
    TableBinding,
};

/// Admin-grid style source over an orders table: lazily-registered joins and
/// a computed column declared in the one-time init hook.
struct OrdersSource;

impl QuerySource for OrdersSource {
    fn query_template(&self) -> String {
        "SELECT {WHAT} FROM orders {JOINS} {WHERE} {GROUPBY} {ORDERBY} {LIMIT}".to_string()
    }

    fn base_select(&self) -> Vec<String> {
        vec!["orders.id".to_string(), "orders.number".to_string(), "orders.total".to_string()]
    }

    fn search_fields(&self) -> Vec<String> {
        vec!["orders.number".to_string(), "customers.name".to_string()]
    }

    fn count_column(&self) -> String {
        "orders.id".to_string()
    }

    fn init(&self, criteria: &mut CriteriaState) -> Result<()> {
        criteria.joins.add(
            "LEFT JOIN customers ON customers.id = orders.customer_id",
            Some("customers"),
        );
        criteria
            .joins
            .register("items", "LEFT JOIN order_items i ON i.order_id = orders.id")?
            .requires("customers");
        criteria.custom.register("item_count_custom", "COUNT(i.id)", &["items"])?;
        Ok(())
    }
}

#[test]
fn grid_listing_with_search_and_paging() {
    let mut crit = FilterCriteria::new(OrdersSource);
    crit.bind_table(&TableBinding {
        table: "orders".to_string(),
        primary_key: "id".to_string(),
        fixed: vec![("shop_id".to_string(), BindValue::Int(3))],
        default_order: Some(("orders.number".to_string(), SortOrder::Desc)),
    })
    .expect("bind table");
    crit.add_search("smith NOT cancelled").expect("search");
    crit.criteria().unwrap().set_limit(20, 10);

    let items = crit.build_items_query().expect("items");
    assert!(items.sql.contains("LEFT JOIN customers ON customers.id = orders.customer_id"));
    assert!(items.sql.contains("orders.shop_id = :PH0001"));
    assert!(items.sql.contains("customers.name LIKE"));
    assert!(items.sql.contains("NOT LIKE"));
    assert!(items.sql.contains("ORDER BY orders.number DESC"));
    assert!(items.sql.contains("LIMIT 20,10"));
    assert_eq!(items.binds.get("PH0001").map(String::as_str), Some("3"));
    assert_eq!(items.binds.get("PH0002").map(String::as_str), Some("%smith%"));

    let count = crit.build_count_query().expect("count");
    assert!(count.sql.contains("COUNT(orders.id)"));
    assert!(!count.sql.contains("ORDER BY"));
    assert!(!count.sql.contains("LIMIT"));
    // both builds share the accumulated placeholders
    assert_eq!(items.binds, count.binds);
}

#[test]
fn ordering_by_computed_column_pulls_dependent_joins() {
    let mut crit = FilterCriteria::new(OrdersSource);
    crit.criteria().unwrap().set_order_by("item_count_custom", SortOrder::Desc);
    crit.criteria().unwrap().add_group_by("orders.id");

    let built = crit.build_items_query().expect("build");
    assert!(built.sql.contains("COUNT(i.id) AS item_count_custom"));
    assert!(built.sql.contains("ORDER BY item_count_custom DESC"));
    // the lazy items join activates, and its own dependency comes first
    let customers_at = built.sql.find("LEFT JOIN customers").expect("customers join");
    let items_at = built.sql.find("LEFT JOIN order_items").expect("items join");
    assert!(customers_at < items_at);
}

#[test]
fn implicit_computed_column_usage_converges() {
    let mut crit = FilterCriteria::new(OrdersSource);
    crit.criteria().unwrap().add_group_by("orders.id");
    let fragment = crit.custom_select("item_count_custom").expect("fragment");
    crit.criteria().unwrap().add_select_column(&fragment);

    let built = crit.build_items_query().expect("build");
    assert_eq!(built.enabled_passes, vec![vec!["item_count_custom".to_string()]]);
    assert_eq!(built.sql.matches("COUNT(i.id) AS item_count_custom").count(), 1);
    assert!(built.sql.contains("LEFT JOIN order_items"));
}

#[test]
fn statement_criteria_serialize_for_execution() {
    let mut crit = FilterCriteria::new(OrdersSource);
    let stmt = SqlStatement::new("orders.created_at > :since").bind(":since", "2024-06-01");
    crit.criteria().unwrap().add_where_statement(&stmt).expect("statement");

    let built = crit.build_items_query().expect("build");
    let json = serde_json::to_value(&built).expect("serialize");
    assert_eq!(json["binds"]["since"], "2024-06-01");
    assert!(json["sql"].as_str().unwrap().contains("orders.created_at > :since"));
}
