//! Builder-level tests for the select module.

use super::*;
use crate::column::Aggregate;
use crate::filter::CompareOp;
use crate::template::TemplateArg;
use std::time::Duration;

fn config() -> Arc<RenderConfig> {
    Arc::new(RenderConfig::new())
}

fn contact() -> TableRef {
    TableRef::physical("dbo.Contact").unwrap()
}

fn sql(builder: &SelectBuilder) -> String {
    builder.render().unwrap().command_text().to_string()
}

#[test]
fn test_select_star() {
    let qb = SelectBuilder::new(contact(), config());
    assert_eq!(sql(&qb), "SELECT * FROM [dbo].[Contact] AS [t0];");
}

#[test]
fn test_fork_leaves_original_untouched() {
    let base = SelectBuilder::new(contact(), config());
    let narrowed = base
        .where_all(|w| {
            w.eq("LastName", "Buchanan");
        })
        .unwrap();
    let sorted = base.order_by("LastName", SortDirection::Asc).unwrap();

    assert!(base.filters().is_empty());
    assert!(base.order_by_entries().is_empty());
    assert_eq!(narrowed.filters().len(), 1);
    assert!(narrowed.order_by_entries().is_empty());
    assert_eq!(sorted.order_by_entries().len(), 1);
    assert!(sorted.filters().is_empty());
    assert!(base.table().ptr_eq(sorted.table()));
}

#[test]
fn test_column_alias_and_distinct() {
    let qb = SelectBuilder::new(contact(), config())
        .select("LastName AS Surname")
        .unwrap()
        .select("FirstName")
        .unwrap()
        .distinct();
    assert!(qb.is_distinct());
    assert_eq!(
        sql(&qb),
        "SELECT DISTINCT [t0].[LastName] AS [Surname],[t0].[FirstName] FROM [dbo].[Contact] AS [t0];"
    );
}

#[test]
fn test_bad_column_expression() {
    let err = SelectBuilder::new(contact(), config())
        .select("LastName Surname Extra")
        .unwrap_err();
    assert!(matches!(err, SqlError::InvalidColumnExpression(_)));
}

#[test]
fn test_expression_column() {
    let qb = SelectBuilder::new(contact(), config()).column(
        Column::expression("{0}.[Price] * {0}.[Qty]")
            .unwrap()
            .with_alias("Total"),
    );
    assert_eq!(
        sql(&qb),
        "SELECT ([t0].[Price] * [t0].[Qty]) AS [Total] FROM [dbo].[Contact] AS [t0];"
    );
}

#[test]
fn test_inner_join() {
    let contact = contact();
    let orders = TableRef::physical("dbo.Orders").unwrap();
    let qb = SelectBuilder::new(contact.clone(), config())
        .join(JoinKind::Inner, &orders, |on| {
            on.column_compare("ContactID", CompareOp::Eq, &contact, "ContactID");
        })
        .unwrap();
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] \
         INNER JOIN [dbo].[Orders] AS [t1] ON ([t1].[ContactID]=[t0].[ContactID]);"
    );
    assert!(qb.render().unwrap().parameters().is_empty());
}

#[test]
fn test_left_join_with_two_conditions() {
    let contact = contact();
    let orders = TableRef::physical("dbo.Orders").unwrap();
    let qb = SelectBuilder::new(contact.clone(), config())
        .join(JoinKind::Left, &orders, |on| {
            on.column_compare("ContactID", CompareOp::Eq, &contact, "ContactID")
                .ge("Total", 100i32);
        })
        .unwrap();
    let stmt = qb.render().unwrap();
    assert_eq!(
        stmt.command_text(),
        "SELECT * FROM [dbo].[Contact] AS [t0] LEFT JOIN [dbo].[Orders] AS [t1] \
         ON ([t1].[ContactID]=[t0].[ContactID]) AND ([t1].[Total]>=@p0);"
    );
    assert_eq!(stmt.value("p0"), Some(&SqlValue::Int32(100)));
}

#[test]
fn test_cross_join() {
    let region = TableRef::physical("dbo.Region").unwrap();
    let qb = SelectBuilder::new(contact(), config()).cross_join(&region);
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] CROSS JOIN [dbo].[Region] AS [t1];"
    );
}

#[test]
fn test_join_condition_error_is_surfaced() {
    let orders = TableRef::physical("dbo.Orders").unwrap();
    let err = SelectBuilder::new(contact(), config())
        .join(JoinKind::Inner, &orders, |on| {
            on.template("{0", Vec::<TemplateArg>::new());
        })
        .unwrap_err();
    assert!(matches!(err, SqlError::InvalidTemplate(_)));
}

#[test]
fn test_group_by_inferred_from_aggregates() {
    let qb = SelectBuilder::new(contact(), config())
        .column(Column::new("City").unwrap())
        .column(Column::new("ContactID").unwrap().with_aggregate(Aggregate::Count))
        .column(
            Column::new("Total")
                .unwrap()
                .with_aggregate(Aggregate::Sum)
                .with_alias("Spent"),
        );
    assert_eq!(
        sql(&qb),
        "SELECT [t0].[City],COUNT([t0].[ContactID]) AS [ContactID],SUM([t0].[Total]) AS [Spent] \
         FROM [dbo].[Contact] AS [t0] GROUP BY [t0].[City];"
    );
}

#[test]
fn test_no_group_by_without_aggregates() {
    let qb = SelectBuilder::new(contact(), config())
        .select_columns(["City", "Region"])
        .unwrap();
    assert!(!sql(&qb).contains("GROUP BY"));
}

#[test]
fn test_where_all_flattens_into_top_level() {
    let qb = SelectBuilder::new(contact(), config())
        .where_all(|w| {
            w.eq("LastName", "Buchanan");
        })
        .unwrap()
        .where_all(|w| {
            w.gt("Age", 30i32).is_not_null("Email");
        })
        .unwrap();
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] WHERE ([t0].[LastName]=@p0) \
         AND ([t0].[Age]>@p1) AND ([t0].[Email] IS NOT NULL);"
    );
}

#[test]
fn test_where_any_is_one_group() {
    let qb = SelectBuilder::new(contact(), config())
        .where_all(|w| {
            w.eq("Active", true);
        })
        .unwrap()
        .where_any(|w| {
            w.starts_with("LastName", "Bu").starts_with("LastName", "Da");
        })
        .unwrap();
    let stmt = qb.render().unwrap();
    assert_eq!(
        stmt.command_text(),
        "SELECT * FROM [dbo].[Contact] AS [t0] WHERE ([t0].[Active]=@p0) \
         AND (([t0].[LastName] LIKE @p1) OR ([t0].[LastName] LIKE @p2));"
    );
    assert_eq!(stmt.value("p2"), Some(&SqlValue::from("Da%")));
}

#[test]
fn test_where_any_each() {
    let people = [("Smith", 30i32), ("Jones", 40i32)];
    let qb = SelectBuilder::new(contact(), config())
        .where_any_each(people, |w, (name, age)| {
            w.eq("LastName", name).eq("Age", age);
        })
        .unwrap();
    let stmt = qb.render().unwrap();
    assert_eq!(
        stmt.command_text(),
        "SELECT * FROM [dbo].[Contact] AS [t0] WHERE \
         ((([t0].[LastName]=@p0) AND ([t0].[Age]=@p1)) OR (([t0].[LastName]=@p2) AND ([t0].[Age]=@p3)));"
    );
    assert_eq!(stmt.value("p2"), Some(&SqlValue::from("Jones")));
    assert_eq!(stmt.value("p3"), Some(&SqlValue::Int32(40)));
}

#[test]
fn test_nested_groups_in_callback() {
    let qb = SelectBuilder::new(contact(), config())
        .where_all(|w| {
            w.eq("Active", 1i32).any(|w| {
                w.is_null("Email").all(|w| {
                    w.contains("Email", "example").lt("Age", 18i32);
                });
            });
        })
        .unwrap();
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] WHERE ([t0].[Active]=@p0) AND \
         (([t0].[Email] IS NULL) OR (([t0].[Email] LIKE @p1) AND ([t0].[Age]<@p2)));"
    );
}

#[test]
fn test_exists_shares_alias_registry() {
    let contact = contact();
    let orders = TableRef::physical("dbo.Orders").unwrap();
    let sub = SelectBuilder::new(orders, config())
        .where_all(|w| {
            w.column_compare("ContactID", CompareOp::Eq, &contact, "ContactID");
        })
        .unwrap();
    let qb = SelectBuilder::new(contact.clone(), config())
        .where_all(|w| {
            w.exists(&sub);
        })
        .unwrap();
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] WHERE (EXISTS (SELECT * FROM [dbo].[Orders] AS [t1] \
         WHERE ([t1].[ContactID]=[t0].[ContactID])));"
    );
}

#[test]
fn test_not_in_sub_query() {
    let orders = TableRef::physical("dbo.Orders").unwrap();
    let qb = SelectBuilder::new(contact(), config())
        .where_all(|w| {
            w.not_in_sub_query("ContactID", &orders, "ContactID", |s| {
                s.eq("Status", 4i32);
            });
        })
        .unwrap();
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] WHERE ([t0].[ContactID] NOT IN \
         (SELECT [t1].[ContactID] FROM [dbo].[Orders] AS [t1] WHERE ([t1].[Status]=@p0)));"
    );
}

#[test]
fn test_sub_query_as_table() {
    let inner = SelectBuilder::new(contact(), config())
        .select("LastName")
        .unwrap();
    let qb = SelectBuilder::new(inner.as_table(), config());
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT [t1].[LastName] FROM [dbo].[Contact] AS [t1]) AS [t0];"
    );
}

#[test]
fn test_paging_requires_order_by() {
    let qb = SelectBuilder::new(contact(), config());
    assert!(matches!(qb.limit(10, 0), Err(SqlError::PagingWithoutOrderBy)));

    let ordered = qb.order_by("LastName", SortDirection::Asc).unwrap();
    assert!(matches!(
        ordered.limit(-1, 0),
        Err(SqlError::InvalidPaging(_))
    ));
    assert!(ordered.limit(10, 0).is_ok());
}

#[test]
fn test_paging_clauses() {
    let ordered = SelectBuilder::new(contact(), config())
        .order_by("LastName", SortDirection::Asc)
        .unwrap();

    let page = ordered.limit(10, 20).unwrap();
    assert_eq!(
        sql(&page),
        "SELECT * FROM [dbo].[Contact] AS [t0] ORDER BY [LastName] ASC \
         OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY;"
    );
    assert_eq!(page.paging(), Some(Paging { limit: 10, offset: 20 }));

    let first = ordered.limit(10, 0).unwrap();
    assert_eq!(
        sql(&first),
        "SELECT * FROM [dbo].[Contact] AS [t0] ORDER BY [LastName] ASC FETCH NEXT 10 ROWS ONLY;"
    );

    let skip = ordered.limit(0, 5).unwrap();
    assert_eq!(
        sql(&skip),
        "SELECT * FROM [dbo].[Contact] AS [t0] ORDER BY [LastName] ASC OFFSET 5 ROWS;"
    );
}

#[test]
fn test_order_by_multiple_and_raw() {
    let qb = SelectBuilder::new(contact(), config())
        .order_by("LastName", SortDirection::Asc)
        .unwrap()
        .order_by("FirstName", SortDirection::Desc)
        .unwrap()
        .order_by_raw("LEN(Email)", SortDirection::Asc);
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] ORDER BY [LastName] ASC,[FirstName] DESC,LEN(Email) ASC;"
    );
}

#[test]
fn test_parse_lifts_order_by() {
    let qb = SelectBuilder::parse(
        "SELECT * FROM Products ORDER BY ProductName DESC, LEN(Code)",
        config(),
    )
    .unwrap();
    let entries = qb.order_by_entries();
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0].expr(), OrderExpr::Column(_)));
    assert_eq!(entries[0].direction(), Some(SortDirection::Desc));
    assert!(matches!(entries[1].expr(), OrderExpr::Raw(r) if r == "LEN(Code)"));
    assert_eq!(entries[1].direction(), None);
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT * FROM Products ) AS [t0] ORDER BY [ProductName] DESC,LEN(Code);"
    );
}

#[test]
fn test_parse_uses_last_order_by() {
    let qb = SelectBuilder::parse(
        "SELECT TOP 5 * FROM (SELECT * FROM T ORDER BY A) x order by B",
        config(),
    )
    .unwrap();
    assert_eq!(qb.order_by_entries().len(), 1);
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT TOP 5 * FROM (SELECT * FROM T ORDER BY A) x ) AS [t0] ORDER BY [B];"
    );
}

#[test]
fn test_parse_keeps_nested_order_by() {
    let qb = SelectBuilder::parse("SELECT * FROM (SELECT TOP 5 * FROM T ORDER BY A) x", config())
        .unwrap();
    assert!(qb.order_by_entries().is_empty());
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT * FROM (SELECT TOP 5 * FROM T ORDER BY A) x) AS [t0];"
    );
}

#[test]
fn test_parse_ignores_order_by_in_literal() {
    let qb = SelectBuilder::parse("SELECT * FROM T WHERE Note = 'order by me'", config()).unwrap();
    assert!(qb.order_by_entries().is_empty());
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT * FROM T WHERE Note = 'order by me') AS [t0];"
    );
}

#[test]
fn test_parse_order_by_with_trailing_keywords_is_raw() {
    let qb = SelectBuilder::parse("SELECT * FROM T ORDER BY A OFFSET 10 ROWS", config()).unwrap();
    let entries = qb.order_by_entries();
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0].expr(), OrderExpr::Raw(r) if r == "A OFFSET 10 ROWS"));
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT * FROM T ) AS [t0] ORDER BY A OFFSET 10 ROWS;"
    );
}

#[test]
fn test_parse_bracketed_order_by_with_space_is_column() {
    let qb = SelectBuilder::parse("SELECT * FROM T ORDER BY [Product Name] DESC", config())
        .unwrap();
    let entries = qb.order_by_entries();
    assert!(matches!(entries[0].expr(), OrderExpr::Column(_)));
    assert_eq!(
        sql(&qb),
        "SELECT * FROM (SELECT * FROM T ) AS [t0] ORDER BY [Product Name] DESC;"
    );
}

#[test]
fn test_parse_without_order_by() {
    let qb = SelectBuilder::parse("SELECT 1 AS x;", config()).unwrap();
    assert!(qb.order_by_entries().is_empty());
    assert_eq!(sql(&qb), "SELECT * FROM (SELECT 1 AS x) AS [t0];");
}

#[test]
fn test_parse_plain_table_name() {
    let qb = SelectBuilder::parse("dbo.Contact ORDER BY LastName ASC", config()).unwrap();
    assert_eq!(
        sql(&qb),
        "SELECT * FROM [dbo].[Contact] AS [t0] ORDER BY [LastName] ASC;"
    );
}

#[test]
fn test_prefix_and_suffix() {
    let qb = SelectBuilder::new(contact(), config())
        .prefix("SET NOCOUNT ON")
        .suffix("SELECT @@ROWCOUNT;");
    assert_eq!(
        sql(&qb),
        "SET NOCOUNT ON; SELECT * FROM [dbo].[Contact] AS [t0]; SELECT @@ROWCOUNT;"
    );
}

#[test]
fn test_without_terminator() {
    let qb = SelectBuilder::new(contact(), config()).without_terminator();
    assert_eq!(sql(&qb), "SELECT * FROM [dbo].[Contact] AS [t0]");
}

#[test]
fn test_pretty_layout() {
    let qb = SelectBuilder::new(contact(), config())
        .select_columns(["LastName", "FirstName"])
        .unwrap()
        .where_all(|w| {
            w.eq("LastName", "Buchanan");
        })
        .unwrap()
        .order_by("LastName", SortDirection::Asc)
        .unwrap()
        .pretty(true);
    assert_eq!(
        sql(&qb),
        "SELECT [t0].[LastName],\n    [t0].[FirstName]\n\
         FROM [dbo].[Contact] AS [t0]\n\
         WHERE ([t0].[LastName]=@p0)\n\
         ORDER BY [LastName] ASC;"
    );
}

#[test]
fn test_pretty_from_config() {
    let config = Arc::new(RenderConfig::new().with_pretty(true));
    let qb = SelectBuilder::new(contact(), config);
    assert_eq!(sql(&qb), "SELECT *\nFROM [dbo].[Contact] AS [t0];");
    assert_eq!(
        sql(&qb.pretty(false)),
        "SELECT * FROM [dbo].[Contact] AS [t0];"
    );
}

#[test]
fn test_named_parameters_come_first() {
    let qb = SelectBuilder::parse("SELECT * FROM Contact WHERE Region = @region", config())
        .unwrap()
        .add_parameter("@region", "WA", DbType::String)
        .where_all(|w| {
            w.eq("Age", 30i32);
        })
        .unwrap();
    let stmt = qb.render().unwrap();
    assert_eq!(
        stmt.command_text(),
        "SELECT * FROM (SELECT * FROM Contact WHERE Region = @region) AS [t0] WHERE ([t0].[Age]=@p0);"
    );
    let names: Vec<&str> = stmt.parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["region", "p0"]);
}

#[test]
fn test_timeout_is_carried() {
    let qb = SelectBuilder::new(contact(), config()).timeout(Duration::from_secs(45));
    assert_eq!(qb.render().unwrap().timeout(), Some(Duration::from_secs(45)));
}

#[test]
fn test_render_is_repeatable() {
    let qb = SelectBuilder::new(contact(), config())
        .where_all(|w| {
            w.eq("LastName", "Buchanan").in_list("ContactID", [1i32, 2]);
        })
        .unwrap();
    assert_eq!(qb.render().unwrap(), qb.render().unwrap());
}
