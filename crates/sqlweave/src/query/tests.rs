use super::*;
use crate::expression::raw;
use crate::grammar::Dialect;
use crate::value::Operand;

fn query() -> Builder {
    Builder::new(Dialect::Ansi.grammar(""))
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

// ==================== Builder state ====================

#[test]
fn select_replaces_and_add_select_appends() {
    let q = query()
        .table("users")
        .select(["id"])
        .select(["name", "email"])
        .add_select(["votes"]);
    assert_eq!(
        q.columns,
        vec![Ident::from("name"), Ident::from("email"), Ident::from("votes")]
    );
    assert_eq!(q.from, Some(Ident::from("users")));
}

#[test]
fn order_direction_defaults_to_desc_unless_asc() {
    let q = query()
        .order_by("a", "ASC")
        .order_by("b", "desc")
        .order_by("c", "sideways")
        .order_by_desc("d");
    let directions: Vec<_> = q
        .orders
        .iter()
        .filter_map(|o| match o {
            Order::Column { direction, .. } => Some(*direction),
            Order::Raw(_) => None,
        })
        .collect();
    assert_eq!(
        directions,
        [Direction::Asc, Direction::Desc, Direction::Desc, Direction::Desc]
    );
}

#[test]
fn limit_and_offset_bounds() {
    let q = query().limit(-1).offset(-5);
    assert_eq!(q.limit, None);
    assert_eq!(q.offset, Some(0));

    let q = query().limit(10).limit(-3);
    assert_eq!(q.limit, Some(10));
}

#[test]
fn for_page_sets_offset_and_limit() {
    let q = query().for_page(3, 15);
    assert_eq!(q.offset, Some(30));
    assert_eq!(q.limit, Some(15));

    let q = query().for_page(1, 20);
    assert_eq!(q.offset, Some(0));
    assert_eq!(q.limit, Some(20));
}

#[test]
fn clauses_after_union_target_the_union() {
    let q = query()
        .table("users")
        .order_by("name", "asc")
        .union(query().table("admins"))
        .order_by("email", "asc")
        .order_by_raw("field(id, ?)", [7])
        .limit(5)
        .offset(10);
    assert_eq!(q.orders.len(), 1);
    assert_eq!(q.union_orders.len(), 2);
    assert_eq!(q.limit, None);
    assert_eq!(q.union_limit, Some(5));
    assert_eq!(q.union_offset, Some(10));
    assert_eq!(q.bindings.union_order(), &ints(&[7])[..]);
    assert!(q.bindings.get(BindingKind::Union).is_empty());
    assert!(q.bindings.get(BindingKind::Order).is_empty());
}

#[test]
fn lock_conversions() {
    assert_eq!(query().lock(true).lock, Some(Lock::Update));
    assert_eq!(query().lock(false).lock, Some(Lock::Shared));
    assert_eq!(
        query().lock("for update skip locked").lock,
        Some(Lock::Raw("for update skip locked".into()))
    );
    assert_eq!(query().shared_lock().lock, Some(Lock::Shared));
}

#[test]
fn when_applies_conditionally() {
    let q = query()
        .when(true, |q| q.where_eq("a", 1))
        .when(false, |q| q.where_eq("b", 2))
        .when_else(false, |q| q.where_eq("c", 3), |q| q.where_eq("d", 4))
        .when_some(Some("x"), |q, v| q.where_eq("e", v))
        .when_some(None::<i32>, |q, v| q.where_eq("f", v));
    assert_eq!(q.wheres.len(), 3);
    assert_eq!(
        q.get_bindings(),
        vec![Value::Int(1), Value::Int(4), Value::Text("x".into())]
    );
}

// ==================== Bindings ====================

#[test]
fn bindings_are_kept_per_category() {
    let q = query()
        .table("users")
        .select_raw("price * ? as total", [2])
        .join_where("contacts", "contacts.kind", "=", "email")
        .where_eq("active", true)
        .group_by(["account_id"])
        .having("count", ">", 3)
        .order_by_raw("field(id, ?)", [9]);

    assert_eq!(q.bindings.get(BindingKind::Select), &ints(&[2])[..]);
    assert_eq!(
        q.bindings.get(BindingKind::Join),
        &[Value::Text("email".into())][..]
    );
    assert_eq!(q.bindings.get(BindingKind::Where), &[Value::Bool(true)][..]);
    assert_eq!(q.bindings.get(BindingKind::Having), &ints(&[3])[..]);
    assert_eq!(q.bindings.get(BindingKind::Order), &ints(&[9])[..]);
    assert_eq!(
        q.get_bindings(),
        vec![
            Value::Int(2),
            Value::Text("email".into()),
            Value::Bool(true),
            Value::Int(3),
            Value::Int(9),
        ]
    );
}

#[test]
fn add_binding_by_name() {
    let q = query()
        .add_binding([1, 2], BindingKind::Where)
        .add_binding_named(["x"], "having");
    assert_eq!(q.bindings.get(BindingKind::Where), &ints(&[1, 2])[..]);
    assert_eq!(q.bindings.get(BindingKind::Having), &[Value::Text("x".into())][..]);
    assert!(q.validate().is_ok());
}

#[test]
fn unknown_binding_category_is_a_build_error() {
    let q = query().table("users").add_binding_named([1], "bogus");
    let err = q.build_select().unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("Invalid binding type: bogus"));
}

#[test]
fn expressions_are_not_bound() {
    let q = query()
        .where_("created_at", "<", raw("NOW()"))
        .where_in("id", [Operand::from(1), Operand::from(raw("other.id"))]);
    assert_eq!(q.get_bindings(), ints(&[1]));
}

// ==================== where_ rules ====================

#[test]
fn null_value_with_comparison_operator_is_rejected() {
    let q = query().table("users").where_("votes", ">", Value::Null);
    let err = q.validate().unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("Illegal operator and value combination"));
    assert!(q.wheres.is_empty());
}

#[test]
fn null_equality_becomes_null_check() {
    let q = query()
        .where_("deleted_at", "=", None::<i32>)
        .where_("archived_at", "<>", Value::Null)
        .where_("locked_at", "!=", Value::Null);
    assert!(q.get_bindings().is_empty());
    let negations: Vec<bool> = q
        .wheres
        .iter()
        .filter_map(|p| match p {
            Predicate::Null { negated, .. } => Some(*negated),
            _ => None,
        })
        .collect();
    assert_eq!(negations, [false, true, true]);
}

#[test]
fn unknown_operator_is_taken_as_the_value() {
    let q = query().where_("name", "John", Value::Null);
    assert!(q.validate().is_ok());
    match &q.wheres[0] {
        Predicate::Basic {
            operator, value, ..
        } => {
            assert_eq!(operator, "=");
            assert_eq!(value, &Operand::from("John"));
        }
        other => panic!("unexpected predicate: {other:?}"),
    }
    assert_eq!(q.get_bindings(), vec![Value::Text("John".into())]);
}

#[test]
fn operators_are_case_insensitive() {
    let q = query().where_("name", "LIKE", "J%");
    match &q.wheres[0] {
        Predicate::Basic { operator, .. } => assert_eq!(operator, "LIKE"),
        other => panic!("unexpected predicate: {other:?}"),
    }
}

#[test]
fn dialect_operators_extend_the_common_set() {
    let pg = Builder::new(Dialect::Postgres.grammar("")).where_("tags", "@>", "{a}");
    let ansi = query().where_("tags", "@>", "{a}");
    match (&pg.wheres[0], &ansi.wheres[0]) {
        (Predicate::Basic { operator: a, .. }, Predicate::Basic { operator: b, .. }) => {
            assert_eq!(a, "@>");
            assert_eq!(b, "=");
        }
        other => panic!("unexpected predicates: {other:?}"),
    }
    assert_eq!(ansi.get_bindings(), vec![Value::Text("@>".into())]);
}

#[test]
fn json_selector_booleans_are_inlined() {
    let q = query()
        .where_("options->active", "=", true)
        .where_("active", "=", true);
    assert_eq!(q.get_bindings(), vec![Value::Bool(true)]);
    match &q.wheres[0] {
        Predicate::Basic { value, .. } => assert_eq!(value, &Operand::Expr(raw("true"))),
        other => panic!("unexpected predicate: {other:?}"),
    }
}

#[test]
fn nested_errors_reach_the_outer_builder() {
    let q = query()
        .table("users")
        .where_group(|q| q.where_("votes", "<", Value::Null));
    assert!(q.build_select().unwrap_err().is_invalid_argument());

    let q = query()
        .table("users")
        .where_in_sub("id", |q| q.table("posts").add_binding_named([1], "nope"));
    assert!(q.validate().is_err());
}

#[test]
fn first_build_error_wins() {
    let q = query()
        .add_binding_named([1], "first")
        .add_binding_named([1], "second");
    let err = q.validate().unwrap_err();
    assert!(err.to_string().contains("first"));
}

#[test]
fn empty_nested_group_adds_nothing() {
    let q = query().where_group(|q| q);
    assert!(q.wheres.is_empty());
}

#[test]
fn where_column_with_unknown_operator_compares_equality() {
    let q = query().where_column("first_name", "last_name", "ignored");
    match &q.wheres[0] {
        Predicate::Column {
            first,
            operator,
            second,
            ..
        } => {
            assert_eq!(first, &Ident::from("first_name"));
            assert_eq!(operator, "=");
            assert_eq!(second, &Ident::from("last_name"));
        }
        other => panic!("unexpected predicate: {other:?}"),
    }
}

// ==================== Aggregate view ====================

#[test]
fn aggregate_view_drops_columns_and_select_bindings() {
    let q = query()
        .table("orders")
        .select_raw("price * ? as total", [2])
        .where_eq("paid", true);
    let view = q.aggregate_view("sum", vec![Ident::from("price")]);

    assert!(view.columns.is_empty());
    assert_eq!(view.get_bindings(), vec![Value::Bool(true)]);
    assert_eq!(
        view.aggregate,
        Some(Aggregate {
            function: "sum".into(),
            columns: vec![Ident::from("price")],
        })
    );
    // the source builder is untouched
    assert_eq!(q.columns.len(), 1);
    assert_eq!(q.get_bindings().len(), 2);
}

#[test]
fn aggregate_view_of_grouped_query_drops_orders() {
    let q = query()
        .table("orders")
        .group_by(["status"])
        .order_by_raw("field(status, ?)", ["new"]);
    let view = q.aggregate_view("count", Vec::new());
    assert!(view.orders.is_empty());
    assert!(view.bindings.get(BindingKind::Order).is_empty());
    assert_eq!(
        view.aggregate.map(|a| a.columns),
        Some(vec![Ident::from("*")])
    );
}

// ==================== Statements ====================

#[test]
fn build_insert_binds_in_first_row_column_order() {
    let rows = [
        Record::new().set("email", "a@example.com").set("votes", 0),
        Record::new().set("votes", 5).set("email", "b@example.com"),
    ];
    let built = query().table("users").build_insert(&rows).unwrap();
    assert_eq!(
        built.bindings,
        vec![
            Value::Text("a@example.com".into()),
            Value::Int(0),
            Value::Text("b@example.com".into()),
            Value::Int(5),
        ]
    );
}

#[test]
fn statements_need_a_target_table() {
    let record = Record::new().set("a", 1);
    assert!(query().build_update(&record).unwrap_err().is_invalid_argument());
    assert!(query().build_delete().unwrap_err().is_invalid_argument());
    assert!(query().build_insert(&[record]).unwrap_err().is_invalid_argument());
    assert!(query().build_truncate().unwrap_err().is_invalid_argument());
}

#[test]
fn update_requires_columns() {
    let err = query()
        .table("users")
        .build_update(&Record::new())
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn to_sql_is_repeatable() {
    let q = query().table("users").where_eq("id", 1).limit(3);
    assert_eq!(q.to_sql(), q.to_sql());
    assert_eq!(q.build_select().unwrap(), q.build_select().unwrap());
}
