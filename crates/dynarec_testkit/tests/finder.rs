//! Index selection, filters, projection, page emulation and streaming.

use dynarec_core::{
    Collection, Conditions, CoreError, FindOptions, FindOutput, Record, Schema, SchemaBuilder,
    Value,
};
use dynarec_storage::InMemoryClient;
use dynarec_testkit::{contacts_strategy, init_test_logging, memory_collection, PropTestConfig};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn contacts_schema() -> Arc<Schema> {
    SchemaBuilder::new("contacts")
        .auto_id()
        .string_attr("email")
        .string_attr("city")
        .integer_attr("age")
        .timestamps()
        .index(&["city", "age"])
        .build()
        .unwrap()
}

/// Seven contacts in Paris aged 10..=70 and two in Oslo.
fn seeded() -> Collection<InMemoryClient> {
    init_test_logging();
    let contacts = memory_collection(contacts_schema());
    for i in 1..=7i64 {
        contacts
            .create_strict([
                ("email", Value::from(format!("p{i}@example.com"))),
                ("city", Value::from("paris")),
                ("age", Value::Integer(i * 10)),
            ])
            .unwrap();
    }
    for (i, age) in [(1, 25i64), (2, 45)] {
        contacts
            .create_strict([
                ("email", Value::from(format!("o{i}@example.com"))),
                ("city", Value::from("oslo")),
                ("age", Value::Integer(age)),
            ])
            .unwrap();
    }
    contacts
}

fn paris() -> Conditions {
    Conditions::new().with("city", "paris").with("age.ge", 0)
}

fn ages(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|r| r.get("age").unwrap().as_i64().unwrap())
        .collect()
}

#[test]
fn scan_filters_on_any_attribute() {
    let contacts = seeded();
    let found = contacts
        .find_all_by(&Conditions::new().with("age.gt", 40), &FindOptions::new())
        .unwrap();
    let mut found = ages(&found);
    found.sort_unstable();
    assert_eq!(found, [45, 50, 60, 70]);
}

#[test]
fn index_query_orders_by_range_key() {
    let contacts = seeded();
    let ascending = contacts.find_all_by(&paris(), &FindOptions::new()).unwrap();
    assert_eq!(ages(&ascending), [10, 20, 30, 40, 50, 60, 70]);

    let descending = contacts
        .find_all_by(&paris(), &FindOptions::new().order("DESC"))
        .unwrap();
    assert_eq!(ages(&descending), [70, 60, 50, 40, 30, 20, 10]);

    let between = contacts
        .find_all_by(
            &Conditions::new()
                .with("city", "paris")
                .with("age.between", vec![20, 40]),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(ages(&between), [20, 30, 40]);
}

#[test]
fn index_query_applies_non_key_filter() {
    let contacts = seeded();
    let found = contacts
        .find_all_by(
            &paris().with("email.begins_with", "p3"),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(ages(&found), [30]);
}

#[test]
fn count_exists_and_find_by() {
    let contacts = seeded();
    assert_eq!(contacts.count(&paris(), &FindOptions::new()).unwrap(), 7);
    assert_eq!(contacts.count(&Conditions::new(), &FindOptions::new()).unwrap(), 9);
    assert!(contacts.exists(&paris(), &FindOptions::new()).unwrap());
    assert!(!contacts
        .exists(&Conditions::new().with("city", "rome").with("age.ge", 0), &FindOptions::new())
        .unwrap());

    let youngest = contacts.find_by(&paris(), &FindOptions::new()).unwrap().unwrap();
    assert_eq!(youngest.get("age").unwrap(), &Value::Integer(10));

    match contacts.finder(&paris(), &FindOptions::new().count()).unwrap() {
        FindOutput::Count(n) => assert_eq!(n, 7),
        other => panic!("expected a count, got {other:?}"),
    }
}

#[test]
fn projection_limits_attributes() {
    let contacts = seeded();
    let found = contacts
        .find_all_by(&paris(), &FindOptions::new().select(" email , age "))
        .unwrap();
    assert_eq!(found.len(), 7);
    for record in &found {
        assert!(record.get("email").unwrap().as_str().is_some());
        assert!(record.get("city").unwrap().is_null());
        assert!(record.id().is_none());
    }
}

#[test]
fn page_emulation_walks_pages() {
    let contacts = seeded();
    let page = |n| {
        let records = contacts
            .find_all_by(&paris(), &FindOptions::new().page(n).per_page(3))
            .unwrap();
        ages(&records)
    };
    assert_eq!(page(1), [10, 20, 30]);
    assert_eq!(page(2), [40, 50, 60]);
    assert_eq!(page(3), [70]);
    assert!(page(4).is_empty());
}

#[test]
fn page_past_the_end_is_empty_in_every_mode() {
    let contacts = seeded();
    let options = FindOptions::new().page(5).per_page(3);
    assert_eq!(contacts.count(&paris(), &options).unwrap(), 0);
    let page = contacts.result_set(&paris(), &options).unwrap();
    assert!(page.items.is_empty());
    assert!(page.last_evaluated_key.is_none());
    assert!(contacts.find_all_by(&paris(), &options).unwrap().is_empty());
}

#[test]
fn explicit_limit_disables_page_emulation() {
    let contacts = seeded();
    let limited = contacts
        .find_all_by(&paris(), &FindOptions::new().limit(2).page(3).per_page(3))
        .unwrap();
    assert_eq!(ages(&limited), [10, 20]);
}

#[test]
fn start_keys_disable_page_emulation() {
    let contacts = seeded();
    let all = contacts.find_all_by(&paris(), &FindOptions::new()).unwrap();
    let third = &all[2];

    let mut options = FindOptions::new().page(3).per_page(2);
    for field in ["city", "age", "id", "created_at"] {
        options = options.start_with(field, third.get(field).unwrap().clone());
    }
    let resumed = contacts.find_all_by(&paris(), &options).unwrap();
    assert_eq!(ages(&resumed), [40, 50]);

    let cursor = contacts
        .result_set(&paris(), &FindOptions::new().limit(2))
        .unwrap()
        .last_evaluated_key
        .expect("more items remain");
    let resumed = contacts
        .find_all_by(
            &paris(),
            &FindOptions::new().exclusive_start_key(cursor).page(4).per_page(3),
        )
        .unwrap();
    assert_eq!(ages(&resumed), [30, 40, 50]);
}

#[test]
fn default_page_size_applies() {
    let contacts = seeded();
    let config = contacts.config().clone().default_per_page(4);
    let small = Collection::with_config(
        Arc::clone(contacts.schema()),
        Arc::new(InMemoryClient::new()),
        config,
    );
    small.create_table().unwrap();
    for i in 0..5 {
        small
            .create_strict([("city", Value::from("paris")), ("age", Value::Integer(i))])
            .unwrap();
    }
    let first = small.find_all_by(&paris(), &FindOptions::new().page(1)).unwrap();
    assert_eq!(ages(&first), [0, 1, 2, 3]);
    let second = small.find_all_by(&paris(), &FindOptions::new().page(2).per_page(0)).unwrap();
    assert_eq!(ages(&second), [4]);
}

#[test]
fn result_set_cursor_resumes() {
    let contacts = seeded();
    let first = contacts
        .result_set(&paris(), &FindOptions::new().limit(4))
        .unwrap();
    assert_eq!(first.count, 4);
    let cursor = first.last_evaluated_key.expect("more items remain");

    let rest = contacts
        .find_all_by(&paris(), &FindOptions::new().exclusive_start_key(cursor))
        .unwrap();
    assert_eq!(ages(&rest), [50, 60, 70]);
}

#[test]
fn start_with_resumes_after_a_record() {
    let contacts = seeded();
    let all = contacts.find_all_by(&paris(), &FindOptions::new()).unwrap();
    let third = &all[2];

    let mut options = FindOptions::new();
    for field in ["city", "age", "id", "created_at"] {
        options = options.start_with(field, third.get(field).unwrap().clone());
    }
    let rest = contacts.find_all_by(&paris(), &options).unwrap();
    assert_eq!(ages(&rest), [40, 50, 60, 70]);
}

#[test]
fn stream_and_find_each_read_every_page() {
    let contacts = seeded();
    let options = FindOptions::new().limit(2);

    let streamed: Vec<Record> = contacts
        .stream(&paris(), &options)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ages(&streamed), [10, 20, 30, 40, 50, 60, 70]);

    let expected: Vec<String> = contacts
        .all()
        .unwrap()
        .iter()
        .map(|r| r.id().unwrap().to_string())
        .collect();
    let mut seen = Vec::new();
    contacts
        .find_each(&Conditions::new(), &options, |record| {
            seen.push(record.id().unwrap().to_string());
            Ok(())
        })
        .unwrap();
    assert_eq!(seen.len(), 9);
    assert_eq!(seen, expected);
}

#[test]
fn find_each_stops_on_consumer_error() {
    let contacts = seeded();
    let mut calls = 0;
    let result = contacts.find_each(&paris(), &FindOptions::new().limit(2), |_| {
        calls += 1;
        if calls == 3 {
            Err(CoreError::invalid_condition("stop", "consumer gave up"))
        } else {
            Ok(())
        }
    });
    assert!(result.is_err());
    assert_eq!(calls, 3);
}

#[test]
fn find_or_initialize_and_create() {
    let contacts = seeded();
    let existing = contacts
        .find_or_initialize_by(&Conditions::new().with("city", "paris").with("age", 10))
        .unwrap();
    assert!(existing.is_persisted());
    assert_eq!(existing.get("email").unwrap(), &Value::from("p1@example.com"));

    let conditions = Conditions::new()
        .with("city", "rome")
        .with("age.eq", 99)
        .with("email", "new@example.com");
    let fresh = contacts.find_or_initialize_by(&conditions).unwrap();
    assert!(fresh.is_new_record());
    assert_eq!(fresh.get("email").unwrap(), &Value::from("new@example.com"));
    assert_eq!(fresh.get("age").unwrap(), &Value::Integer(99));

    let created = contacts.find_or_create_by(&conditions).unwrap();
    assert!(created.is_persisted());
    let again = contacts.find_or_create_by(&conditions).unwrap();
    assert_eq!(again.id(), created.id());
    assert_eq!(contacts.count(&Conditions::new(), &FindOptions::new()).unwrap(), 10);
}

#[test]
fn malformed_conditions_are_configuration_errors() {
    let contacts = seeded();
    let unknown = contacts
        .find_all_by(&Conditions::new().with("nope", 1), &FindOptions::new())
        .unwrap_err();
    assert!(unknown.is_configuration());

    let arity = contacts
        .find_all_by(&Conditions::new().with("age.between", 3), &FindOptions::new())
        .unwrap_err();
    assert!(matches!(arity, CoreError::OperatorArity { actual: 1, .. }));

    let start = contacts
        .find_all_by(&paris(), &FindOptions::new().start_with("nope", 1))
        .unwrap_err();
    assert!(matches!(start, CoreError::UnknownColumn { .. }));
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn pages_partition_the_result(contacts in contacts_strategy(12), per_page in 1u32..5) {
        let collection = memory_collection(contacts_schema());
        for (email, age) in &contacts {
            collection
                .create_strict([
                    ("email", Value::from(email.as_str())),
                    ("city", Value::from("paris")),
                    ("age", Value::Integer(*age)),
                ])
                .unwrap();
        }

        let mut seen = Vec::new();
        for page in 1.. {
            let records = collection
                .find_all_by(&paris(), &FindOptions::new().page(page).per_page(per_page))
                .unwrap();
            if records.is_empty() {
                break;
            }
            prop_assert!(records.len() <= per_page as usize);
            seen.extend(records.iter().map(|r| r.id().unwrap().to_string()));
        }
        let distinct: BTreeSet<_> = seen.iter().collect();
        prop_assert_eq!(seen.len(), contacts.len());
        prop_assert_eq!(distinct.len(), contacts.len());
    }
}
