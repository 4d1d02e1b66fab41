use flatbeam::*;
use serde_json::{Value, json};

fn records(values: Vec<Value>) -> Vec<NestedRecord> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        })
        .collect()
}

#[test]
fn heterogeneous_schema_scenario() {
    let recs = records(vec![
        json!({"a": 1, "b": 2}),
        json!({"b": 3, "c": 4}),
        json!({"a": 5}),
    ]);
    let set = flatten("payload", &recs);

    assert_eq!(set.source, "payload");
    assert_eq!(set.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    let rows: Vec<Vec<Value>> = (0..set.num_rows())
        .map(|i| set.keys().map(|k| set.value(i, k).cloned().unwrap()).collect())
        .collect();
    assert_eq!(
        rows,
        vec![
            vec![json!(1), json!(2), Value::Null],
            vec![Value::Null, json!(3), json!(4)],
            vec![json!(5), Value::Null, Value::Null],
        ]
    );
}

#[test]
fn each_row_comes_from_its_own_record() {
    // Record i carries key k{i % 4} with value i, plus a shared "row" key.
    let recs = records(
        (0..200)
            .map(|i| {
                let mut obj = serde_json::Map::new();
                obj.insert("row".into(), json!(i));
                obj.insert(format!("k{}", i % 4), json!(i));
                Value::Object(obj)
            })
            .collect(),
    );
    let set = flatten("c", &recs);
    assert_eq!(set.num_rows(), 200);
    assert_eq!(set.num_columns(), 5);
    for i in 0..200usize {
        assert_eq!(set.value(i, "row"), Some(&json!(i)));
        for k in 0..4 {
            let v = set.value(i, &format!("k{k}")).unwrap();
            if i % 4 == k {
                assert_eq!(v, &json!(i));
            } else {
                assert!(v.is_null());
            }
        }
    }
}

#[test]
fn reruns_give_identical_output() {
    let recs = records(vec![
        json!({"zeta": 1, "alpha": {"x": 1}}),
        json!({"mid": [1, 2], "zeta": 2}),
        json!({}),
    ]);
    let first = flatten_with("c", &recs, 1);
    for _ in 0..5 {
        assert_eq!(flatten_with("c", &recs, 1), first);
    }
    assert_eq!(first.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
}

#[test]
fn decoded_payloads_flatten_in_payload_key_order() -> anyhow::Result<()> {
    let raw = [
        r#"{"visits": "1", "hits": "4", "pageviews": "3"}"#,
        r#"{"visits": "1", "hits": "1", "pageviews": "1", "bounces": "1", "newVisits": "1"}"#,
    ];
    let recs = raw
        .iter()
        .map(|r| decode("totals", r))
        .collect::<Result<Vec<_>, _>>()?;
    let set = flatten("totals", &recs);
    assert_eq!(
        set.keys().collect::<Vec<_>>(),
        vec!["visits", "hits", "pageviews", "bounces", "newVisits"]
    );
    assert_eq!(set.value(0, "bounces"), Some(&Value::Null));
    Ok(())
}

#[test]
fn decode_roundtrip_is_structural() -> anyhow::Result<()> {
    let raw = r#"{"continent": "Americas", "latitude": "not available in demo dataset", "nested": {"deep": [1, 2.5, null, true]}}"#;
    let rec = decode("geoNetwork", raw)?;
    let again = decode("geoNetwork", &serde_json::to_string(&rec)?)?;
    assert_eq!(rec, again);
    assert_eq!(Value::Object(again), serde_json::from_str::<Value>(raw)?);
    Ok(())
}
