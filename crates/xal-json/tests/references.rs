use xal_json::{CoderError, CoderOptions, JsonCoder, TypedArray, Value};

fn push(list: &Value, item: Value) {
    if let Value::Array(items) = list {
        items.borrow_mut().push(item);
    }
}

fn insert(map: &Value, key: &str, item: Value) {
    if let Value::Map(entries) = map {
        entries.borrow_mut().insert(key.to_string(), item);
    }
}

#[test]
fn aliased_array_decodes_to_one_allocation() {
    let coder = JsonCoder::new();
    let shared = Value::array(vec![Value::from(1)]);
    let root = Value::array(vec![shared.clone(), shared]);

    let text = coder.encode(&root).unwrap();
    assert_eq!(text, r#"[{"__XALID":0,"value":[1]},{"__XALREF":0}]"#);

    let back = coder.decode(&text).unwrap();
    let (first, second) = (back.at(0).unwrap(), back.at(1).unwrap());
    assert!(first.ptr_eq(&second));

    // Mutation through one alias is visible through the other.
    push(&first, Value::from(2));
    assert_eq!(second.at(1), Some(Value::from(2)));
}

#[test]
fn equal_but_distinct_values_stay_distinct() {
    let coder = JsonCoder::new();
    let root = Value::array(vec![
        Value::array(vec![Value::from(1)]),
        Value::array(vec![Value::from(1)]),
    ]);
    let text = coder.encode(&root).unwrap();
    assert_eq!(text, "[[1],[1]]");
    let back = coder.decode(&text).unwrap();
    assert!(!back.at(0).unwrap().ptr_eq(&back.at(1).unwrap()));
}

#[test]
fn self_referencing_map() {
    let coder = JsonCoder::new();
    let node = Value::map([("name", Value::from("ring"))]);
    insert(&node, "next", node.clone());

    let text = coder.encode(&node).unwrap();
    assert_eq!(
        text,
        r#"{"__XALID":0,"value":{"name":"ring","next":{"__XALREF":0}}}"#
    );
    let back = coder.decode(&text).unwrap();
    assert!(back.get("next").unwrap().ptr_eq(&back));
    assert_eq!(back.get("name"), Some(Value::from("ring")));
}

#[test]
fn mutual_cycle() {
    let coder = JsonCoder::new();
    let a = Value::empty_map();
    let b = Value::empty_map();
    insert(&a, "b", b.clone());
    insert(&b, "a", a.clone());
    let root = Value::array(vec![a, b]);

    let text = coder.encode(&root).unwrap();
    assert_eq!(
        text,
        r#"[{"__XALID":0,"value":{"b":{"__XALID":1,"value":{"a":{"__XALREF":0}}}}},{"__XALREF":1}]"#
    );
    let back = coder.decode(&text).unwrap();
    let (a, b) = (back.at(0).unwrap(), back.at(1).unwrap());
    assert!(a.get("b").unwrap().ptr_eq(&b));
    assert!(b.get("a").unwrap().ptr_eq(&a));
}

#[test]
fn self_containing_array() {
    let coder = JsonCoder::new();
    let list = Value::array(vec![Value::from("head")]);
    push(&list, list.clone());

    let text = coder.encode(&list).unwrap();
    assert_eq!(text, r#"{"__XALID":0,"value":["head",{"__XALREF":0}]}"#);
    let back = coder.decode(&text).unwrap();
    assert!(back.at(1).unwrap().ptr_eq(&back));
}

#[test]
fn shared_strings_follow_the_option() {
    let s = Value::from("QF01");
    let root = Value::map([("x", s.clone()), ("y", s)]);

    let tracking = JsonCoder::new();
    let text = tracking.encode(&root).unwrap();
    assert_eq!(
        text,
        r#"{"x":{"__XALID":0,"value":"QF01"},"y":{"__XALREF":0}}"#
    );
    let back = tracking.decode(&text).unwrap();
    assert!(back.get("x").unwrap().ptr_eq(&back.get("y").unwrap()));

    let inline = JsonCoder::new().with_options(CoderOptions {
        track_string_identity: false,
        ..CoderOptions::default()
    });
    assert_eq!(inline.encode(&root).unwrap(), r#"{"x":"QF01","y":"QF01"}"#);
}

#[test]
fn shared_typed_array_and_extension() {
    let coder = JsonCoder::new();
    let samples = Value::typed_array(vec![1.5f64, 2.5]);
    let unit = Value::extension('A');
    let root = Value::array(vec![samples.clone(), unit.clone(), samples, unit]);

    let text = coder.encode(&root).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"[{"__XALID":0,"value":{"__XALITEMTYPE":"f64","array":[1.5,2.5]}},"#,
            r#"{"__XALID":1,"value":{"__XALTYPE":"char","value":"A"}},"#,
            r#"{"__XALREF":0},{"__XALREF":1}]"#
        )
    );
    let back = coder.decode(&text).unwrap();
    assert!(back.at(0).unwrap().ptr_eq(&back.at(2).unwrap()));
    assert!(back.at(1).unwrap().ptr_eq(&back.at(3).unwrap()));
    assert_eq!(
        back.at(0).unwrap().as_typed_array().map(|a| a.clone()),
        Some(TypedArray::F64(vec![1.5, 2.5]))
    );
}

#[test]
fn ids_restart_for_every_call() {
    let coder = JsonCoder::new();
    let shared = Value::empty_map();
    let root = Value::array(vec![shared.clone(), shared]);
    assert_eq!(coder.encode(&root).unwrap(), coder.encode(&root).unwrap());
    assert_eq!(
        coder.decode(r#"{"__XALREF":0}"#),
        Err(CoderError::UnresolvedReference(0))
    );
}

#[test]
fn reference_before_definition_is_rejected() {
    let coder = JsonCoder::new();
    assert_eq!(
        coder.decode(r#"{"a":{"__XALREF":5},"b":{"__XALID":5,"value":[]}}"#),
        Err(CoderError::UnresolvedReference(5))
    );
}

#[test]
fn foreign_ids_need_not_be_sequential() {
    let coder = JsonCoder::new();
    let back = coder
        .decode(r#"[{"__XALID":42,"value":{"k":1}},{"__XALID":-3,"value":"s"},{"__XALREF":42},{"__XALREF":-3}]"#)
        .unwrap();
    assert!(back.at(0).unwrap().ptr_eq(&back.at(2).unwrap()));
    assert!(back.at(1).unwrap().ptr_eq(&back.at(3).unwrap()));
}

#[test]
fn self_containing_object_typed_array() {
    let coder = JsonCoder::new();
    let nodes = Value::typed_array(TypedArray::Object {
        item_type: "demo.Node".into(),
        items: vec![Value::from("head")],
    });
    if let Value::TypedArray(array) = &nodes {
        if let TypedArray::Object { items, .. } = &mut *array.borrow_mut() {
            items.push(nodes.clone());
        }
    }

    let text = coder.encode(&nodes).unwrap();
    assert_eq!(
        text,
        r#"{"__XALID":0,"value":{"__XALITEMTYPE":"demo.Node","array":["head",{"__XALREF":0}]}}"#
    );
    let back = coder.decode(&text).unwrap();
    let inner = back.as_typed_array().and_then(|a| a.get(1)).unwrap();
    assert!(inner.ptr_eq(&back));
    assert_eq!(
        back.as_typed_array().and_then(|a| a.get(0)),
        Some(Value::from("head"))
    );
}
