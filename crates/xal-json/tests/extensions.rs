use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use xal_json::{AdaptorError, CoderError, ConversionAdaptor, FnAdaptor, JsonCoder, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Magnet {
    name: String,
    field: f64,
}

fn magnet_adaptor() -> impl ConversionAdaptor<Native = Magnet> {
    FnAdaptor::new(
        |m: &Magnet| {
            Value::map([
                ("name", Value::from(m.name.as_str())),
                ("field", Value::from(m.field)),
            ])
        },
        |v: &Value| {
            let name = v
                .get("name")
                .and_then(|n| n.as_str().map(str::to_string))
                .ok_or_else(|| AdaptorError::Custom("missing name".into()))?;
            let field = v
                .get("field")
                .and_then(|f| f.as_f64())
                .ok_or_else(|| AdaptorError::Custom("missing field".into()))?;
            Ok(Magnet { name, field })
        },
    )
}

fn quad() -> Magnet {
    Magnet {
        name: "QH01".into(),
        field: -1.5,
    }
}

#[test]
fn registered_type_round_trips() {
    let mut coder = JsonCoder::new();
    coder
        .register_type("xal.Magnet", magnet_adaptor(), &["gov.sns.xal.Magnet"])
        .unwrap();

    let text = coder.encode(&Value::extension(quad())).unwrap();
    assert_eq!(
        text,
        r#"{"__XALTYPE":"xal.Magnet","value":{"name":"QH01","field":-1.5}}"#
    );
    let back = coder.decode(&text).unwrap();
    assert_eq!(back.as_extension().and_then(|e| e.downcast_ref::<Magnet>()), Some(&quad()));

    let legacy = coder
        .decode(r#"{"__XALTYPE":"gov.sns.xal.Magnet","value":{"name":"QH01","field":-1.5}}"#)
        .unwrap();
    assert_eq!(legacy, back);
}

#[test]
fn adaptor_rejection_names_the_type() {
    let mut coder = JsonCoder::new();
    coder.register_type("xal.Magnet", magnet_adaptor(), &[]).unwrap();
    let err = coder
        .decode(r#"{"__XALTYPE":"xal.Magnet","value":{"name":"QH01"}}"#)
        .unwrap_err();
    assert_eq!(
        err,
        CoderError::Adaptor {
            type_name: "xal.Magnet".into(),
            source: AdaptorError::Custom("missing field".into()),
        }
    );
}

#[test]
fn unregistered_type_is_unsupported() {
    let err = JsonCoder::new().encode(&Value::extension(quad())).unwrap_err();
    assert!(matches!(err, CoderError::UnsupportedType(name) if name.ends_with("Magnet")));
}

#[test]
fn unknown_type_name_on_decode() {
    assert_eq!(
        JsonCoder::new().decode(r#"{"__XALTYPE":"xal.Magnet","value":{}}"#),
        Err(CoderError::UnknownExtensionType("xal.Magnet".into()))
    );
}

#[test]
fn serialization_fallback() {
    let coder = JsonCoder::new();
    let text = coder.encode(&Value::serializable(quad())).unwrap();
    assert!(text.starts_with(r#"{"__XALSERIALIZATION":["#));

    let back = coder.decode(&text).unwrap();
    let payload = back.as_serialized().unwrap();
    assert_eq!(payload.deserialize::<Magnet>().unwrap(), quad());
    // The payload re-encodes byte for byte.
    assert_eq!(coder.encode(&back).unwrap(), text);
}

#[test]
fn adaptor_takes_precedence_over_serialization() {
    let mut coder = JsonCoder::new();
    coder.register_type("xal.Magnet", magnet_adaptor(), &[]).unwrap();
    let text = coder.encode(&Value::serializable(quad())).unwrap();
    assert!(text.starts_with(r#"{"__XALTYPE":"xal.Magnet""#));
}

#[test]
fn reregistration_replaces_names() {
    let mut coder = JsonCoder::new();
    coder.register_type("xal.Magnet", magnet_adaptor(), &[]).unwrap();
    coder.register_type("xal.Magnet.v2", magnet_adaptor(), &[]).unwrap();

    let text = coder.encode(&Value::extension(quad())).unwrap();
    assert!(text.starts_with(r#"{"__XALTYPE":"xal.Magnet.v2""#));
    assert_eq!(
        coder.decode(r#"{"__XALTYPE":"xal.Magnet","value":{}}"#),
        Err(CoderError::UnknownExtensionType("xal.Magnet".into()))
    );
}

#[test]
fn standard_adaptors() {
    let coder = JsonCoder::new();
    let time = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
    let tags: BTreeSet<String> = ["rf", "diag"].iter().map(|s| s.to_string()).collect();
    let value = Value::array(vec![
        Value::extension(time),
        Value::extension(Duration::from_millis(1500)),
        Value::extension(tags.clone()),
        Value::extension(u64::MAX),
        Value::extension(-5i8),
        Value::extension(2.5f32),
    ]);

    let text = coder.encode(&value).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"[{"__XALTYPE":"std::time::SystemTime","value":1700000000123},"#,
            r#"{"__XALTYPE":"std::time::Duration","value":1.5},"#,
            r#"{"__XALTYPE":"std::collections::BTreeSet<String>","value":["diag","rf"]},"#,
            r#"{"__XALTYPE":"u64","value":"18446744073709551615"},"#,
            r#"{"__XALTYPE":"i8","value":-5},"#,
            r#"{"__XALTYPE":"f32","value":2.5}]"#
        )
    );
    assert_eq!(coder.decode(&text).unwrap(), value);
}

#[test]
fn time_values_keep_full_precision() {
    let coder = JsonCoder::new();
    let value = Value::array(vec![
        Value::extension(SystemTime::now()),
        Value::extension(UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789)),
        Value::extension(UNIX_EPOCH - Duration::from_nanos(1)),
        Value::extension(Duration::new(10_000_000_000, 1)),
        Value::extension(Duration::MAX),
    ]);
    let text = coder.encode(&value).unwrap();
    assert!(text.contains(r#"{"__XALTYPE":"std::time::Duration","value":[10000000000,1]}"#));
    assert_eq!(coder.decode(&text).unwrap(), value);
}

#[test]
fn java_names_decode_to_rust_types() {
    let coder = JsonCoder::new();
    let value = coder
        .decode(concat!(
            r#"[{"__XALTYPE":"java.util.Date","value":0},"#,
            r#"{"__XALTYPE":"java.lang.Character","value":"x"},"#,
            r#"{"__XALTYPE":"java.util.HashSet","value":["b","a"]}]"#
        ))
        .unwrap();
    assert_eq!(value.at(0), Some(Value::extension(UNIX_EPOCH)));
    assert_eq!(value.at(1), Some(Value::extension('x')));
    let expected: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
    assert_eq!(value.at(2), Some(Value::extension(expected)));
}

#[test]
fn supported_type_queries() {
    let mut coder = JsonCoder::new();
    assert!(coder.is_supported_type::<char>());
    assert!(!coder.is_supported_type::<Magnet>());
    coder.register_type("xal.Magnet", magnet_adaptor(), &[]).unwrap();
    assert!(coder.is_supported_type::<Magnet>());
    assert!(coder.extension_type_names().contains(&"xal.Magnet"));
}
