use facet::Facet;
use facet_tags::{
    Peek, ScalarKind, Tags, TagsErrorKind, populate_fields_from_tags, walk_tagged_fields,
};
use indoc::indoc;

#[derive(Facet, Debug, Default, PartialEq)]
struct Schema {
    title: String,
    desc: Option<String>,
    min: Option<f64>,
    max: f64,
    limit: i64,
    offset: Option<i64>,
    deprecated: bool,
    required: Option<bool>,
}

const VALUE_TAG: &str = r#"title:"Value" desc:"..." min:"-1.23" max:"10.1" limit:"5" offset:"2" deprecated:"true" required:"f""#;

#[test]
fn populate_all_kinds() {
    let mut s = Schema::default();
    populate_fields_from_tags(&mut s, &Tags::parse(VALUE_TAG)).unwrap();

    assert_eq!(s.title, "Value");
    assert_eq!(s.desc.as_deref(), Some("..."));
    assert_eq!(s.min, Some(-1.23));
    assert_eq!(s.max, 10.1);
    assert_eq!(s.limit, 5);
    assert_eq!(s.offset, Some(2));
    assert!(s.deprecated);
    assert_eq!(s.required, Some(false));
}

#[test]
fn populate_from_field_attributes() {
    #[derive(Facet)]
    struct Value {
        #[facet(title = "Value", limit = "5", required = "t")]
        property: String,
    }

    let value = Value {
        property: String::new(),
    };
    let mut tags = None;
    walk_tagged_fields(Peek::new(&value), "title", |_, field, _| {
        tags = Some(Tags::of(field));
    });
    let tags = tags.expect("property is tagged with a title");
    assert_eq!(tags.len(), 3);

    let mut s = Schema::default();
    populate_fields_from_tags(&mut s, &tags).unwrap();
    assert_eq!(
        s,
        Schema {
            title: "Value".into(),
            limit: 5,
            required: Some(true),
            ..Schema::default()
        }
    );
}

#[test]
fn absent_keys_leave_fields_alone() {
    let mut s = Schema {
        title: "kept".into(),
        desc: Some("kept too".into()),
        limit: 9,
        ..Schema::default()
    };
    populate_fields_from_tags(&mut s, &Tags::parse(r#"max:"1e3" json:"ignored""#)).unwrap();

    assert_eq!(s.title, "kept");
    assert_eq!(s.desc.as_deref(), Some("kept too"));
    assert_eq!(s.limit, 9);
    assert_eq!(s.max, 1000.0);
    assert_eq!(s.offset, None);
    assert_eq!(s.required, None);
}

#[test]
fn malformed_int_keeps_prior_value() {
    let mut s = Schema {
        limit: 3,
        ..Schema::default()
    };
    let err = populate_fields_from_tags(&mut s, &Tags::parse(r#"limit:"abc" max:"2""#))
        .unwrap_err();

    assert_eq!(s.limit, 3);
    assert_eq!(s.max, 2.0);

    let [parse] = err.parse_errors() else {
        panic!("expected one parse error, got {err:?}");
    };
    assert_eq!(parse.kind(), ScalarKind::Int);
    assert_eq!(parse.key(), "limit");
    assert_eq!(parse.value(), "abc");

    let message = err.to_string();
    assert!(message.contains("abc"), "{message}");
    assert!(message.contains("limit"), "{message}");
    assert!(
        message.starts_with("failed to parse int value abc in tag limit: "),
        "{message}"
    );
}

#[test]
fn errors_are_joined_in_field_order() {
    let mut s = Schema::default();
    let tags = Tags::parse(indoc! {r#"
        required:"maybe"
        min:"low"
        limit:"5"
        offset:"1.5"
    "#});
    let err = populate_fields_from_tags(&mut s, &tags).unwrap_err();

    let keys: Vec<&str> = err.parse_errors().iter().map(|e| e.key()).collect();
    assert_eq!(keys, ["min", "offset", "required"]);

    let message = err.to_string();
    let parts: Vec<&str> = message.split(", ").collect();
    assert_eq!(parts.len(), 3, "{message}");
    assert!(parts[0].starts_with("failed to parse float value low in tag min: "));
    assert!(parts[1].starts_with("failed to parse int value 1.5 in tag offset: "));
    assert_eq!(
        parts[2],
        "failed to parse bool value maybe in tag required: invalid syntax"
    );

    // The valid value still went through.
    assert_eq!(s.limit, 5);
    assert_eq!(s.min, None);
    assert_eq!(s.offset, None);
    assert_eq!(s.required, None);
}

#[test]
fn dash_resets_strings() {
    let mut s = Schema {
        title: "Old".into(),
        desc: Some("old".into()),
        ..Schema::default()
    };
    let dash = Tags::parse(r#"title:"-" desc:"-""#);
    populate_fields_from_tags(&mut s, &dash).unwrap();
    assert_eq!(s.title, "");
    assert_eq!(s.desc, None);

    // Nothing to reset: the dash is not stored either.
    populate_fields_from_tags(&mut s, &dash).unwrap();
    assert_eq!(s.title, "");
    assert_eq!(s.desc, None);

    let mut empty_desc = Schema {
        desc: Some(String::new()),
        ..Schema::default()
    };
    populate_fields_from_tags(&mut empty_desc, &dash).unwrap();
    assert_eq!(empty_desc.desc, Some(String::new()));
}

#[test]
fn populate_is_idempotent() {
    let tags = Tags::parse(VALUE_TAG);

    let mut once = Schema::default();
    populate_fields_from_tags(&mut once, &tags).unwrap();

    let mut twice = Schema::default();
    populate_fields_from_tags(&mut twice, &tags).unwrap();
    populate_fields_from_tags(&mut twice, &tags).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn unsupported_and_flattened_fields_are_skipped() {
    #[derive(Facet, Debug, Default, PartialEq)]
    struct Inner {
        limit: i64,
    }

    #[derive(Facet, Debug, Default, PartialEq)]
    #[allow(non_snake_case)]
    struct Dest {
        Title: String,
        count: i32,
        ratio: f32,
        tags: Vec<String>,
        #[facet(flatten)]
        inner: Inner,
    }

    let mut d = Dest::default();
    let tags = Tags::parse(r#"title:"T" count:"1" ratio:"0.5" tags:"a" limit:"4" inner:"x""#);
    populate_fields_from_tags(&mut d, &tags).unwrap();

    assert_eq!(
        d,
        Dest {
            Title: "T".into(),
            ..Dest::default()
        }
    );
}

#[test]
fn destination_must_be_a_struct() {
    let mut n = 0i64;
    let err = populate_fields_from_tags(&mut n, &Tags::parse(r#"n:"1""#)).unwrap_err();
    assert!(matches!(err.kind(), TagsErrorKind::InvalidArgument(_)));
    assert_eq!(n, 0);
}

#[test]
fn bundles_built_in_code() {
    let tags: Tags = [("limit", "+7"), ("deprecated", "1")].into_iter().collect();
    let mut s = Schema::default();
    populate_fields_from_tags(&mut s, &tags.with("max", "-0.5")).unwrap();

    assert_eq!(s.limit, 7);
    assert!(s.deprecated);
    assert_eq!(s.max, -0.5);
}
