use tachograph::error::{ErrorClass, TachographError};

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        TachographError::config("x"),
        TachographError::Config { .. }
    ));
    assert!(matches!(
        TachographError::rate_limit("x"),
        TachographError::RateLimit { .. }
    ));
    assert!(matches!(
        TachographError::clock_skew("x"),
        TachographError::ClockSkew { .. }
    ));
    assert!(matches!(
        TachographError::api("x"),
        TachographError::Api { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    let ser = TachographError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, TachographError::Serialization { .. }));
    assert!(matches!(TachographError::io("x"), TachographError::Io { .. }));
    assert!(matches!(
        TachographError::network("x"),
        TachographError::Network { .. }
    ));
    assert!(matches!(
        TachographError::auth("x"),
        TachographError::Auth { .. }
    ));
    assert!(matches!(
        TachographError::validation("f", "m"),
        TachographError::Validation { .. }
    ));
    assert!(matches!(
        TachographError::timeout("x"),
        TachographError::Timeout { .. }
    ));
    assert!(matches!(
        TachographError::generic("x"),
        TachographError::Generic { .. }
    ));
}

#[test]
fn classes_cover_the_taxonomy() {
    assert_eq!(TachographError::rate_limit("x").class(), ErrorClass::RateLimit);
    assert_eq!(TachographError::timeout("x").class(), ErrorClass::Timeout);
    assert_eq!(TachographError::api("x").class(), ErrorClass::Api);
    assert_eq!(TachographError::io("x").class(), ErrorClass::Unclassified);
    assert_eq!(TachographError::generic("x").class(), ErrorClass::Unclassified);
}

#[test]
fn display_messages() {
    let e = TachographError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = TachographError::clock_skew("negative delta");
    assert_eq!(format!("{}", e), "Clock skew error: negative delta");
}
