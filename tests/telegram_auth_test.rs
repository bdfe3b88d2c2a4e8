use serde_json::json;
use twa_auth::utils::telegram_auth::{
    create_telegram_init_data, create_telegram_init_data_at, validate_telegram_init_data,
    verify_init_data, verify_init_data_at, FieldMap, InitDataConfig, InitDataError,
    InitDataErrorKind, UserId, WebAppUser, DEFAULT_MAX_AGE_SECONDS, VALIDATION_SUCCESSFUL,
};

const BOT_TOKEN: &str = "TEST_BOT_TOKEN";

fn mock_user() -> serde_json::Value {
    json!({
        "id": "user-identifier",
        "first_name": "John",
        "last_name": "Doe",
        "username": "abctest1234",
        "is_premium": true,
    })
}

fn fields_with_user(user: &serde_json::Value) -> FieldMap {
    FieldMap::from([("user".to_string(), user.to_string())])
}

fn replace_hash(init_data: &str, new_hash: &str) -> String {
    init_data
        .split('&')
        .map(|pair| {
            if pair.starts_with("hash=") {
                format!("hash={}", new_hash)
            } else {
                pair.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn hash_of(init_data: &str) -> String {
    init_data
        .split('&')
        .find_map(|pair| pair.strip_prefix("hash="))
        .expect("hash present")
        .to_string()
}

#[test]
fn created_init_data_contains_signed_fields() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();

    assert!(init_data.contains("hash="));
    assert!(init_data.contains("auth_date="));
    assert!(init_data.contains("user="));
}

#[test]
fn round_trip_returns_original_user() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();

    let validated = validate_telegram_init_data(&init_data, BOT_TOKEN, None).unwrap();

    assert_eq!(validated.status(), VALIDATION_SUCCESSFUL);
    assert_eq!(serde_json::to_value(&validated.user).unwrap(), mock_user());
    assert_eq!(validated.user.id, Some(UserId::Text("user-identifier".into())));
    assert_eq!(validated.user.username.as_deref(), Some("abctest1234"));
    assert_eq!(validated.user.first_name.as_deref(), Some("John"));
    assert_eq!(validated.user.last_name.as_deref(), Some("Doe"));
    assert_eq!(validated.user.is_premium, Some(true));
    assert!(!validated.fields.contains_key("hash"));
}

#[test]
fn concrete_scenario_with_explicit_auth_date() {
    let now = chrono::Utc::now().timestamp();
    let fields = FieldMap::from([
        (
            "user".to_string(),
            r#"{"id":"user-identifier","username":"abctest1234","is_premium":true}"#.to_string(),
        ),
        ("auth_date".to_string(), now.to_string()),
    ]);

    let init_data = create_telegram_init_data(BOT_TOKEN, &fields).unwrap();
    let validated = verify_init_data(&init_data, &InitDataConfig::new(BOT_TOKEN)).unwrap();

    assert_eq!(validated.status(), "Validation successful");
    assert_eq!(validated.user.id.as_ref().map(ToString::to_string).as_deref(), Some("user-identifier"));
    assert_eq!(validated.user.is_premium, Some(true));
    assert_eq!(validated.auth_date, now);
    assert_eq!(validated.auth_date_utc().map(|d| d.timestamp()), Some(now));
}

#[test]
fn tampered_hash_fails_authenticity() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();
    let tampered = replace_hash(&init_data, "invalidhash");

    let err = validate_telegram_init_data(&tampered, BOT_TOKEN, None).unwrap_err();

    assert!(matches!(err, InitDataError::HashMismatch));
    assert_eq!(err.kind(), InitDataErrorKind::AuthenticityFailure);
    assert_eq!(err.to_string(), "Hash validation failed");
}

#[test]
fn flipping_any_hash_character_fails() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();
    let hash = hash_of(&init_data);

    for i in 0..hash.len() {
        let mut chars: Vec<char> = hash.chars().collect();
        chars[i] = if chars[i] == '0' { '1' } else { '0' };
        let flipped: String = chars.into_iter().collect();

        let err = validate_telegram_init_data(&replace_hash(&init_data, &flipped), BOT_TOKEN, None)
            .unwrap_err();
        assert_eq!(err.kind(), InitDataErrorKind::AuthenticityFailure, "position {}", i);
    }
}

#[test]
fn uppercase_hash_is_rejected() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();
    let upper = hash_of(&init_data).to_uppercase();

    let err = validate_telegram_init_data(&replace_hash(&init_data, &upper), BOT_TOKEN, None)
        .unwrap_err();
    assert_eq!(err.kind(), InitDataErrorKind::AuthenticityFailure);
}

#[test]
fn wrong_bot_token_fails_authenticity() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();

    let err = validate_telegram_init_data(&init_data, "OTHER_TOKEN", None).unwrap_err();
    assert_eq!(err.kind(), InitDataErrorKind::AuthenticityFailure);
}

#[test]
fn expired_auth_date_is_stale() {
    let now = 1_700_000_000;
    let mut fields = fields_with_user(&mock_user());
    fields.insert("auth_date".into(), (now - 4 * 60 * 60).to_string());
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();

    let err = verify_init_data_at(&init_data, &InitDataConfig::new(BOT_TOKEN), now).unwrap_err();

    assert_eq!(err.kind(), InitDataErrorKind::Stale);
    assert_eq!(err.to_string(), "Telegram data is older than 3 hours");
}

#[test]
fn freshness_boundary() {
    let now = 1_700_000_000;
    let max_age = 600;
    let config = InitDataConfig::new(BOT_TOKEN).with_max_age(max_age);

    let signed_at = |auth_date: i64| {
        let mut fields = fields_with_user(&mock_user());
        fields.insert("auth_date".into(), auth_date.to_string());
        create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap()
    };

    let too_old = verify_init_data_at(&signed_at(now - (max_age + 1)), &config, now).unwrap_err();
    assert_eq!(too_old.kind(), InitDataErrorKind::Stale);

    assert!(verify_init_data_at(&signed_at(now - (max_age - 1)), &config, now).is_ok());
    assert!(verify_init_data_at(&signed_at(now - max_age), &config, now).is_ok());
}

#[test]
fn non_positive_max_age_disables_freshness() {
    let now = 1_700_000_000;
    let mut fields = fields_with_user(&mock_user());
    fields.insert("auth_date".into(), "1".into());
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();

    for max_age in [0, -1] {
        let config = InitDataConfig::new(BOT_TOKEN).with_max_age(max_age);
        assert!(verify_init_data_at(&init_data, &config, now).is_ok());
    }
    assert!(validate_telegram_init_data(&init_data, BOT_TOKEN, Some(0)).is_ok());
}

#[test]
fn stale_is_reported_before_forgery() {
    let now = 1_700_000_000;
    let mut fields = fields_with_user(&mock_user());
    fields.insert("auth_date".into(), (now - DEFAULT_MAX_AGE_SECONDS - 10).to_string());
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();
    let forged = replace_hash(&init_data, "deadbeef");

    let err = verify_init_data_at(&forged, &InitDataConfig::new(BOT_TOKEN), now).unwrap_err();
    assert_eq!(err.kind(), InitDataErrorKind::Stale);
}

#[test]
fn missing_hash_is_malformed_input() {
    let err = validate_telegram_init_data("foo=bar", BOT_TOKEN, None).unwrap_err();

    assert!(matches!(err, InitDataError::MissingHash));
    assert_eq!(err.kind(), InitDataErrorKind::MalformedInput);
    assert!(err.to_string().contains("Hash"));
}

#[test]
fn missing_auth_date_is_malformed_input() {
    let err = validate_telegram_init_data("user=%7B%7D&hash=abc", BOT_TOKEN, None).unwrap_err();

    assert!(matches!(err, InitDataError::MissingAuthDate));
    assert_eq!(err.kind(), InitDataErrorKind::MalformedInput);
}

#[test]
fn non_numeric_auth_date_is_malformed_input() {
    let err = validate_telegram_init_data("auth_date=yesterday&hash=abc", BOT_TOKEN, None)
        .unwrap_err();

    assert!(matches!(err, InitDataError::InvalidAuthDate(ref raw) if raw == "yesterday"));
}

#[test]
fn empty_secret_is_config_error() {
    let init_data = create_telegram_init_data(BOT_TOKEN, &fields_with_user(&mock_user())).unwrap();

    for input in [init_data.as_str(), "foo=bar", ""] {
        let err = validate_telegram_init_data(input, "", None).unwrap_err();
        assert_eq!(err.kind(), InitDataErrorKind::Config);
    }

    let err = create_telegram_init_data("", &fields_with_user(&mock_user())).unwrap_err();
    assert!(matches!(err, InitDataError::MissingBotToken));
}

#[test]
fn field_order_does_not_affect_verification() {
    let now = 1_700_000_000;
    let fields = FieldMap::from([
        ("user".to_string(), mock_user().to_string()),
        ("query_id".to_string(), "AAHdF6IQAAAAAN0XohDhrOrc".to_string()),
        ("auth_date".to_string(), now.to_string()),
    ]);
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();

    let mut pairs: Vec<&str> = init_data.split('&').collect();
    pairs.reverse();
    let reordered = pairs.join("&");
    assert_ne!(reordered, init_data);

    let config = InitDataConfig::new(BOT_TOKEN);
    let a = verify_init_data_at(&init_data, &config, now).unwrap();
    let b = verify_init_data_at(&reordered, &config, now).unwrap();

    assert_eq!(a, b);
    assert_eq!(b.query_id(), Some("AAHdF6IQAAAAAN0XohDhrOrc"));
}

#[test]
fn valid_signature_without_user_is_rejected() {
    let now = 1_700_000_000;
    let fields = FieldMap::from([("query_id".to_string(), "q".to_string())]);
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();

    let err = verify_init_data_at(&init_data, &InitDataConfig::new(BOT_TOKEN), now).unwrap_err();

    assert!(matches!(err, InitDataError::MissingUser));
    assert_eq!(err.to_string(), "User data is missing");
}

#[test]
fn valid_signature_with_broken_user_is_rejected() {
    let now = 1_700_000_000;
    let fields = FieldMap::from([("user".to_string(), "{not json".to_string())]);
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();

    let err = verify_init_data_at(&init_data, &InitDataConfig::new(BOT_TOKEN), now).unwrap_err();

    assert_eq!(err.kind(), InitDataErrorKind::MalformedUser);
    assert!(err.to_string().starts_with("Error parsing user data"));
}

#[test]
fn telegram_client_payload_verifies() {
    let now = 1_700_000_000;
    let user = json!({
        "id": 279058397,
        "first_name": "Vladislav",
        "last_name": "Kibenko",
        "username": "vdkfrost",
        "language_code": "ru",
        "is_premium": true,
        "allows_write_to_pm": true,
        "photo_url": "https://t.me/i/userpic/320/abc.svg"
    });
    let fields = FieldMap::from([
        ("user".to_string(), user.to_string()),
        ("chat_instance".to_string(), "-3788475317572404878".to_string()),
        ("chat_type".to_string(), "private".to_string()),
        ("start_param".to_string(), "ref 42&x=1".to_string()),
    ]);
    let init_data = create_telegram_init_data_at(BOT_TOKEN, &fields, now).unwrap();

    let validated = verify_init_data_at(&init_data, &InitDataConfig::new(BOT_TOKEN), now).unwrap();

    assert_eq!(validated.user.id, Some(UserId::Numeric(279058397)));
    assert_eq!(validated.user.language_code.as_deref(), Some("ru"));
    assert_eq!(validated.chat_type(), Some("private"));
    assert_eq!(validated.chat_instance(), Some("-3788475317572404878"));
    assert_eq!(validated.start_param(), Some("ref 42&x=1"));
    assert_eq!(
        serde_json::from_value::<WebAppUser>(user).unwrap(),
        validated.user
    );
}
