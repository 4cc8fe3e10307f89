use cookiesync_engine::{
    sanitize_consent_scope, sanitize_endpoint_args, sanitize_sync_count, sanitize_timeout,
    EndpointRegistry, PageParams,
};
use cookiesync_types::{
    ArgValue, ConsentScope, EndpointArgs, DEFAULT_ENDPOINT_URL, MAX_SAFE_INTEGER,
    RUBICON_ENDPOINT_URL,
};
use pretty_assertions::assert_eq;

// ── Endpoint allow-list ─────────────────────────────────────────

#[test]
fn known_endpoints_resolve() {
    let registry = EndpointRegistry::default();
    assert_eq!(registry.resolve(Some("appnexus")), DEFAULT_ENDPOINT_URL);
    assert_eq!(registry.resolve(Some("rubicon")), RUBICON_ENDPOINT_URL);
}

#[test]
fn unknown_or_missing_endpoint_falls_back_to_default() {
    let registry = EndpointRegistry::default();
    assert_eq!(registry.resolve(None), DEFAULT_ENDPOINT_URL);
    assert_eq!(registry.resolve(Some("evil")), DEFAULT_ENDPOINT_URL);
    assert_eq!(registry.resolve(Some("https://evil.test/sync")), DEFAULT_ENDPOINT_URL);
    assert_eq!(registry.resolve(Some("RUBICON")), DEFAULT_ENDPOINT_URL);
}

#[test]
fn registered_endpoint_resolves() {
    let registry = EndpointRegistry::default().with_endpoint("house", "https://sync.house.test/cs");
    assert!(registry.contains("house"));
    assert_eq!(registry.resolve(Some("house")), "https://sync.house.test/cs");
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["appnexus", "house", "rubicon"]);
}

#[test]
fn default_url_can_be_replaced() {
    let registry = EndpointRegistry::default().with_default_url("https://fallback.test/cs");
    assert_eq!(registry.default_url(), "https://fallback.test/cs");
    assert_eq!(registry.resolve(Some("nope")), "https://fallback.test/cs");
    assert_eq!(registry.resolve(Some("appnexus")), DEFAULT_ENDPOINT_URL);
}

// ── Endpoint args ───────────────────────────────────────────────

#[test]
fn args_drop_empty_keys_and_values() {
    let mut expected = EndpointArgs::new();
    expected.insert("a".into(), ArgValue::Int(1));
    expected.insert("d".into(), ArgValue::Int(2));
    assert_eq!(sanitize_endpoint_args(Some("a:1,b:,:c,d:2")), Some(expected));
}

#[test]
fn args_keep_strings_and_coerce_integers() {
    let args = sanitize_endpoint_args(Some("account:42,site:news,offset:-3")).unwrap();
    assert_eq!(args["account"], ArgValue::Int(42));
    assert_eq!(args["site"], ArgValue::Str("news".into()));
    assert_eq!(args["offset"], ArgValue::Int(-3));
}

#[test]
fn args_values_may_contain_colons() {
    let args = sanitize_endpoint_args(Some("ref:https://pub.test/page")).unwrap();
    assert_eq!(args["ref"], ArgValue::Str("https://pub.test/page".into()));
}

#[test]
fn args_non_integer_numbers_stay_strings() {
    let args = sanitize_endpoint_args(Some("ratio:1.5")).unwrap();
    assert_eq!(args["ratio"], ArgValue::Str("1.5".into()));
}

#[test]
fn args_nothing_surviving_is_none() {
    assert_eq!(sanitize_endpoint_args(None), None);
    assert_eq!(sanitize_endpoint_args(Some("")), None);
    assert_eq!(sanitize_endpoint_args(Some("novalue,:,a:, :b")), None);
}

// ── Sync count ──────────────────────────────────────────────────

#[test]
fn sync_count_malformed_is_unlimited() {
    for raw in [None, Some(""), Some("abc"), Some("-1"), Some("1.5"), Some("NaN")] {
        assert_eq!(sanitize_sync_count(raw), MAX_SAFE_INTEGER, "input {raw:?}");
    }
}

#[test]
fn sync_count_keeps_zero_and_positive() {
    assert_eq!(sanitize_sync_count(Some("0")), 0);
    assert_eq!(sanitize_sync_count(Some("10")), 10);
    assert_eq!(sanitize_sync_count(Some(" 7 ")), 7);
}

#[test]
fn sync_count_clamps_above_safe_integer() {
    assert_eq!(sanitize_sync_count(Some("9007199254740993")), MAX_SAFE_INTEGER);
}

// ── Consent scope ───────────────────────────────────────────────

#[test]
fn consent_scope_accepts_zero_and_one() {
    assert_eq!(sanitize_consent_scope(Some("0")), ConsentScope::NotApplicable);
    assert_eq!(sanitize_consent_scope(Some("1")), ConsentScope::Applicable);
}

#[test]
fn consent_scope_defaults_to_applicable() {
    for raw in [None, Some(""), Some("2"), Some("-1"), Some("yes"), Some("0.5"), Some("256")] {
        assert_eq!(sanitize_consent_scope(raw), ConsentScope::Applicable, "input {raw:?}");
    }
}

// ── Timeout ─────────────────────────────────────────────────────

#[test]
fn timeout_valid_values_pass_through() {
    assert_eq!(sanitize_timeout(Some("0")), 0);
    assert_eq!(sanitize_timeout(Some("2500")), 2500);
}

#[test]
fn timeout_invalid_values_default() {
    for raw in [None, Some(""), Some("-5"), Some("soon"), Some("1e3")] {
        assert_eq!(sanitize_timeout(raw), 10_000, "input {raw:?}");
    }
}

// ── Page query ──────────────────────────────────────────────────

#[test]
fn page_params_from_query() {
    let params = PageParams::from_query(
        "?endpoint=rubicon&args=a%3A1%2Cb%3Ax&max_sync_count=5&timeout=300&defaultGdprScope=0&other=1",
    );
    assert_eq!(params.endpoint.as_deref(), Some("rubicon"));
    assert_eq!(params.args.as_deref(), Some("a:1,b:x"));
    assert_eq!(params.max_sync_count.as_deref(), Some("5"));
    assert_eq!(params.timeout.as_deref(), Some("300"));
    assert_eq!(params.default_gdpr_scope.as_deref(), Some("0"));
}

#[test]
fn page_params_first_occurrence_wins() {
    let params = PageParams::from_query("timeout=1&timeout=2");
    assert_eq!(params.timeout.as_deref(), Some("1"));
}

#[test]
fn page_params_plus_is_space_and_bare_keys_are_empty() {
    let params = PageParams::from_query("args=site:my+news&endpoint");
    assert_eq!(params.args.as_deref(), Some("site:my news"));
    assert_eq!(params.endpoint.as_deref(), Some(""));
}

#[test]
fn page_params_into_config() {
    let config = PageParams::from_query("endpoint=rubicon&args=account:42&max_sync_count=-4&timeout=x&defaultGdprScope=0")
        .into_config(&EndpointRegistry::default());

    assert_eq!(config.endpoint_url, RUBICON_ENDPOINT_URL);
    assert_eq!(config.endpoint_args.unwrap()["account"], ArgValue::Int(42));
    assert_eq!(config.max_sync_count, MAX_SAFE_INTEGER);
    assert_eq!(config.timeout_ms, 10_000);
    assert_eq!(config.default_consent_scope, ConsentScope::NotApplicable);
}

#[test]
fn empty_query_gives_defaults() {
    let config = PageParams::from_query("").into_config(&EndpointRegistry::default());
    assert_eq!(config, cookiesync_types::SyncConfig::default());
}
