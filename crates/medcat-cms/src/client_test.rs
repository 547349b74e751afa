use super::*;

fn test_client(base_url: &str) -> CmsClient {
    CmsClient::new(base_url, "test-token", "medical-products", 5, 0, 0)
        .expect("client construction should not fail")
}

#[test]
fn build_url_appends_api_prefix_and_segments() {
    let client = test_client("http://localhost:1337");
    let url = client.build_url(&["medical-products", "42"], &[]).unwrap();
    assert_eq!(url.as_str(), "http://localhost:1337/api/medical-products/42");
}

#[test]
fn build_url_keeps_mount_prefix_and_strips_trailing_slash() {
    let client = test_client("https://cms.example.com/backend/");
    let url = client.build_url(&["categories"], &[]).unwrap();
    assert_eq!(url.as_str(), "https://cms.example.com/backend/api/categories");
}

#[test]
fn build_url_encodes_filter_keys_and_values() {
    let client = test_client("http://localhost:1337");
    let url = client
        .build_url(&["medical-products"], &[("filters[name][$eq]", "Gauze & Tape")])
        .unwrap();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        vec![("filters[name][$eq]".to_owned(), "Gauze & Tape".to_owned())]
    );
    assert!(!url.as_str().contains("Gauze & Tape"));
}

#[test]
fn non_http_base_url_is_rejected() {
    let result = CmsClient::new("ftp://files.example.com", "t", "c", 5, 0, 0);
    assert!(matches!(result, Err(CmsError::InvalidBaseUrl { .. })));
    let result = CmsClient::new("not a url", "t", "c", 5, 0, 0);
    assert!(matches!(result, Err(CmsError::InvalidBaseUrl { .. })));
}

#[test]
fn expect_status_keeps_body_of_rejected_response() {
    let err = expect_status(StatusCode::BAD_REQUEST, "bad".to_owned(), created_or_ok).unwrap_err();
    assert_eq!(err.to_string(), "HTTP 400: bad");
}
