//! Flattening of structured-state entries into telemetry properties
//!
//! Every [`StateValue`] shape has exactly one handler. Each entry is
//! extracted into a bag of its own, so a failure part way through an entry
//! never leaves half of its properties behind.

use crate::redaction::RedactionPolicy;
use lumen_core::http::{
    status_name, version_string, InboundRequest, OutboundRequest, OutboundResponse,
};
use lumen_core::{ExtractionError, PropertyBag, StateValue};

/// Render header values as `["v1","v2"]`
pub fn render_header_values(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("\"{}\"", v)).collect();
    format!("[{}]", quoted.join(","))
}

/// Extract the properties of a single structured-state value.
///
/// Bodies are read through `&mut` so that streamed content can be buffered
/// and seekable bodies rewound for later readers.
pub fn extract(
    value: &mut StateValue,
    policy: &RedactionPolicy,
) -> Result<PropertyBag, ExtractionError> {
    let mut bag = PropertyBag::new();

    match value {
        StateValue::Map(entries) | StateValue::Pairs(entries) => {
            for (key, value) in entries.iter() {
                bag.insert_opt(key.as_str(), value.as_deref());
            }
        }
        StateValue::Pair(key, value) => bag.insert_opt(key.as_str(), value.as_deref()),
        StateValue::OutboundResponse(response) => extract_outbound_response(response, &mut bag)?,
        StateValue::OutboundRequest(request) => extract_outbound_request(request, &mut bag)?,
        StateValue::InboundRequest(request) => extract_inbound_request(request, policy, &mut bag)?,
        StateValue::Object(key, object) => bag.insert(key.as_str(), object.to_json()?),
        StateValue::Opaque(_) => {}
    }

    Ok(bag)
}

fn extract_outbound_response(
    response: &mut OutboundResponse,
    bag: &mut PropertyBag,
) -> Result<(), ExtractionError> {
    bag.insert("ResponseStatusCode", status_name(response.status));
    bag.insert_opt("ResponseReasonPhrase", response.reason.as_deref());
    bag.insert("ResponseVersion", version_string(response.version));

    let content = match response.content.as_mut() {
        Some(content) => content.read_to_string()?,
        None => String::new(),
    };
    bag.insert("ResponseContent", content);

    for (name, values) in response.headers.iter() {
        bag.insert(format!("ResponseHeader{}", name), render_header_values(values));
    }

    extract_outbound_request(&mut response.request, bag)
}

fn extract_outbound_request(
    request: &mut OutboundRequest,
    bag: &mut PropertyBag,
) -> Result<(), ExtractionError> {
    bag.insert("RequestMethod", request.method.as_str());
    bag.insert("RequestUri", request.uri.to_string());
    bag.insert("RequestVersion", version_string(request.version));

    let content = match request.content.as_mut() {
        Some(content) => content.read_to_string()?,
        None => String::new(),
    };
    bag.insert("RequestContent", content);

    for (name, values) in request.headers.iter() {
        bag.insert(format!("RequestHeader{}", name), render_header_values(values));
    }

    for (name, value) in &request.properties {
        bag.insert_opt(format!("RequestProperty{}", name), value.as_deref());
    }

    Ok(())
}

// Headers are masked here, before rendering, so a sensitive value never
// reaches the bag.
fn extract_inbound_request(
    request: &mut InboundRequest,
    policy: &RedactionPolicy,
    bag: &mut PropertyBag,
) -> Result<(), ExtractionError> {
    bag.insert("RequestMethod", request.method.as_str());
    bag.insert("RequestUri", request.display_uri());
    bag.insert("RequestContent", request.read_body()?);

    for (name, values) in request.headers.iter() {
        let value = match policy.mask_for(name) {
            Some(mask) => mask.to_string(),
            None => render_header_values(values),
        };
        bag.insert(format!("RequestHeader_{}", name), value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode, Uri, Version};
    use lumen_core::config::DEFAULT_MASK;
    use lumen_core::http::HttpContent;
    use serde::Serialize;
    use std::io::{self, Cursor};

    fn keys(bag: &PropertyBag) -> Vec<&str> {
        bag.keys().collect()
    }

    fn outbound_request() -> OutboundRequest {
        OutboundRequest::new(Method::POST, Uri::from_static("https://api.example.com/orders?x=1"))
            .with_header("Accept", "application/json")
            .with_header("Accept", "text/plain")
            .with_content("{\"sku\":\"A1\"}")
            .with_property("RetryCount", Some("2".to_string()))
            .with_property("Unset", None)
    }

    #[test]
    fn test_render_header_values() {
        assert_eq!(render_header_values(&["a".into(), "b c".into()]), r#"["a","b c"]"#);
        assert_eq!(render_header_values(&[]), "[]");
    }

    #[test]
    fn test_map_and_pairs() {
        let policy = RedactionPolicy::default();

        let mut map = StateValue::map([("UserId", "abc123"), ("Region", "eu")]);
        let bag = extract(&mut map, &policy).unwrap();
        assert_eq!(keys(&bag), vec!["UserId", "Region"]);

        let mut pairs = StateValue::Pairs(vec![
            ("A".to_string(), Some("1".to_string())),
            ("B".to_string(), None),
        ]);
        let bag = extract(&mut pairs, &policy).unwrap();
        assert_eq!(bag.iter().collect::<Vec<_>>(), vec![("A", "1")]);

        let mut pair = StateValue::pair("OrderId", "42");
        let bag = extract(&mut pair, &policy).unwrap();
        assert_eq!(bag.get("OrderId"), Some("42"));
    }

    #[test]
    fn test_outbound_request_keys() {
        let mut value = StateValue::from(outbound_request());
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();

        assert_eq!(
            keys(&bag),
            vec![
                "RequestMethod",
                "RequestUri",
                "RequestVersion",
                "RequestContent",
                "RequestHeaderAccept",
                "RequestPropertyRetryCount",
            ]
        );
        assert_eq!(bag.get("RequestMethod"), Some("POST"));
        assert_eq!(bag.get("RequestUri"), Some("https://api.example.com/orders?x=1"));
        assert_eq!(bag.get("RequestVersion"), Some("1.1"));
        assert_eq!(bag.get("RequestContent"), Some("{\"sku\":\"A1\"}"));
        assert_eq!(
            bag.get("RequestHeaderAccept"),
            Some(r#"["application/json","text/plain"]"#)
        );
        assert_eq!(bag.get("RequestPropertyRetryCount"), Some("2"));
    }

    #[test]
    fn test_outbound_request_without_content_is_empty() {
        let mut value = StateValue::from(OutboundRequest::new(
            Method::GET,
            Uri::from_static("http://localhost/health"),
        ));
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();
        assert_eq!(bag.get("RequestContent"), Some(""));
    }

    #[test]
    fn test_outbound_headers_are_not_redacted() {
        let request = OutboundRequest::new(Method::GET, Uri::from_static("http://localhost/"))
            .with_header("Authorization", "Bearer xyz");
        let mut value = StateValue::from(request);
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();
        assert_eq!(bag.get("RequestHeaderAuthorization"), Some(r#"["Bearer xyz"]"#));
    }

    #[test]
    fn test_outbound_response_includes_request() {
        let response = OutboundResponse::new(StatusCode::NOT_FOUND, outbound_request())
            .with_version(Version::HTTP_2)
            .with_header("Content-Type", "application/json")
            .with_content(HttpContent::from_stream(Box::pin(futures::stream::iter(vec![
                Ok::<_, io::Error>(Bytes::from_static(b"{\"error\":")),
                Ok(Bytes::from_static(b"\"missing\"}")),
            ]))));
        let mut value = StateValue::from(response);
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();

        assert_eq!(
            keys(&bag),
            vec![
                "ResponseStatusCode",
                "ResponseReasonPhrase",
                "ResponseVersion",
                "ResponseContent",
                "ResponseHeaderContent-Type",
                "RequestMethod",
                "RequestUri",
                "RequestVersion",
                "RequestContent",
                "RequestHeaderAccept",
                "RequestPropertyRetryCount",
            ]
        );
        assert_eq!(bag.get("ResponseStatusCode"), Some("NotFound"));
        assert_eq!(bag.get("ResponseReasonPhrase"), Some("Not Found"));
        assert_eq!(bag.get("ResponseVersion"), Some("2.0"));
        assert_eq!(bag.get("ResponseContent"), Some("{\"error\":\"missing\"}"));

        // The streamed body stays readable afterwards
        let StateValue::OutboundResponse(response) = &mut value else {
            panic!("shape changed");
        };
        let content = response.content.as_mut().unwrap();
        assert_eq!(content.read_to_string().unwrap(), "{\"error\":\"missing\"}");
    }

    #[test]
    fn test_inbound_request_masks_authorization() {
        let request = InboundRequest::new(Method::PUT, "https", "shop.example.com")
            .with_path("/cart/7")
            .with_query("coupon=SAVE")
            .with_header("Authorization", "Bearer xyz")
            .with_header("User-Agent", "curl/8.0")
            .with_body(Cursor::new(b"{\"qty\":3}".to_vec()), 9);
        let mut value = StateValue::from(request);
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();

        assert_eq!(
            keys(&bag),
            vec![
                "RequestMethod",
                "RequestUri",
                "RequestContent",
                "RequestHeader_Authorization",
                "RequestHeader_User-Agent",
            ]
        );
        assert_eq!(bag.get("RequestUri"), Some("https://shop.example.com/cart/7?coupon=SAVE"));
        assert_eq!(bag.get("RequestContent"), Some("{\"qty\":3}"));
        assert_eq!(bag.get("RequestHeader_Authorization"), Some(DEFAULT_MASK));
        assert_eq!(bag.get("RequestHeader_User-Agent"), Some(r#"["curl/8.0"]"#));
    }

    #[test]
    fn test_inbound_lowercase_authorization_is_masked() {
        let request = InboundRequest::new(Method::GET, "https", "shop.example.com")
            .with_header("authorization", "Bearer xyz")
            .with_header("accept", "*/*");
        let mut value = StateValue::from(request);
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();

        assert_eq!(bag.get("RequestHeader_authorization"), Some(DEFAULT_MASK));
        assert_eq!(bag.get("RequestHeader_accept"), Some(r#"["*/*"]"#));
        assert!(!bag.iter().any(|(_, v)| v.contains("Bearer xyz")));
    }

    #[test]
    fn test_inbound_request_without_body() {
        let mut value = StateValue::from(InboundRequest::new(Method::GET, "http", "localhost"));
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();
        assert_eq!(bag.get("RequestContent"), Some(""));
        assert_eq!(bag.get("RequestUri"), Some("http://localhost/"));
    }

    #[test]
    fn test_inbound_length_mismatch_fails() {
        let request = InboundRequest::new(Method::POST, "http", "localhost")
            .with_body(Cursor::new(b"short".to_vec()), 64);
        let mut value = StateValue::from(request);
        assert!(matches!(
            extract(&mut value, &RedactionPolicy::default()),
            Err(ExtractionError::ContentLength { declared: 64, read: 5 })
        ));
    }

    #[test]
    fn test_object_serialized_as_compact_json() {
        #[derive(Serialize)]
        struct Customer {
            id: u32,
            tags: Vec<&'static str>,
        }

        let mut value = StateValue::object(
            "Customer",
            Customer {
                id: 9,
                tags: vec!["vip"],
            },
        );
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();
        assert_eq!(bag.get("Customer"), Some(r#"{"id":9,"tags":["vip"]}"#));
    }

    #[test]
    fn test_object_serialization_failure() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "x");
        let mut value = StateValue::object("Bad", bad);
        assert!(matches!(
            extract(&mut value, &RedactionPolicy::default()),
            Err(ExtractionError::Serialize(_))
        ));
    }

    #[test]
    fn test_opaque_is_skipped() {
        let mut value = StateValue::opaque(3.5);
        let bag = extract(&mut value, &RedactionPolicy::default()).unwrap();
        assert!(bag.is_empty());
    }
}
