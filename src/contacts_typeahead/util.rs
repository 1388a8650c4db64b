use serde_json::{json, Value};

pub fn parse_request(line: &str) -> Option<Value> {
    serde_json::from_str(line).ok()
}

pub fn request_field<'a>(request: &'a Value, field: &str) -> Option<&'a str> {
    request.get(field).and_then(Value::as_str)
}

pub fn error_response(message: &str) -> Value {
    json!({ "op": "error", "message": message })
}

// count reports the full match total; the record list is what the UI
// actually renders, capped at max_results when a cap is configured.
pub fn results_response(query: &str, matches: Vec<&Value>, max_results: usize) -> Value {
    let count = matches.len();
    let shown: Vec<&Value> = if max_results > 0 && count > max_results {
        matches[..max_results].to_vec()
    } else {
        matches
    };
    json!({ "op": "results", "query": query, "count": count, "records": shown })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_request() {
        assert!(parse_request(r#"{"op": "search", "query": "bo"}"#).is_some());
        assert!(parse_request("{not json").is_none());
        assert!(parse_request("").is_none());
    }

    #[test]
    fn test_request_field() {
        let request = parse_request(r#"{"op": "search", "query": "bo", "limit": 3}"#).unwrap();
        assert_eq!(Some("search"), request_field(&request, "op"));
        assert_eq!(Some("bo"), request_field(&request, "query"));
        assert_eq!(None, request_field(&request, "limit"));
        assert_eq!(None, request_field(&request, "missing"));
    }

    #[test]
    fn test_error_response() {
        let response = error_response("unknown op: frobnicate");
        assert_eq!(Some("error"), request_field(&response, "op"));
        assert_eq!(
            Some("unknown op: frobnicate"),
            request_field(&response, "message")
        );
    }

    #[test]
    fn test_results_response_truncation() {
        let bob = json!({"name": "Bob", "id": 1});
        let bobby = json!({"name": "Bobby", "id": 2});
        let records = vec![&bob, &bobby];

        let response = results_response("bo", records.clone(), 0);
        assert_eq!(2, response["count"]);
        assert_eq!(2, response["records"].as_array().unwrap().len());

        let response = results_response("bo", records.clone(), 1);
        assert_eq!(2, response["count"]);
        assert_eq!(1, response["records"].as_array().unwrap().len());
        assert_eq!("Bob", response["records"][0]["name"]);

        let response = results_response("bo", records, 5);
        assert_eq!(2, response["records"].as_array().unwrap().len());
    }
}
