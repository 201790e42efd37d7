//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::json::AuthStatusOutput;
    use super::super::text::TextFormatter;
    use chrono::{Duration, Utc};
    use grocer_core::{
        BatchReport, CandidateProduct, CartMutationOutcome, Credential, GroceryRequest,
        MatchResult, StoreLocation, Unit,
    };
    use std::collections::BTreeSet;

    fn milk() -> CandidateProduct {
        CandidateProduct::new("0001111041700", "Kroger Whole Milk")
            .with_size("1 gal")
            .with_price(3.49)
    }

    #[test]
    fn test_added_outcome() {
        let formatter = TextFormatter::new(false);
        let request = GroceryRequest::new("milk").with_cart_quantity(2);
        let outcome = CartMutationOutcome::added(request, milk());

        let text = formatter.format_outcome(&outcome);
        assert_eq!(text, "✓ milk → 2 x Kroger Whole Milk (1 gal) $3.49");
    }

    #[test]
    fn test_ambiguous_outcome_lists_alternates() {
        let formatter = TextFormatter::new(false);
        let result = MatchResult {
            request: GroceryRequest::new("apples"),
            chosen: None,
            confidence: 0.3,
            alternates: vec![
                CandidateProduct::new("1", "Gala Apples"),
                CandidateProduct::new("2", "Fuji Apples"),
            ],
            all_out_of_stock: false,
        };
        let outcome = CartMutationOutcome::unmatched(result);

        let text = formatter.format_outcome(&outcome);
        assert!(text.starts_with("? apples: 2 candidates"));
        assert!(text.contains("    1. Gala Apples"));
        assert!(text.contains("    2. Fuji Apples"));
    }

    #[test]
    fn test_api_error_colored() {
        let formatter = TextFormatter::new(true);
        let outcome = CartMutationOutcome::api_error(GroceryRequest::new("bread"), "Unauthorized");

        let text = formatter.format_outcome(&outcome);
        assert!(text.contains("\x1b[31m"), "Errors should be red");
        assert!(text.contains("Unauthorized"));
    }

    #[test]
    fn test_batch_summary_line() {
        let formatter = TextFormatter::new(false);
        let report = BatchReport {
            outcomes: vec![
                CartMutationOutcome::added(GroceryRequest::new("milk"), milk()),
                CartMutationOutcome::unmatched(MatchResult::empty(GroceryRequest::new("unobtainium"))),
                CartMutationOutcome::api_error(GroceryRequest::new("bread"), "RemoteUnavailable"),
            ],
            interrupted_by: None,
        };

        let text = formatter.format_batch(&report, false);
        assert!(text.ends_with("Cart of 3 items: 1 added, 1 not found, 1 failed"));

        let preview = formatter.format_batch(&report, true);
        assert!(preview.contains("1 would add"));
    }

    #[test]
    fn test_batch_interrupted_by_auth() {
        let formatter = TextFormatter::new(false);
        let report = BatchReport {
            outcomes: vec![CartMutationOutcome::api_error(
                GroceryRequest::new("milk"),
                "ReauthorizationRequired",
            )],
            interrupted_by: Some("ReauthorizationRequired".to_string()),
        };

        let text = formatter.format_batch(&report, false);
        assert!(text.contains("grocer auth login"));
    }

    #[test]
    fn test_match_shows_request_and_candidates() {
        let formatter = TextFormatter::new(false);
        let request = GroceryRequest::new("milk").with_size(1.0, Unit::Gallon);
        let result = MatchResult {
            request,
            chosen: Some(milk()),
            confidence: 0.82,
            alternates: vec![milk()],
            all_out_of_stock: false,
        };

        let text = formatter.format_match(&result);
        assert!(text.starts_with("Searching for milk, size 1 gal"));
        assert!(text.contains("Best: Kroger Whole Milk (1 gal) $3.49 [0001111041700]"));
        assert!(text.contains("Confidence: 0.82"));
        assert!(text.contains("Candidates:"));
    }

    #[test]
    fn test_match_all_out_of_stock() {
        let formatter = TextFormatter::new(false);
        let result = MatchResult {
            all_out_of_stock: true,
            ..MatchResult::empty(GroceryRequest::new("eggs"))
        };
        assert!(formatter.format_match(&result).contains("out of stock"));
    }

    #[test]
    fn test_stores_marks_selected() {
        let formatter = TextFormatter::new(false);
        let stores = vec![
            StoreLocation {
                store_id: "70100123".to_string(),
                name: "Fred Meyer - Hawthorne".to_string(),
                address: "3805 SE Hawthorne Blvd, Portland, OR".to_string(),
                zip_code: "97214".to_string(),
            },
            StoreLocation {
                store_id: "70100456".to_string(),
                name: "Fred Meyer - Burlingame".to_string(),
                address: String::new(),
                zip_code: "97239".to_string(),
            },
        ];

        let text = formatter.format_stores(&stores, Some("70100456"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " 1. Fred Meyer - Hawthorne [70100123]");
        assert_eq!(lines[1], "    3805 SE Hawthorne Blvd, Portland, OR");
        assert_eq!(lines[2], " 2. Fred Meyer - Burlingame [70100456] ✓");

        assert_eq!(formatter.format_stores(&[], None), "No stores found");
    }

    #[test]
    fn test_auth_status() {
        let formatter = TextFormatter::new(false);
        let now = Utc::now();

        let missing = AuthStatusOutput::new("default", "memory".to_string(), None, now);
        assert!(formatter.format_auth_status(&missing).contains("not authorized"));

        let credential = Credential {
            client_id: "grocer-app".to_string(),
            client_secret: "s3cret".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: now - Duration::minutes(5),
            scopes: BTreeSet::from(["cart.basic:write".to_string()]),
        };
        let expired = AuthStatusOutput::new("default", "memory".to_string(), Some(&credential), now);
        let text = formatter.format_auth_status(&expired);
        assert!(text.contains("access token expired (will refresh)"));
        assert!(text.contains("Scopes:  cart.basic:write"));
        assert!(!text.contains("s3cret"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{AuthStatusOutput, JsonFormatter};
    use chrono::Utc;
    use grocer_core::{BatchReport, CandidateProduct, CartMutationOutcome, GroceryRequest, StoreLocation};

    #[test]
    fn test_format_pretty_json() {
        let formatter = JsonFormatter::new(true);

        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();

        assert!(output.contains('\n'));
        assert!(output.contains("  "));
    }

    #[test]
    fn test_format_compact_json() {
        let formatter = JsonFormatter::new(false);

        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();

        assert_eq!(output, r#"{"key":"value"}"#);
    }

    #[test]
    fn test_format_batch() {
        let formatter = JsonFormatter::new(false);
        let report = BatchReport {
            outcomes: vec![
                CartMutationOutcome::added(
                    GroceryRequest::new("milk"),
                    CandidateProduct::new("0001111041700", "Kroger Whole Milk"),
                ),
                CartMutationOutcome::api_error(GroceryRequest::new("bread"), "Cancelled"),
            ],
            interrupted_by: Some("Cancelled".to_string()),
        };

        let output = formatter.format_batch(&report, false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["summary"]["total"], 2);
        assert_eq!(parsed["summary"]["added"], 1);
        assert_eq!(parsed["summary"]["apiError"], 1);
        assert_eq!(parsed["interruptedBy"], "Cancelled");
        assert_eq!(parsed["outcomes"][0]["status"], "added");
        assert_eq!(parsed["outcomes"][1]["detail"], "Cancelled");
        assert!(parsed.get("dryRun").is_none());

        let preview = formatter.format_batch(&report, true).unwrap();
        assert!(preview.contains(r#""dryRun":true"#));
    }

    #[test]
    fn test_format_stores() {
        let formatter = JsonFormatter::new(false);
        let stores = vec![StoreLocation {
            store_id: "70100123".to_string(),
            name: "Fred Meyer - Hawthorne".to_string(),
            address: "3805 SE Hawthorne Blvd, Portland, OR".to_string(),
            zip_code: "97214".to_string(),
        }];

        let output = formatter.format_stores(&stores, Some("70100123")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed[0]["index"], 1);
        assert_eq!(parsed[0]["selected"], true);
        assert_eq!(parsed[0]["store_id"], "70100123");
    }

    #[test]
    fn test_auth_status_never_includes_tokens() {
        let formatter = JsonFormatter::new(false);
        let status = AuthStatusOutput::new("work", "keychain:grocer/work".to_string(), None, Utc::now());

        let output = formatter.format(&status).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["profile"], "work");
        assert_eq!(parsed["authorized"], false);
        assert_eq!(parsed["location"], "keychain:grocer/work");
        assert!(parsed.get("expiresAt").is_none());
        assert!(!output.contains("access"));
    }
}
