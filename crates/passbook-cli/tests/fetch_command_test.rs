use passbook_adapters::{BankContext, CitiAdapter, FetchOptions, HttpResponse, ReplayClient};
use passbook_cli::commands::fetch::execute;
use passbook_cli::output::statement_path;
use passbook_core::BrowserState;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const CITI: &str = "https://online.citi.com/gcgapi/prod/public/v1";

fn citi_context() -> BankContext {
    let client = ReplayClient::new()
        .on_get(
            format!("{CITI}/digital/customers/profileBasicInfo"),
            HttpResponse::json_body(200, &json!({"firstName": "Jane", "lastName": "Doe"})),
        )
        .on_get(
            format!("{CITI}/digital/accounts/summary"),
            HttpResponse::json_body(
                200,
                &json!({"accounts": [
                    {"accountId": "acct-1", "displayAccountNumber": "xxxx1234", "productType": "CHECKING", "productName": "Citi Priority"}
                ]}),
            ),
        )
        .on_post(
            format!("{CITI}/digital/deposits/statements/retrieve"),
            HttpResponse::json_body(
                200,
                &json!({"documents": [
                    {"documentDate": "2025-04-30", "documentKey": "k-apr", "documentType": "STATEMENT"},
                    {"documentDate": "2025-05-31", "documentKey": "k-may", "documentType": "STATEMENT"}
                ]}),
            ),
        )
        .on_get(
            format!("{CITI}/digital/deposits/documents/k-may"),
            HttpResponse::pdf(vec![0x25; 2048]),
        )
        .on_get(
            format!("{CITI}/digital/deposits/documents/k-apr"),
            HttpResponse::new(500, "down for maintenance"),
        );
    let state = BrowserState::new().with_cookie("bcsid", "abc123", ".citi.com");
    BankContext::new(Arc::new(client), Arc::new(state))
        .with_today("2025-06-15".parse().expect("valid date"))
}

#[tokio::test]
async fn test_fetch_writes_statements_and_reports_failures() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let summary = execute(
        &CitiAdapter::new(),
        &citi_context(),
        FetchOptions {
            download: true,
            max_statements_per_account: None,
        },
        temp_dir.path(),
    )
    .await
    .expect("fetch");

    assert_eq!(summary.statements.len(), 2);
    assert_eq!(summary.written.len(), 1);
    let may = summary
        .statements
        .iter()
        .find(|s| s.statement_id == "acct-1|k-may")
        .expect("may statement");
    assert_eq!(
        summary.written[0],
        statement_path(temp_dir.path(), "citi", may)
    );
    let file_name = summary.written[0]
        .file_name()
        .expect("file name")
        .to_string_lossy()
        .into_owned();
    assert!(file_name.starts_with("2025-05-31-"));
    assert_eq!(
        std::fs::read(&summary.written[0]).expect("read pdf").len(),
        2048
    );

    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].contains("acct-1|k-apr"));
}

#[tokio::test]
async fn test_list_only_writes_nothing() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let summary = execute(
        &CitiAdapter::new(),
        &citi_context(),
        FetchOptions::default(),
        temp_dir.path(),
    )
    .await
    .expect("fetch");

    assert_eq!(summary.statements.len(), 2);
    assert!(summary.written.is_empty());
    assert!(summary.failures.is_empty());
    assert!(!temp_dir.path().join("citi").exists());
}

#[tokio::test]
async fn test_same_mask_accounts_do_not_overwrite_each_other() {
    let client = ReplayClient::new()
        .on_get(
            format!("{CITI}/digital/customers/profileBasicInfo"),
            HttpResponse::json_body(200, &json!({"firstName": "Jane"})),
        )
        .on_get(
            format!("{CITI}/digital/accounts/summary"),
            HttpResponse::json_body(
                200,
                &json!({"accounts": [
                    {"accountId": "a1", "displayAccountNumber": "xxxx1234", "productType": "CHECKING"},
                    {"accountId": "a2", "displayAccountNumber": "yyyy1234", "productType": "SAVINGS"}
                ]}),
            ),
        )
        .on_post(
            format!("{CITI}/digital/deposits/statements/retrieve"),
            HttpResponse::json_body(
                200,
                &json!({"documents": [
                    {"documentDate": "2025-05-31", "documentKey": "k-stmt", "documentType": "STATEMENT"},
                    {"documentDate": "2025-05-31", "documentKey": "k-stmt-corrected", "documentType": "STATEMENT"}
                ]}),
            ),
        )
        .on_get(
            format!("{CITI}/digital/deposits/documents/"),
            HttpResponse::pdf(vec![0x25; 512]),
        );
    let state = BrowserState::new().with_cookie("bcsid", "abc123", ".citi.com");
    let ctx = BankContext::new(Arc::new(client), Arc::new(state))
        .with_today("2025-06-15".parse().expect("valid date"));
    let temp_dir = TempDir::new().expect("create temp dir");

    let summary = execute(
        &CitiAdapter::new(),
        &ctx,
        FetchOptions {
            download: true,
            max_statements_per_account: None,
        },
        temp_dir.path(),
    )
    .await
    .expect("fetch");

    // Two accounts masked 1234, each with two documents dated 2025-05-31
    assert_eq!(summary.statements.len(), 4);
    assert!(summary.failures.is_empty());
    let mut written = summary.written.clone();
    written.sort();
    written.dedup();
    assert_eq!(written.len(), 4);
    assert!(written.iter().all(|path| path.exists()));
}
