//! End-to-end tests for the summary and trend pipelines
//!
//! Fixtures mimic the upstream feed: mixed alias names, locale-formatted
//! numbers, profile URLs, JSON-encoded sub-objects and mixed date formats.

use chrono::NaiveDate;
use rekap_common::{EngineConfig, Error, FieldAliases};
use rekap_engine::{
    ComplianceStatus, Granularity, Platform, RekapEngine, Scope, SummaryRequest, TrendRequest,
};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn instagram_activity() -> Value {
    json!([
        {
            "client_id": "ditbinmas",
            "nama_client": "DIT BINMAS",
            "insta": "@budi_s",
            "nama": "Budi",
            "title": "AKBP",
            "user_id": "1001",
            "likes_personil": "4",
            "total_like": "1.200",
            "tanggal": "2024-05-01"
        },
        {
            "client_id": "DITBINMAS",
            "insta": "https://www.instagram.com/Budi_S/",
            "nama": "Budi S",
            "jumlah_like": 4,
            "tanggal": "2024-05-01T09:30:00+07:00"
        },
        {
            "client_id": "DITBINMAS",
            "insta": "siti",
            "nama": "Siti",
            "title": "BRIPDA",
            "jumlah_like": "2",
            "tanggal": "03/05/2024"
        },
        {
            "client_id": "POLRES_A",
            "nama_client": "Polres A",
            "nama": "Anon",
            "jumlah_like": 1,
            "tanggal": "2024-05-08"
        },
        {
            "client_id": "POLRES_A",
            "insta": "undated",
            "nama": "Undated",
            "jumlah_like": "abc"
        }
    ])
}

fn directory() -> Value {
    json!({
        "data": [
            { "client_id": "DITBINMAS", "insta": "andi", "nama": "Andi", "title": "KOMPOL", "user_id": "1002" },
            { "client_id": "DITBINMAS", "insta": "budi_s", "nama": "Budi Santoso", "title": "AKBP", "divisi": "BINMAS" }
        ]
    })
}

fn summary_request() -> SummaryRequest {
    SummaryRequest::new(Platform::Instagram, instagram_activity())
        .with_directory(directory())
        .with_total_target(4.0)
}

fn names(rows: &[rekap_engine::PersonnelRow]) -> Vec<&str> {
    rows.iter().map(|r| r.display_name.as_str()).collect()
}

#[test]
fn test_instagram_summary_totals() {
    let engine = RekapEngine::with_defaults();
    let summary = engine.summarize(&summary_request()).unwrap();
    let totals = &summary.totals;

    // Budi's two aliases count once; the aggregate total_like is ignored
    assert_eq!(totals.total_likes, 7.0);
    assert_eq!(totals.total_comments, 0.0);
    assert_eq!(totals.total_personnel, 5);
    assert_eq!(totals.active_personnel, 3);
    assert_eq!((totals.sudah, totals.kurang, totals.belum), (1, 2, 2));
    assert_eq!(totals.without_username, 1);
    assert_eq!(totals.total_content, 4.0);
    assert_eq!(totals.compliance_rate, 20.0);
    assert_eq!(totals.total_clients, 2);
    assert_eq!(summary.last_updated, Some(ymd(2024, 5, 8)));
}

#[test]
fn test_directory_metadata_and_activity_metric() {
    let engine = RekapEngine::with_defaults();
    let summary = engine.summarize(&summary_request()).unwrap();

    let budi = summary
        .personnel
        .iter()
        .find(|r| r.person_key.as_str() == "budi_s")
        .unwrap();
    assert_eq!(budi.display_name, "Budi Santoso");
    assert_eq!(budi.division.as_deref(), Some("BINMAS"));
    assert_eq!(budi.nrp.as_deref(), Some("1001"));
    assert_eq!(budi.metric_value, 4.0);
    assert_eq!(budi.status, ComplianceStatus::Sudah);

    let andi = summary
        .personnel
        .iter()
        .find(|r| r.person_key.as_str() == "andi")
        .unwrap();
    assert_eq!(andi.metric_value, 0.0);
    assert_eq!(andi.status, ComplianceStatus::Belum);
}

#[test]
fn test_personnel_priority_and_top_personnel() {
    let engine = RekapEngine::with_defaults();
    let summary = engine.summarize(&summary_request()).unwrap();

    assert_eq!(names(&summary.personnel), ["Budi Santoso", "Andi", "Siti", "Anon", "Undated"]);
    assert_eq!(names(&summary.top_personnel), ["Budi Santoso", "Siti", "Anon"]);
}

#[test]
fn test_display_threshold_is_separate_from_status() {
    let engine = RekapEngine::with_defaults();
    let summary = engine.summarize(&summary_request()).unwrap();

    let siti = summary.personnel.iter().find(|r| r.display_name == "Siti").unwrap();
    assert_eq!(siti.status, ComplianceStatus::Kurang);
    assert!(siti.display_threshold_reached);
    assert_eq!(siti.completion_percent, 50.0);
}

#[test]
fn test_client_groups() {
    let engine = RekapEngine::with_defaults();
    let clients = json!([{ "client_id": "POLRES_A", "nama_client": "POLRES ALPHA" }]);
    let summary = engine
        .summarize(&summary_request().with_clients(clients))
        .unwrap();

    let group_names: Vec<&str> = summary.clients.iter().map(|g| g.display_name.as_str()).collect();
    assert_eq!(group_names, ["DIT BINMAS", "POLRES ALPHA"]);
    assert_eq!(summary.clients[0].totals.personnel_count, 3);
    assert_eq!(summary.clients[0].totals.total_metric, 6.0);
    assert_eq!(summary.clients[1].totals.without_identity, 1);
}

#[test]
fn test_client_codes_sharing_a_name_collapse() {
    let engine = RekapEngine::with_defaults();
    let activity = json!([
        { "client_id": "IG-01", "nama_client": "Client X", "insta": "a", "jumlah_like": 3 },
        { "client_id": "IG-01", "nama_client": "Client X", "insta": "@A", "jumlah_like": 3 },
        { "client_id": "TT-02", "nama_client": "client x ", "insta": "b", "jumlah_like": 2 }
    ]);
    let summary = engine
        .summarize(&SummaryRequest::new(Platform::Instagram, activity).with_total_target(3.0))
        .unwrap();

    assert_eq!(summary.clients.len(), 1);
    let group = &summary.clients[0];
    assert_eq!(group.client_ids.len(), 2);
    assert_eq!(group.totals.total_metric, 5.0);
    assert_eq!(group.totals.personnel_count, 2);
    assert_eq!(group.totals.compliance_rate, 50.0);
}

#[test]
fn test_org_scope() {
    let engine = RekapEngine::with_defaults();
    let summary = engine
        .summarize(&summary_request().with_scope(Scope::org("polres_a")))
        .unwrap();

    assert_eq!(summary.totals.total_personnel, 2);
    assert_eq!(summary.totals.total_likes, 1.0);
    assert_eq!(summary.totals.total_clients, 1);
    assert_eq!(summary.last_updated, Some(ymd(2024, 5, 8)));
}

#[test]
fn test_tiktok_summary() {
    let engine = RekapEngine::with_defaults();
    let activity = json!([
        { "client_id": "C1", "tiktok": "https://www.tiktok.com/@Budi.TT?lang=id", "jumlah_komentar": "1.234", "jumlah_like": 9 },
        { "client_id": "C1", "tiktok": "@budi.tt", "komentar_personil": 3 },
        { "client_id": "C1", "tiktok": "siti.tt", "rekap": "{\"jumlah_komentar\": \"2,5\"}" }
    ]);
    let summary = engine
        .summarize(&SummaryRequest::new(Platform::Tiktok, activity).with_total_target(3.0))
        .unwrap();

    assert_eq!(summary.totals.total_likes, 0.0);
    assert_eq!(summary.totals.total_comments, 5.5);
    assert_eq!(summary.totals.total_personnel, 2);
    assert_eq!(summary.totals.sudah, 1);
}

#[test]
fn test_zero_target_is_belum_for_everyone() {
    let engine = RekapEngine::with_defaults();
    let summary = engine
        .summarize(&summary_request().with_total_target(0.0))
        .unwrap();

    assert!(summary.personnel.iter().all(|r| r.status == ComplianceStatus::Belum));
    // Without a target, activity counts toward the rate
    assert_eq!(summary.totals.compliance_rate, 60.0);
}

#[test]
fn test_summary_output_contract() {
    let engine = RekapEngine::with_defaults();
    let summary = engine.summarize(&summary_request()).unwrap();
    let value = serde_json::to_value(&summary).unwrap();

    assert_eq!(value["platform"], "instagram");
    assert_eq!(value["totals"]["totalLikes"], 7.0);
    assert_eq!(value["totals"]["activePersonnel"], 3);
    assert_eq!(value["totals"]["complianceRate"], 20.0);
    assert_eq!(value["totals"]["withoutUsername"], 1);
    assert_eq!(value["lastUpdated"], "2024-05-08");
    assert_eq!(value["topPersonnel"][0]["personKey"], "budi_s");
    assert_eq!(value["topPersonnel"][0]["status"], "sudah");
    assert_eq!(value["clients"][0]["clientIds"][0], "DITBINMAS");
    assert_eq!(value["clients"][0]["totals"]["sudah"], 1);
}

#[test]
fn test_summary_is_input_order_independent() {
    let engine = RekapEngine::with_defaults();
    let forward = engine.summarize(&summary_request()).unwrap();

    let mut reversed_activity = instagram_activity();
    reversed_activity.as_array_mut().unwrap().reverse();
    let reversed = engine
        .summarize(
            &SummaryRequest::new(Platform::Instagram, reversed_activity)
                .with_directory(directory())
                .with_total_target(4.0),
        )
        .unwrap();

    assert_eq!(forward, reversed);
}

fn permutations(items: &[Value]) -> Vec<Vec<Value>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_duplicate_directory_rows_in_any_order() {
    let engine = RekapEngine::with_defaults();
    let activity = vec![
        json!({ "client_id": "C1", "insta": "https://www.instagram.com/budi/", "nama": "budi", "jumlah_like": 4 }),
        json!({ "client_id": "C1", "insta": "andi", "jumlah_like": 1 }),
    ];
    let directory = vec![
        json!({ "client_id": "C1", "insta": "budi", "nama": "Budi Santoso", "title": "IPTU" }),
        json!({ "client_id": "C1", "insta": "andi", "nama": "Andi" }),
        json!({ "client_id": "C1", "insta": "@Budi", "nama": "Budi", "title": "AKP" }),
    ];

    let mut summaries = Vec::new();
    for activity in permutations(&activity) {
        for directory in permutations(&directory) {
            let request = SummaryRequest::new(Platform::Instagram, Value::Array(activity.clone()))
                .with_directory(Value::Array(directory))
                .with_total_target(4.0);
            summaries.push(engine.summarize(&request).unwrap());
        }
    }

    let first = &summaries[0];
    assert!(summaries.iter().all(|s| s == first));
    assert_eq!(first.totals.total_personnel, 2);
    assert_eq!(first.totals.total_likes, 5.0);

    let budi = first
        .personnel
        .iter()
        .find(|r| r.person_key.as_str() == "budi")
        .unwrap();
    assert_eq!(budi.display_name, "Budi Santoso");
    assert_eq!(budi.rank.as_deref(), Some("IPTU"));
    assert_eq!(budi.metric_value, 4.0);
}

#[test]
fn test_nrp_only_activity_matches_directory_handle() {
    let engine = RekapEngine::with_defaults();
    let activity = json!([{ "client_id": "C1", "user_id": "1001", "jumlah_like": 4 }]);
    let directory = json!([{ "client_id": "C1", "user_id": "1001", "insta": "budi_s", "nama": "Budi" }]);
    let summary = engine
        .summarize(
            &SummaryRequest::new(Platform::Instagram, activity)
                .with_directory(directory)
                .with_total_target(4.0),
        )
        .unwrap();

    assert_eq!(summary.totals.total_personnel, 1);
    assert_eq!(summary.totals.sudah, 1);
    assert_eq!(summary.totals.without_username, 0);
    assert_eq!(summary.personnel[0].person_key.as_str(), "budi_s");
    assert_eq!(summary.personnel[0].display_name, "Budi");
    assert_eq!(summary.personnel[0].nrp.as_deref(), Some("1001"));
}

#[test]
fn test_malformed_invocation() {
    let engine = RekapEngine::with_defaults();
    let result = engine.summarize(&SummaryRequest::new(Platform::Instagram, json!({ "message": "unauthorized" })));
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let result = engine.summarize(&summary_request().with_directory(json!(42)));
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    assert!(matches!(
        SummaryRequest::from_json_text(Platform::Instagram, "[{\"insta\": "),
        Err(Error::Json(_))
    ));
}

#[test]
fn test_json_text_entry() {
    let engine = RekapEngine::with_defaults();
    let request = SummaryRequest::from_json_text(
        Platform::Instagram,
        r#"[{ "client_id": "C1", "insta": "budi", "jumlah_like": "1.234,5" }]"#,
    )
    .unwrap()
    .with_directory_text(r#"[{ "client_id": "C1", "insta": "andi" }]"#)
    .unwrap();

    let summary = engine.summarize(&request).unwrap();
    assert_eq!(summary.totals.total_likes, 1234.5);
    assert_eq!(summary.totals.total_personnel, 2);
    assert_eq!(summary.last_updated, None);
}

#[test]
fn test_config_file_drives_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rekap.toml");
    fs::write(
        &path,
        r#"
        [priority]
        name_overrides = ["Siti"]

        [summary]
        top_personnel_limit = 1
        "#,
    )
    .unwrap();

    let engine = RekapEngine::new(EngineConfig::load(Some(&path)).unwrap()).unwrap();
    let summary = engine.summarize(&summary_request()).unwrap();

    assert_eq!(summary.personnel[0].display_name, "Siti");
    assert_eq!(names(&summary.top_personnel), ["Budi Santoso"]);
}

#[test]
fn test_weekly_trend() {
    let engine = RekapEngine::with_defaults();
    let request = TrendRequest::new(Platform::Instagram, instagram_activity(), Granularity::Week);
    let buckets = engine.trend(&request).unwrap();

    let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, ["2024-W18", "2024-W19"]);
    let sizes: Vec<usize> = buckets.iter().map(|b| b.records.len()).collect();
    assert_eq!(sizes, [2, 1]);
    assert_eq!(buckets[0].total_metric, 6.0);
    assert_eq!(buckets[0].personnel_count, 2);
    assert_eq!(buckets[1].total_metric, 1.0);
}

#[test]
fn test_monthly_trend() {
    let engine = RekapEngine::with_defaults();
    let request = TrendRequest::new(Platform::Instagram, instagram_activity(), Granularity::Month);
    let buckets = engine.trend(&request).unwrap();

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].key, "2024-05");
    assert_eq!(buckets[0].records.len(), 3);
    assert_eq!(buckets[0].total_metric, 7.0);
}

#[test]
fn test_trend_sums_days_within_bucket() {
    let engine = RekapEngine::with_defaults();
    let activity = json!([
        { "insta": "budi", "jumlah_like": 2, "tanggal": "2024-05-01" },
        { "insta": "@budi", "jumlah_like": 2, "tanggal": "2024-05-01" },
        { "insta": "budi", "jumlah_like": 3, "tanggal": "2024-05-02" }
    ]);
    let buckets = engine
        .trend(&TrendRequest::new(Platform::Instagram, activity, Granularity::Week))
        .unwrap();

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].records.len(), 2);
    assert_eq!(buckets[0].total_metric, 5.0);
    assert_eq!(buckets[0].personnel_count, 1);
}

#[test]
fn test_trend_fill_gaps_and_scope() {
    let engine = RekapEngine::with_defaults();
    let activity = json!([
        { "client_id": "C1", "insta": "a", "jumlah_like": 1, "tanggal": "2024-05-01" },
        { "client_id": "C1", "insta": "b", "jumlah_like": 1, "tanggal": "2024-05-20" },
        { "client_id": "C2", "insta": "c", "jumlah_like": 1, "tanggal": "2024-05-13" }
    ]);
    let request = TrendRequest::new(Platform::Instagram, activity, Granularity::Week)
        .with_scope(Scope::org("c1"))
        .with_fill_gaps(true);
    let buckets = engine.trend(&request).unwrap();

    let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, ["2024-W18", "2024-W19", "2024-W20", "2024-W21"]);
    let sizes: Vec<usize> = buckets.iter().map(|b| b.records.len()).collect();
    assert_eq!(sizes, [1, 0, 0, 1]);
}

#[test]
fn test_trend_custom_date_fields() {
    let engine = RekapEngine::with_defaults();
    let activity = json!([
        { "insta": "a", "jumlah_like": 1, "tanggal": "2024-05-01", "rekap": "{\"periode\": \"Juni 2024\"}" },
        { "insta": "b", "jumlah_like": 1, "rekap": "{\"periode\": \"15 Juli 2024\"}" }
    ]);
    let request = TrendRequest::new(Platform::Instagram, activity, Granularity::Month)
        .with_date_fields(FieldAliases::new(["rekap.periode"]));
    let buckets = engine.trend(&request).unwrap();

    let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, ["2024-06", "2024-07"]);
}
