use folio::domain::model::{DataSource, Fetched};
use folio::presentation::render::{format_file_size, format_section, notice, source_notice, NoticeKind};
use folio::presentation::theme::Theme;
use serde_json::json;

#[test]
fn test_file_sizes() {
    assert_eq!(format_file_size(0), "0 Bytes");
    assert_eq!(format_file_size(512), "512 Bytes");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
}

#[test]
fn test_section_tree_unwraps_data() {
    let theme = Theme::from_name("plain");
    let fetched = Fetched {
        value: json!({
            "data": [
                { "title": "folio", "stars": 12 },
                { "title": "kd", "tags": ["cli", "rust"] }
            ]
        }),
        source: DataSource::Cache,
    };

    let rendered = format_section(&theme, "getProjects", &fetched);

    assert!(rendered.starts_with("getProjects [cached]\n"));
    assert!(rendered.contains("  title: folio\n"));
    assert!(rendered.contains("  stars: 12\n"));
    assert!(rendered.contains("  tags:\n    • cli\n    • rust\n"));
    assert!(!rendered.contains("data"));
}

#[test]
fn test_offline_notice_only_for_offline_cache() {
    let theme = Theme::from_name("plain");

    assert_eq!(
        source_notice(&theme, DataSource::OfflineCache).as_deref(),
        Some("⚠ You are offline. Showing cached data.")
    );
    assert!(source_notice(&theme, DataSource::Cache).is_none());
    assert!(source_notice(&theme, DataSource::Network).is_none());
    assert_eq!(notice(&theme, NoticeKind::Success, "Sent"), "✔ Sent");
}
