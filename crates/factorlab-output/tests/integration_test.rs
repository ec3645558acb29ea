//! Integration tests: tables written by a study flow into a report.

use factorlab_output::{Cell, ExportFormat, Exporter, Figure, Panel, PanelKind, ReportDocument, Table};
use std::path::PathBuf;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("factorlab-output-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn summary_csv_feeds_markdown_and_pdf_report() {
    let dir = temp_dir("report");

    let summary = Table::metrics(vec![
        ("Beta (UMD)".to_string(), Cell::Number(0.2734)),
        ("Alpha (monthly)".to_string(), Cell::Number(0.0012)),
        ("N".to_string(), Cell::from(110_usize)),
        ("Start".to_string(), Cell::from("2015-11")),
    ]);
    let csv_path = dir.join("q2_1_regression_summary.csv");
    summary.export_to_file(&csv_path, ExportFormat::Csv).unwrap();

    let loaded = Table::read_csv(&csv_path).unwrap();
    let beta = loaded.metric("Beta (UMD)").and_then(Cell::as_f64).unwrap();
    assert!((beta - 0.2734).abs() < 1e-12);
    assert_eq!(loaded.metric("Start"), Some(&Cell::Text("2015-11".to_string())));

    let figure = Figure::new(1).panel(Panel::new(
        "Scatter",
        PanelKind::Scatter {
            points: vec![(0.01, 0.02), (-0.02, -0.01), (0.03, 0.025)],
            fit: Some((0.0, 0.8)),
        },
    ));
    figure.write_svg(&dir.join("fig.svg")).unwrap();

    let mut doc = ReportDocument::new();
    doc.title("Smart Beta Momentum Report")
        .heading(1, "Q2.1 UMD beta")
        .paragraph(&format!("Estimated UMD beta: **{beta:.4}**."))
        .table(loaded, 4)
        .figure("fig.svg", "Regression diagnostics")
        .heading(1, "Q2.3 Long leg")
        .placeholder("long-leg");

    let md_path = dir.join("REPORT.md");
    let pdf_path = dir.join("REPORT.pdf");
    doc.write_markdown(&md_path).unwrap();
    doc.write_pdf(&pdf_path).unwrap();

    let md = std::fs::read_to_string(&md_path).unwrap();
    assert!(md.contains("Estimated UMD beta: **0.2734**."));
    assert!(md.contains("| Beta (UMD) | 0.2734 |"));
    assert!(md.contains("| N | 110 |"));
    assert!(md.contains("Run **long-leg** to populate this section."));
    assert!(std::fs::read(&pdf_path).unwrap().starts_with(b"%PDF"));
    assert!(std::fs::read_to_string(dir.join("fig.svg")).unwrap().contains("<circle"));

    std::fs::remove_dir_all(&dir).ok();
}
