use anyhow::Result;
use serde_json::Value;

use crate::CliTest;

fn project_with_inputs() -> Result<CliTest> {
    let test = CliTest::project()?;
    test.write_file(
        "data/emails/inbox.csv",
        "id,subject,body\n1,Notice,Your account is locked. Act now\n2,Lunch,See you at noon\n",
    )?;
    test.write_file(
        "data/emails/archive.mbox",
        "From a@example.com Mon Jan  1 00:00:00 2024\nSubject: Act now\n\nNothing else here\n",
    )?;
    test.write_file("data/images/scan.png", "")?;
    test.write_file(
        "data/urls/phishtank.csv",
        "phish_id,url\n1,http://act-now.example.com/locked\n",
    )?;
    Ok(test)
}

#[test]
fn test_run_writes_combined_report() -> Result<()> {
    let test = project_with_inputs()?;

    let output = test.command().arg("run").output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;
    assert!(output.status.success(), "stderr: {}", stderr);

    assert!(stdout.starts_with("Analyzed 4 documents (0 errors)"));
    assert!(stdout.contains("Report written to"));
    assert!(stderr.contains("warning: image analyzer did not run"));
    assert!(stderr.contains("cuescan-missing-ocr not found"));

    let run_dir = test.run_dir()?;
    for file in [
        "combined_summary.csv",
        "combined_summary.json",
        "email_results.csv",
        "image_results.csv",
        "url_results.csv",
    ] {
        assert!(run_dir.join(file).exists(), "missing {}", file);
    }

    let summary: Value =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join("combined_summary.json"))?)?;
    assert_eq!(summary["lexicon_version"], "test-1");
    assert_eq!(summary["total_documents"], 4);
    assert_eq!(summary["total_errors"], 0);
    assert_eq!(summary["totals_by_category"]["urgency"], 3);
    assert_eq!(summary["totals_by_category"]["fear"], 2);
    assert_eq!(summary["category_by_source"]["urgency"]["email"], 2);
    assert_eq!(summary["category_by_source"]["urgency"]["image"], 0);
    assert_eq!(summary["category_by_source"]["urgency"]["url"], 1);
    assert_eq!(summary["module_errors"][0]["source"], "image");

    let csv = std::fs::read_to_string(run_dir.join("combined_summary.csv"))?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[..3],
        [
            "category,email,image,url,total",
            "urgency,2,0,1,3",
            "fear,1,0,1,2",
        ]
    );

    let urls = std::fs::read_to_string(run_dir.join("url_results.csv"))?;
    assert!(urls.contains("example.com:/locked"));
    assert!(!urls.contains("act-now.example.com"));

    Ok(())
}

#[test]
fn test_run_skip_leaves_source_out() -> Result<()> {
    let test = project_with_inputs()?;

    let output = test
        .command()
        .args(["run", "--skip", "image", "--skip", "url"])
        .output()?;
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(!stderr.contains("image analyzer"));

    let run_dir = test.run_dir()?;
    assert!(run_dir.join("email_results.csv").exists());
    assert!(!run_dir.join("image_results.csv").exists());
    assert!(!run_dir.join("url_results.csv").exists());

    Ok(())
}

#[test]
fn test_run_with_invalid_lexicon_exits_2() -> Result<()> {
    let test = project_with_inputs()?;
    test.write_file("lexicon.json", r#"{"categories": {"Urgency!": ["act now"]}}"#)?;

    let output = test.command().arg("run").output()?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.starts_with("Error: Failed to load lexicon"));
    assert!(stderr.contains("unknown category key 'Urgency!'"));
    assert!(!test.root().join("outputs").exists());

    Ok(())
}

#[test]
fn test_run_with_invalid_config_exits_2() -> Result<()> {
    let test = project_with_inputs()?;
    test.write_file(".cuescanrc.json", r#"{ "ignores": ["[invalid"] }"#)?;

    let output = test.command().arg("run").output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stderr)?.contains("Invalid glob pattern in 'ignores'"));

    Ok(())
}

#[test]
fn test_run_write_failure_exits_1_and_prints_summary() -> Result<()> {
    let test = project_with_inputs()?;
    test.write_file("blocked", "not a directory")?;

    let output = test
        .command()
        .args(["run", "--skip", "image", "--output-root", "blocked"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("Analyzed 4 documents (0 errors)"));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Failed to write report: cannot create output root"));

    Ok(())
}
