use anyhow::Result;
use serde_json::Value;

use crate::CliTest;

#[test]
fn test_url_command_reports_only_urls() -> Result<()> {
    let test = CliTest::project()?;
    test.write_file(
        "data/urls/phishtank.csv",
        "URL\nhttp://a.example.com/locked\nhttp://b.example.com/x\nact-now.test/y\n",
    )?;

    let output = test
        .command()
        .args(["url", "--first", "--limit", "5"])
        .output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.starts_with("Analyzed 2 documents (0 errors)"));

    let run_dir = test.run_dir()?;
    assert!(run_dir.join("url_results.csv").exists());
    assert!(!run_dir.join("email_results.csv").exists());

    let summary: Value =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join("combined_summary.json"))?)?;
    assert_eq!(summary["totals_by_source"]["email"]["documents"], 0);
    assert_eq!(summary["totals_by_source"]["url"]["documents"], 2);
    assert_eq!(summary["category_by_source"]["fear"]["url"], 1);
    assert_eq!(summary["category_by_source"]["urgency"]["url"], 1);

    let details = std::fs::read_to_string(run_dir.join("url_results.csv"))?;
    let ids: Vec<&str> = details
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap_or_default())
        .collect();
    assert_eq!(ids, ["example.com:/locked", "act-now.test:/y"]);

    Ok(())
}

#[test]
fn test_email_command_with_missing_directory() -> Result<()> {
    let test = CliTest::project()?;

    let output = test.command().arg("email").output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.starts_with("Analyzed 0 documents (0 errors)"));
    assert!(String::from_utf8(output.stderr)?.contains("email analyzer did not run: email directory not found"));

    let summary: Value = serde_json::from_str(&std::fs::read_to_string(
        test.run_dir()?.join("combined_summary.json"),
    )?)?;
    assert_eq!(summary["total_documents"], 0);
    assert_eq!(summary["statistics"]["cue_rate"], 0.0);

    Ok(())
}

#[test]
fn test_email_command_respects_ignores() -> Result<()> {
    let test = CliTest::project()?;
    test.write_file(
        "corpus/inbox.csv",
        "subject,body\nAlert,Your account is locked\n",
    )?;
    test.write_file("corpus/ignored/old.csv", "subject,body\nx,act now\n")?;
    test.write_file(
        ".cuescanrc.json",
        r#"{ "lexicon": "./lexicon.json", "emailsRoot": "./corpus", "ignores": ["ignored"] }"#,
    )?;

    let output = test.command().arg("email").output()?;
    assert!(output.status.success());

    let summary: Value = serde_json::from_str(&std::fs::read_to_string(
        test.run_dir()?.join("combined_summary.json"),
    )?)?;
    assert_eq!(summary["totals_by_category"]["fear"], 1);
    assert_eq!(summary["totals_by_category"]["urgency"], 0);

    Ok(())
}

#[test]
fn test_image_command_without_ocr_engine() -> Result<()> {
    let test = CliTest::project()?;
    test.write_file("data/images/phish.png", "")?;

    let output = test
        .command()
        .args(["image", "--ocr-timeout", "5"])
        .output()?;
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains(
        "image analyzer did not run: cuescan-missing-ocr not found. Please install it first."
    ));

    Ok(())
}
