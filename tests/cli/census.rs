use std::fs;

use anyhow::Result;
use serde_json::Value;

use crate::CliTest;

#[test]
fn test_census_writes_its_own_directory() -> Result<()> {
    let test = CliTest::project()?;
    test.write_file(
        "data/emails/phishing-2016.csv",
        "subject,body,from,date\n\
         Account locked,Your account is locked. Act now,ops@bank.example,2019-03-04\n\
         RE: account locked,Your account is LOCKED -- act now!,ops@bank.example,\n\
         Prize,You won a prize,promo@lucky.example,1999\n\
         ,,,\n",
    )?;
    test.write_file(
        "data/emails/archive.mbox",
        "From a@example.com Mon Jan  1 00:00:00 2024\n\
         Subject: =?utf-8?B?VXJnZW50IGFjdGlvbiByZXF1aXJlZA==?=\n\
         From: Support <support@example.com>\n\
         Date: Mon, 1 Jan 2024 00:00:00 +0000\n\
         \n\
         Act now\n",
    )?;

    let output = test.command().arg("census").output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;
    assert!(output.status.success(), "stderr: {}", stderr);
    assert!(stdout.starts_with("Scanned 2 files (5 rows, 4 email-like)"));
    assert!(stdout.contains("unique emails 3  estimated duplicates 1 (25.00%)"));
    assert!(stdout.contains("Census written to"));

    // Analysis runs and census runs never share a directory.
    let census_root = test.root().join("outputs/census");
    let dirs: Vec<_> = fs::read_dir(&census_root)?.collect::<std::io::Result<_>>()?;
    assert_eq!(dirs.len(), 1);
    let out = dirs[0].path();

    let overall: Value = serde_json::from_str(&fs::read_to_string(out.join("overall.json"))?)?;
    assert_eq!(overall["files_scanned"], 2);
    assert_eq!(overall["rows_total"], 5);
    assert_eq!(overall["email_like_rows"], 4);
    assert_eq!(overall["unique_emails"], 3);
    assert_eq!(overall["per_year_raw"]["2016"], 2);
    assert_eq!(overall["per_year_raw"]["2019"], 1);
    assert_eq!(overall["per_year_raw"]["2024"], 1);
    assert_eq!(overall["year_audit"]["date_out_of_range"], 1);

    let duplicates = fs::read_to_string(out.join("duplicates_top.csv"))?;
    let lines: Vec<&str> = duplicates.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("2,bank.example,account locked,"));

    let unique = fs::read_to_string(out.join("unique_examples.csv"))?;
    assert!(unique.contains("urgent action required"));
    assert!(!unique.contains("support@example.com"));

    Ok(())
}

#[test]
fn test_census_without_corpus_exits_2() -> Result<()> {
    let test = CliTest::project()?;

    let output = test.command().arg("census").output()?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.starts_with("Error: Failed to read the email corpus"));
    assert!(!test.root().join("outputs").exists());

    Ok(())
}
