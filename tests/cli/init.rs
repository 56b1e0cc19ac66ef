use anyhow::{Context, Result};
use insta::assert_snapshot;
use serde_json::Value;

use crate::CliTest;

#[test]
fn test_init_creates_config() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("init").output()?;
    assert!(output.status.success());
    assert_snapshot!(String::from_utf8(output.stdout)?, @"✓ Created .cuescanrc.json");

    let content = test.read_file(".cuescanrc.json")?;
    let parsed: Value = serde_json::from_str(&content).context("Config should be valid JSON")?;
    for field in ["emailsRoot", "imagesRoot", "urlsFile", "outputRoot", "signals", "ocr", "urls"] {
        assert!(parsed.get(field).is_some(), "Config should have '{}' field", field);
    }
    assert_eq!(parsed["ocr"]["command"], "tesseract");
    assert_eq!(parsed["urls"]["seed"], 2025);

    Ok(())
}

#[test]
fn test_init_fails_if_exists() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(".cuescanrc.json", "{}")?;

    let output = test.command().arg("init").output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)?.contains(".cuescanrc.json already exists"));
    assert_eq!(test.read_file(".cuescanrc.json")?, "{}");

    Ok(())
}

#[test]
fn test_init_config_is_immediately_usable() -> Result<()> {
    let test = CliTest::new()?;
    test.command().arg("init").output()?;
    test.write_file("data/emails/inbox.csv", "subject,body\nHello,Act now\n")?;

    let output = test.command().arg("email").output()?;
    assert!(
        output.status.success(),
        "email command should work with initialized config. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(test.run_dir()?.join("email_results.csv").exists());

    Ok(())
}
