use anyhow::Result;
use serde_json::Value;

use crate::CliTest;

#[test]
fn test_lexicon_lists_builtin_categories() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().arg("lexicon").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("✓ Lexicon builtin-1:"));
    for category in ["authority", "urgency", "scarcity", "social_proof", "fear"] {
        assert!(stdout.contains(&format!("  {}", category)), "missing {}", category);
    }

    Ok(())
}

#[test]
fn test_lexicon_json_uses_config_lexicon() -> Result<()> {
    let test = CliTest::project()?;

    let output = test.command().args(["lexicon", "--json"]).output()?;
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["version"], "test-1");
    assert_eq!(json["categories"]["urgency"][0], "act now");

    Ok(())
}

#[test]
fn test_lexicon_rejects_empty_category() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("bad.json", r#"{"categories": {"urgency": []}}"#)?;

    let output = test
        .command()
        .args(["lexicon", "--lexicon", "bad.json"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stderr)?.contains("category 'urgency' defines no patterns"));

    Ok(())
}
