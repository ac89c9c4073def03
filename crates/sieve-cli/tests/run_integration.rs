//! Runs the CLI entry point against config files on disk.

use anyhow::Result;
use clap::Parser;
use sieve_cli::cli::Cli;
use sieve_cli::config::CliConfig;
use std::path::PathBuf;
use tempfile::TempDir;

const CONFIG: &str = r#"
[limits]
max_term_count = 4

[[fields]]
name = "name"
kind = "text"

[[fields]]
name = "email"
kind = "text"

[[fields]]
name = "age"
kind = "number"

[[fields]]
name = "meta"
kind = "structured"
"#;

fn write_config(contents: &str) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sieve.toml");
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}

fn run(path: &std::path::Path, args: &[&str]) -> Result<String> {
    let mut argv = vec!["sieve", "--config", path.to_str().unwrap()];
    argv.extend_from_slice(args);
    sieve_cli::run(&Cli::try_parse_from(argv)?)
}

#[test]
fn test_postgres_text_output() -> Result<()> {
    let (_dir, path) = write_config(CONFIG)?;
    let out = run(&path, &["name:john"])?;
    assert_eq!(out, "\"name\" = $1\n  [1] \"john\"");
    Ok(())
}

#[test]
fn test_dynamodb_json_output() -> Result<()> {
    let (_dir, path) = write_config(CONFIG)?;
    let out = run(&path, &["-p", "dynamodb", "-f", "json", "name:*john*"])?;
    let value: serde_json::Value = serde_json::from_str(&out)?;
    assert_eq!(
        value,
        serde_json::json!({
            "provider": "dynamodb",
            "filter": {
                "statement": "contains(name, 'john')",
                "attribute_values": [{"S": "john"}]
            }
        })
    );
    Ok(())
}

#[test]
fn test_limits_from_file_and_flags() -> Result<()> {
    let (_dir, path) = write_config(CONFIG)?;
    let query = "name:a name:b name:c name:d name:e";

    let err = run(&path, &[query]).unwrap_err();
    assert!(err.to_string().contains("term count 5"), "{err}");

    let out = run(&path, &["--max-term-count", "10", "-p", "sqlite", query])?;
    assert!(out.starts_with("(((("));
    Ok(())
}

#[test]
fn test_invalid_field_surfaces_valid_names() -> Result<()> {
    let (_dir, path) = write_config(CONFIG)?;
    let err = run(&path, &["nmae:john"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid field 'nmae' (unknown field); valid fields are: name, email, age, meta.*"
    );
    Ok(())
}

#[test]
fn test_tree_output() -> Result<()> {
    let (_dir, path) = write_config(CONFIG)?;
    let out = run(&path, &["--tree", "age:>=21"])?;
    assert_eq!(out, r#"{"op":"greater_eq","column":"age","value":21.0}"#);
    Ok(())
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    let err = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_malformed_config_names_file() -> Result<()> {
    let (_dir, path) = write_config("[[fields]]\nname = 3\n")?;
    let err = CliConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_show_config_applies_flag_overrides() -> Result<()> {
    let (_dir, path) = write_config(CONFIG)?;

    let out = run(&path, &["--show-config", "--max-term-count", "9"])?;
    let shown = CliConfig::from_toml(&out)?;
    assert_eq!(shown.limits.max_term_count, 9);
    assert_eq!(shown.fields.len(), 4);

    let out = run(&path, &["--show-config", "-f", "json"])?;
    let value: serde_json::Value = serde_json::from_str(&out)?;
    assert_eq!(value["limits"]["max_term_count"], 4);
    assert_eq!(value["fields"][0]["name"], "name");
    Ok(())
}
