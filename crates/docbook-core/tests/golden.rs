use std::fs;
use std::path::{Path, PathBuf};

use docbook_core::{ConvertOptions, convert_document, source_from_json};

#[test]
fn golden_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let fixtures_dir = root.join("tests/fixtures");
    let expect_dir = root.join("tests/expect");

    let mut fixtures = collect_fixtures(&fixtures_dir)?;
    fixtures.sort_by(|a, b| file_name(a).cmp(file_name(b)));
    assert!(!fixtures.is_empty(), "no fixtures found");

    for fixture in fixtures {
        let name = file_stem(&fixture)?;
        let source = fs::read_to_string(&fixture)?;
        let document = source_from_json(&source)?;
        let result = convert_document(&document, &ConvertOptions::default())?;

        let xml_path = expect_dir.join(format!("{}.xml", name));
        let expected = fs::read_to_string(&xml_path)?;
        assert_eq!(
            result.xml.trim_end(),
            expected.trim_end(),
            "XML mismatch for fixture {}",
            name
        );

        let actual_diagnostics = serde_json::to_value(&result.diagnostics)?;
        let diag_path = expect_dir.join(format!("{}.diag.json", name));
        if diag_path.exists() {
            let expected: serde_json::Value = serde_json::from_str(&fs::read_to_string(&diag_path)?)?;
            assert_eq!(
                actual_diagnostics, expected,
                "Diagnostics mismatch for fixture {}",
                name
            );
        } else if !result.diagnostics.is_empty() {
            panic!(
                "Unexpected diagnostics for fixture {}: {}",
                name,
                serde_json::to_string_pretty(&actual_diagnostics)?
            );
        }

        let parsed = roxmltree::Document::parse_with_options(
            &result.xml,
            roxmltree::ParsingOptions {
                allow_dtd: true,
                ..roxmltree::ParsingOptions::default()
            },
        );
        assert!(parsed.is_ok(), "fixture {} is not well-formed: {:?}", name, parsed.err());
    }

    Ok(())
}

fn collect_fixtures(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut fixtures = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            fixtures.push(path);
        }
    }
    Ok(fixtures)
}

fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

fn file_stem(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|value| value.to_string())
        .ok_or_else(|| "fixture name is not valid UTF-8".into())
}
