use std::fs;

use docmodel::{xml_export, xml_parse, xml_parse_document};

#[test]
fn test_valid_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let valid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/valid");
    for entry in fs::read_dir(valid_dir)? {
        let path = entry?.path();
        let content = fs::read_to_string(&path)?;
        if let Err(err) = xml_parse(&content) {
            return Err(
                std::io::Error::other(format!("Failed to parse valid file {path:?}: {err}")).into(),
            );
        }
    }
    Ok(())
}

#[test]
fn test_invalid_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let invalid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/invalid");
    for entry in fs::read_dir(invalid_dir)? {
        let path = entry?.path();
        let content = fs::read_to_string(&path)?;
        match xml_parse(&content) {
            Ok(_) => {
                return Err(std::io::Error::other(format!(
                    "Should fail to parse invalid file: {path:?}"
                ))
                .into());
            }
            Err(err) if !err.kind().is_malformed() => {
                return Err(std::io::Error::other(format!(
                    "Unexpected error kind for {path:?}: {err}"
                ))
                .into());
            }
            Err(_) => {}
        }
    }
    Ok(())
}

#[test]
fn test_valid_fixtures_reexport_stably() -> Result<(), Box<dyn std::error::Error>> {
    let valid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/valid");
    for entry in fs::read_dir(valid_dir)? {
        let path = entry?.path();
        let doc = xml_parse_document(&fs::read_to_string(&path)?)?;
        let exported = xml_export(&doc.root, &doc.root_tag, true, None);
        let reparsed = xml_parse_document(&exported)?;
        if reparsed != doc {
            return Err(std::io::Error::other(format!("Re-export changed {path:?}")).into());
        }
    }
    Ok(())
}
