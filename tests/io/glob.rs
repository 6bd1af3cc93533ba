use anyhow::Result;
use std::fs;
use xshards::io::glob::{expand_glob, resolve_fragments};
use xshards::XShardsError;

#[test]
fn nested_directories_are_walked_in_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    fs::create_dir_all(root.join("year=2024").join("month=02"))?;
    fs::create_dir_all(root.join("year=2023"))?;
    fs::write(root.join("year=2024").join("month=02").join("b.csv"), "a\n1\n")?;
    fs::write(root.join("year=2023").join("a.csv"), "a\n1\n")?;
    fs::write(root.join("year=2023").join("_SUCCESS"), "")?;

    let files = resolve_fragments(root)?;
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("year=2023/a.csv"));
    assert!(files[1].ends_with("year=2024/month=02/b.csv"));
    Ok(())
}

#[test]
fn glob_patterns_select_files() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    for name in ["x-1.json", "x-2.json", "y-1.json", ".x-3.json"] {
        fs::write(tmp.path().join(name), "{}\n")?;
    }
    let pattern = tmp.path().join("x-*.json");
    let files = expand_glob(&pattern.to_string_lossy())?;
    assert_eq!(files.len(), 2);
    assert_eq!(resolve_fragments(&pattern)?, files);
    Ok(())
}

#[test]
fn single_file_is_its_own_fragment() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("only.parquet");
    fs::write(&path, b"PAR1")?;
    assert_eq!(resolve_fragments(&path)?, vec![path]);
    Ok(())
}

#[test]
fn error_kinds() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let missing = resolve_fragments(tmp.path().join("nope")).unwrap_err();
    assert!(matches!(
        missing.downcast_ref::<XShardsError>(),
        Some(XShardsError::PathNotFound(_))
    ));
    let empty = resolve_fragments(tmp.path()).unwrap_err();
    assert!(matches!(
        empty.downcast_ref::<XShardsError>(),
        Some(XShardsError::NoDataFiles(_))
    ));
    Ok(())
}
