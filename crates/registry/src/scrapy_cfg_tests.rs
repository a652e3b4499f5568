// SPDX-License-Identifier: MIT

use super::*;
use tempfile::tempdir;

#[test]
fn finds_nested_scrapy_cfg() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("quotesbot");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("scrapy.cfg"), "[deploy]\nproject = quotesbot\n").unwrap();

    let found = find_scrapy_cfg(dir.path()).unwrap();
    assert_eq!(found, nested.join("scrapy.cfg"));
}

#[test]
fn missing_scrapy_cfg_fails() {
    let dir = tempdir().unwrap();
    let err = find_scrapy_cfg(dir.path()).unwrap_err();
    assert!(matches!(err, RegistryError::ValueError(ref m) if m == "No project found"));
}

#[test]
fn multiple_scrapy_cfg_fails() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    std::fs::create_dir_all(&a).unwrap();
    std::fs::create_dir_all(&b).unwrap();
    std::fs::write(a.join("scrapy.cfg"), "[deploy]\nproject = a\n").unwrap();
    std::fs::write(b.join("scrapy.cfg"), "[deploy]\nproject = b\n").unwrap();

    let err = find_scrapy_cfg(dir.path()).unwrap_err();
    assert!(matches!(err, RegistryError::ValueError(ref m) if m == "No project found"));
}

#[test]
fn reads_project_key_from_deploy_section() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("scrapy.cfg");
    std::fs::write(&cfg, "[settings]\ndefault = quotesbot.settings\n\n[deploy]\nproject = quotesbot\n").unwrap();
    assert_eq!(read_deploy_project_name(&cfg).unwrap(), "quotesbot");
}

#[test]
fn colon_separator_is_also_accepted() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("scrapy.cfg");
    std::fs::write(&cfg, "[deploy]\nproject: quotesbot\n").unwrap();
    assert_eq!(read_deploy_project_name(&cfg).unwrap(), "quotesbot");
}

#[test]
fn missing_project_key_fails() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("scrapy.cfg");
    std::fs::write(&cfg, "[deploy]\nurl = http://example.com\n").unwrap();
    let err = read_deploy_project_name(&cfg).unwrap_err();
    assert!(matches!(err, RegistryError::ValueError(ref m) if m == "Can't extract project name"));
}

#[test]
fn project_key_outside_deploy_section_is_ignored() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("scrapy.cfg");
    std::fs::write(&cfg, "[other]\nproject = wrong\n\n[deploy]\nproject = right\n").unwrap();
    assert_eq!(read_deploy_project_name(&cfg).unwrap(), "right");
}
