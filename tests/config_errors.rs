// tests/config_errors.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, ProjectPartConfigBuilder};

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use pchdeps::config::load_and_validate;
use pchdeps::errors::PchError;
use pchdeps::model::{IncludeSearchPathType, LanguageVersion};
use pchdeps::paths::FilePathCache;
use pchdeps::types::StorageMode;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str) -> String {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(PchError::ConfigError(msg)) => msg,
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_is_parsed() {
    let file = config_file(
        r#"
[manager]
pch_dir = "out/pch"
storage = "memory"
system_workers = 2
extra_toolchain_arguments = ["--target=x86_64-linux-gnu"]

[tools]
scanner = "pchdeps-scan"
scanner_args = ["--json"]
compiler = "clang++"

[[project_part]]
id = "app"
toolchain_arguments = ["-m64"]
macros = [{ name = "NDEBUG", value = "1" }, { name = "APP" }]
system_include_paths = [{ path = "/usr/include" }, { path = "/opt/fw", kind = "framework" }]
project_include_paths = [{ path = "include" }]
headers = ["include/app.h"]
sources = ["src/main.cpp"]
language_version = "cxx20"
language_extension = { gnu = true }
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.manager.pch_dir, PathBuf::from("out/pch"));
    assert_eq!(cfg.manager.state_dir, PathBuf::from(".pchdeps"));
    assert_eq!(cfg.manager.storage, StorageMode::Memory);
    assert_eq!(cfg.manager.system_workers, 2);
    assert_eq!(cfg.manager.project_workers, 0);
    assert!(cfg.manager.watch);
    assert_eq!(cfg.tools.scanner_args, vec!["--json".to_string()]);

    let paths = FilePathCache::new();
    let part = cfg.project_parts[0].to_project_part(&paths, Path::new("/work"));
    assert_eq!(part.id.as_str(), "app");
    assert_eq!(part.compiler_macros.len(), 2);
    assert_eq!(part.compiler_macros[1].value, "");
    assert_eq!(part.compiler_macros[1].order, 2);
    assert_eq!(part.system_include_search_paths[0].kind, IncludeSearchPathType::System);
    assert_eq!(part.system_include_search_paths[1].kind, IncludeSearchPathType::Framework);
    assert_eq!(part.system_include_search_paths[1].index, 2);
    assert_eq!(part.project_include_search_paths[0].kind, IncludeSearchPathType::User);
    assert_eq!(part.language_version, LanguageVersion::Cxx20);
    assert!(part.language_extension.gnu);
    assert_eq!(
        paths.file_path(part.source_file_ids[0]).unwrap(),
        PathBuf::from("/work/src/main.cpp")
    );
    assert_eq!(
        paths.file_path(part.header_file_ids[0]).unwrap(),
        PathBuf::from("/work/include/app.h")
    );
}

#[test]
fn missing_scanner_is_rejected() {
    let msg = expect_config_error(
        r#"
[tools]
compiler = "clang++"

[[project_part]]
id = "app"
sources = ["main.cpp"]
"#,
    );
    assert!(msg.contains("scanner"));
}

#[test]
fn missing_compiler_is_rejected() {
    let msg = expect_config_error(
        r#"
[tools]
scanner = "pchdeps-scan"

[[project_part]]
id = "app"
sources = ["main.cpp"]
"#,
    );
    assert!(msg.contains("compiler"));
}

#[test]
fn config_without_parts_is_rejected() {
    let msg = expect_config_error(
        r#"
[tools]
scanner = "pchdeps-scan"
compiler = "clang++"
"#,
    );
    assert!(msg.contains("project_part"));
}

#[test]
fn duplicate_part_ids_are_rejected() {
    let msg = expect_config_error(
        r#"
[tools]
scanner = "pchdeps-scan"
compiler = "clang++"

[[project_part]]
id = "app"
sources = ["a.cpp"]

[[project_part]]
id = "app"
sources = ["b.cpp"]
"#,
    );
    assert!(msg.contains("duplicate"));
    assert!(msg.contains("app"));
}

#[test]
fn part_without_sources_is_rejected() {
    let msg = expect_config_error(
        r#"
[tools]
scanner = "pchdeps-scan"
compiler = "clang++"

[[project_part]]
id = "lib"
"#,
    );
    assert!(msg.contains("lib"));
    assert!(msg.contains("source"));
}

#[test]
fn unnamed_macro_is_rejected() {
    let msg = expect_config_error(
        r#"
[tools]
scanner = "pchdeps-scan"
compiler = "clang++"

[[project_part]]
id = "app"
sources = ["a.cpp"]
macros = [{ name = "OK" }, { name = " " }]
"#,
    );
    assert!(msg.contains("entry 2"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = config_file("[tools\nscanner = ");
    match load_and_validate(file.path()) {
        Err(PchError::TomlError(_)) => {}
        other => panic!("Expected TomlError, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn unknown_storage_mode_is_a_toml_error() {
    let file = config_file(
        r#"
[manager]
storage = "cloud"
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PchError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Pchdeps.toml"),
        Err(PchError::IoError(_))
    ));
}

#[test]
fn builder_produces_a_valid_config() {
    let cfg = ConfigFileBuilder::new()
        .with_storage(StorageMode::Memory)
        .with_extra_toolchain_argument("-fPIC")
        .with_part(
            ProjectPartConfigBuilder::new("app")
                .define("NDEBUG", "1")
                .source("main.cpp")
                .build(),
        )
        .build();

    assert_eq!(cfg.project_parts.len(), 1);
    assert_eq!(cfg.manager.extra_toolchain_arguments, vec!["-fPIC".to_string()]);
}
