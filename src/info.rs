use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::launch::LAUNCH_RESOURCE;
use crate::resource::ResourceArchive;

pub const INFO_RESOURCE: &str = "programinfo.json";
pub const LICENSE_RESOURCE: &str = "LICENSE";
pub const NOTICE_RESOURCE: &str = "NOTICE";

/// What the program says about itself. Every field is optional; a missing
/// file just leaves it empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub license_summary: Option<String>,
    pub license: Option<String>,
    pub notice: Option<String>,
}

#[derive(Deserialize)]
struct NameFile {
    program_name: Option<String>,
}

#[derive(Deserialize)]
struct InfoFile {
    description: Option<String>,
    license_summary: Option<String>,
}

impl ProgramInfo {
    pub fn load(archive: &ResourceArchive) -> Result<Self> {
        let name = match archive.read_on_root(LAUNCH_RESOURCE)? {
            Some(text) => {
                serde_json::from_str::<NameFile>(&text)
                    .with_context(|| format!("invalid {LAUNCH_RESOURCE}"))?
                    .program_name
            }
            None => None,
        };

        let (description, license_summary) = match archive.read_on_root(INFO_RESOURCE)? {
            Some(text) => {
                let info: InfoFile = serde_json::from_str(&text)
                    .with_context(|| format!("invalid {INFO_RESOURCE}"))?;
                (info.description, info.license_summary)
            }
            None => (None, None),
        };

        Ok(Self {
            name,
            description,
            license_summary,
            license: archive.read_on_root(LICENSE_RESOURCE)?,
            notice: archive.read_on_root(NOTICE_RESOURCE)?,
        })
    }
}

impl fmt::Display for ProgramInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("Name", &self.name),
            ("Description", &self.description),
            ("License", &self.license_summary),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                writeln!(f, "{label}: {value}")?;
            }
        }

        for (title, text) in [("LICENSE", &self.license), ("NOTICE", &self.notice)] {
            if let Some(text) = text {
                writeln!(f, "\n── {title} ──\n{}", text.trim_end())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tests::write_zip;
    use std::fs;

    #[test]
    fn reads_everything_from_packed_program() {
        let dir = tempfile::tempdir().unwrap();
        let pyz = dir.path().join("demo.pyz");
        write_zip(
            &pyz,
            &[
                ("launch.json", br#"{"program_name": "Demo"}"#),
                (
                    "programinfo.json",
                    br#"{"description": "A demo", "license_summary": "MIT"}"#,
                ),
                ("LICENSE", b"MIT License\n"),
            ],
        );
        let archive = ResourceArchive::locate(&pyz).unwrap();

        let info = ProgramInfo::load(&archive).unwrap();
        assert_eq!(info.name.as_deref(), Some("Demo"));
        assert_eq!(info.description.as_deref(), Some("A demo"));
        assert_eq!(info.license_summary.as_deref(), Some("MIT"));
        assert_eq!(info.license.as_deref(), Some("MIT License\n"));
        assert_eq!(info.notice, None);
    }

    #[test]
    fn unpacked_program_finds_license_one_level_up() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(dir.path().join("LICENSE"), "Apache-2.0").unwrap();
        fs::write(src.join("NOTICE"), "third-party notices").unwrap();
        let archive = ResourceArchive::locate(&src).unwrap();

        let info = ProgramInfo::load(&archive).unwrap();
        assert_eq!(info.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(info.notice.as_deref(), Some("third-party notices"));
    }

    #[test]
    fn missing_files_leave_fields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("app");
        fs::create_dir(&program).unwrap();
        let archive = ResourceArchive::locate(&program).unwrap();

        let info = ProgramInfo::load(&archive).unwrap();
        assert_eq!(info, ProgramInfo::default());
        assert_eq!(info.to_string(), "");
    }

    #[test]
    fn display_lists_present_fields() {
        let info = ProgramInfo {
            name: Some("Demo".into()),
            license_summary: Some("MIT".into()),
            notice: Some("bundles zlib\n".into()),
            ..ProgramInfo::default()
        };
        let text = info.to_string();
        assert!(text.starts_with("Name: Demo\nLicense: MIT\n"));
        assert!(!text.contains("Description"));
        assert!(text.contains("── NOTICE ──\nbundles zlib"));
    }
}
