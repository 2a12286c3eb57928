//! Access to the program's bundled resources.
//!
//! A program is either a plain directory tree or a single packed zip file
//! (a `.pyz`). Every other component reads resources through
//! [`ResourceArchive`] so it never has to care which one it got.

use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::LaunchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceArchive {
    Directory(PathBuf),
    Packed(PathBuf),
}

impl ResourceArchive {
    /// Resolve the program location: explicit path first, then a
    /// `<exe-stem>.pyz` next to the launcher, then the launcher's directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, LaunchError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => default_program_path()?,
        };
        Self::locate(path)
    }

    pub fn locate(path: impl Into<PathBuf>) -> Result<Self, LaunchError> {
        let path = path.into();
        if path.is_file() {
            Ok(Self::Packed(path))
        } else if path.is_dir() {
            Ok(Self::Directory(path))
        } else {
            Err(LaunchError::NoProgram(path))
        }
    }

    pub fn is_packed(&self) -> bool {
        matches!(self, Self::Packed(_))
    }

    /// The directory or zip file the resources come from.
    pub fn root(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::Packed(path) => path,
        }
    }

    pub fn open(&self, name: &str) -> Result<Box<dyn Read>, LaunchError> {
        match self {
            Self::Directory(root) => {
                let path = root.join(name);
                match File::open(&path) {
                    Ok(file) if path.is_file() => Ok(Box::new(BufReader::new(file))),
                    Ok(_) => Err(LaunchError::NotFound(name.to_string())),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        Err(LaunchError::NotFound(name.to_string()))
                    }
                    Err(err) => Err(LaunchError::io(path, err)),
                }
            }
            Self::Packed(_) => Ok(Box::new(Cursor::new(self.read(name)?))),
        }
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, LaunchError> {
        match self {
            Self::Directory(_) => {
                let mut reader = self.open(name)?;
                let mut bytes = Vec::new();
                reader
                    .read_to_end(&mut bytes)
                    .map_err(|err| LaunchError::io(self.root().join(name), err))?;
                Ok(bytes)
            }
            Self::Packed(path) => {
                let mut archive = open_zip(path)?;
                let mut entry = archive.by_name(name).map_err(|err| zip_error(path, name, err))?;
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut bytes)
                    .map_err(|err| LaunchError::io(path, err))?;
                Ok(bytes)
            }
        }
    }

    pub fn read_to_string(&self, name: &str) -> Result<String, LaunchError> {
        let bytes = self.read(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Like [`read`](Self::read), but an absent resource is `None` instead of an error.
    pub fn read_optional(&self, name: &str) -> Result<Option<Vec<u8>>, LaunchError> {
        match self.read(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn contains(&self, name: &str) -> Result<bool, LaunchError> {
        match self {
            Self::Directory(root) => Ok(root.join(name).is_file()),
            Self::Packed(path) => {
                let archive = open_zip(path)?;
                Ok(archive.index_for_name(name).is_some())
            }
        }
    }

    /// `name` itself when present, else the first resource nested under some
    /// directory with that file name (`tools/installer.py` for `installer.py`).
    pub fn find(&self, name: &str) -> Result<Option<String>, LaunchError> {
        if self.contains(name)? {
            return Ok(Some(name.to_string()));
        }
        let suffix = format!("/{name}");
        Ok(self
            .names()?
            .into_iter()
            .find(|candidate| candidate.ends_with(&suffix)))
    }

    /// Resource names relative to the root, `/`-separated, files only.
    pub fn names(&self) -> Result<Vec<String>, LaunchError> {
        match self {
            Self::Directory(root) => {
                let mut names: Vec<String> = WalkBuilder::new(root)
                    .standard_filters(false)
                    .build()
                    .flatten()
                    .filter(|entry| entry.file_type().is_some_and(|kind| kind.is_file()))
                    .filter_map(|entry| {
                        let relative = entry.path().strip_prefix(root).ok()?;
                        let parts: Vec<_> = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect();
                        Some(parts.join("/"))
                    })
                    .collect();
                names.sort();
                Ok(names)
            }
            Self::Packed(path) => {
                let archive = open_zip(path)?;
                Ok(archive
                    .file_names()
                    .filter(|name| !name.ends_with('/'))
                    .map(str::to_string)
                    .collect())
            }
        }
    }

    /// Write a resource under `dest_dir`, keeping its relative path.
    pub fn extract(&self, name: &str, dest_dir: &Path) -> Result<PathBuf, LaunchError> {
        match self {
            Self::Directory(root) => {
                let source = root.join(name);
                if !source.is_file() {
                    return Err(LaunchError::NotFound(name.to_string()));
                }
                let target = dest_dir.join(name);
                create_parent(&target)?;
                fs::copy(&source, &target).map_err(|err| LaunchError::io(&source, err))?;
                Ok(target)
            }
            Self::Packed(path) => {
                let mut archive = open_zip(path)?;
                let mut entry = archive.by_name(name).map_err(|err| zip_error(path, name, err))?;
                let relative = entry
                    .enclosed_name()
                    .ok_or_else(|| LaunchError::NotFound(name.to_string()))?
                    .to_path_buf();

                let target = dest_dir.join(relative);
                create_parent(&target)?;
                let mut out = File::create(&target).map_err(|err| LaunchError::io(&target, err))?;
                io::copy(&mut entry, &mut out).map_err(|err| LaunchError::io(&target, err))?;
                Ok(target)
            }
        }
    }

    /// Read a file that may live at the program root or, for unpacked
    /// programs, one level above it (license files next to the source tree).
    pub fn read_on_root(&self, name: &str) -> Result<Option<String>, LaunchError> {
        if let Some(bytes) = self.read_optional(name)? {
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }

        let Self::Directory(root) = self else {
            return Ok(None);
        };
        let Some(parent) = root.parent() else {
            return Ok(None);
        };

        let path = parent.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(LaunchError::io(path, err)),
        }
    }
}

fn default_program_path() -> Result<PathBuf, LaunchError> {
    let exe = std::env::current_exe().map_err(|err| LaunchError::io("current executable", err))?;
    let dir = exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(stem) = exe.file_stem() {
        let packed = dir.join(format!("{}.pyz", stem.to_string_lossy()));
        if packed.is_file() {
            return Ok(packed);
        }
    }

    Ok(dir)
}

fn open_zip(path: &Path) -> Result<ZipArchive<BufReader<File>>, LaunchError> {
    let file = File::open(path).map_err(|err| LaunchError::io(path, err))?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| LaunchError::Archive {
        archive: path.to_path_buf(),
        source,
    })
}

fn zip_error(archive: &Path, name: &str, err: ZipError) -> LaunchError {
    match err {
        ZipError::FileNotFound => LaunchError::NotFound(name.to_string()),
        source => LaunchError::Archive {
            archive: archive.to_path_buf(),
            source,
        },
    }
}

fn create_parent(target: &Path) -> Result<(), LaunchError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|err| LaunchError::io(parent, err))?;
    }
    Ok(())
}
