//! The splash window shown while packages are checked and installed.
//!
//! The window itself belongs to the program's GUI toolkit; this module only
//! decides whether that toolkit can be used yet and keeps the window's
//! lifetime scoped.

pub mod pyside;

use anyhow::Result;

use crate::error::LaunchError;
use crate::resource::ResourceArchive;

pub use pyside::PySideToolkit;

/// Icon candidates, in order of preference.
const ICON_RESOURCES: [(&str, &str); 2] = [("logo.png", "png"), ("logo.jpg", "jpg")];

pub trait Splash {
    fn show(&mut self) -> Result<()>;
    fn hide(&mut self);
}

pub trait SplashFactory {
    fn open(&self, text: &str, icon: Option<&Icon>) -> Result<Box<dyn Splash>>;
}

/// Result of the once-per-run toolkit check.
pub enum Toolkit {
    Available(Box<dyn SplashFactory>),
    Unavailable,
}

impl Toolkit {
    pub fn is_available(&self) -> bool {
        matches!(self, Toolkit::Available(_))
    }
}

pub trait ToolkitProbe {
    fn probe(&self) -> Toolkit;

    /// Load the toolkit after installation; an error if it is still missing.
    fn load(&self) -> Result<Box<dyn SplashFactory>>;
}

/// Image bytes for the splash window icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// `logo.png`, else `logo.jpg`, else nothing.
pub fn find_icon(archive: &ResourceArchive) -> Result<Option<Icon>, LaunchError> {
    for (name, extension) in ICON_RESOURCES {
        if let Some(bytes) = archive.read_optional(name)? {
            return Ok(Some(Icon { bytes, extension }));
        }
    }
    Ok(None)
}

/// A shown splash that is hidden when dropped.
pub struct SplashGuard {
    splash: Option<Box<dyn Splash>>,
}

impl SplashGuard {
    pub fn show(mut splash: Box<dyn Splash>) -> Result<Self> {
        splash.show()?;
        Ok(Self {
            splash: Some(splash),
        })
    }

    pub fn hide(&mut self) {
        if let Some(mut splash) = self.splash.take() {
            splash.hide();
        }
    }
}

impl Drop for SplashGuard {
    fn drop(&mut self) {
        self.hide();
    }
}
