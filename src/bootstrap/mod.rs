//! Dependency check and installer launch.
//!
//! - `checker`: which declared packages are missing
//! - `package`: the external package manager (pip)
//! - `interpreter`: the Python interpreter and its version
//! - `spawn`: per-platform process creation
//! - `staging`: the temporary directory the installer runs from
//! - `network`: reachability probe and terminal extension download
//! - `launcher`: ties the above into `ensure_installed`

pub mod checker;
pub mod interpreter;
pub mod launcher;
pub mod network;
pub mod package;
pub mod spawn;
pub mod staging;

pub use checker::parse_requirements;
pub use interpreter::{Interpreter, InterpreterInfo};
pub use launcher::{DependencyInstaller, InstallerLauncher, LaunchOptions};
pub use package::{InstallProcess, PackageManager, Pip};
pub use spawn::SpawnPolicy;
pub use staging::{INSTALLER_STEM, InstallerSource};
