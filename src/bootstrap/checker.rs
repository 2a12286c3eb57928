use anyhow::Result;

use super::package::PackageManager;

/// Split a requirements resource into package names, one per line.
pub fn parse_requirements(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Requirements that do not appear in a raw installed-packages listing.
///
/// A package counts as installed when `"<name> "` occurs anywhere in the
/// listing, which tolerates the version column that follows the name. A name
/// that ends another listed name (`py` against `numpy 1.0`) therefore counts
/// as installed too.
pub fn missing_from(requirements: &[String], listing: &str) -> Vec<String> {
    requirements
        .iter()
        .filter(|name| !listing.contains(&format!("{name} ")))
        .cloned()
        .collect()
}

/// Computes the missing subset against the live package manager.
pub struct DependencyChecker<'a> {
    packages: &'a dyn PackageManager,
}

impl<'a> DependencyChecker<'a> {
    pub fn new(packages: &'a dyn PackageManager) -> Self {
        Self { packages }
    }

    /// Queries the package manager once; results are never cached.
    pub fn missing(&self, requirements: &[String]) -> Result<Vec<String>> {
        if requirements.is_empty() {
            return Ok(Vec::new());
        }

        let listing = self.packages.list_installed()?;
        let missing = missing_from(requirements, &listing);
        tracing::debug!(
            required = requirements.len(),
            missing = missing.len(),
            "dependency check"
        );
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::package::tests::FakePackages;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_only_unlisted_requirements() {
        let missing = missing_from(&names(&["alpha", "beta"]), "alpha 1.0\ngamma 2.0\n");
        assert_eq!(missing, names(&["beta"]));
    }

    #[test]
    fn keeps_requirement_order() {
        let listing = "Package Version\n------- -------\nrequests 2.31.0\n";
        let missing = missing_from(&names(&["zeta", "requests", "alpha", "mid"]), listing);
        assert_eq!(missing, names(&["zeta", "alpha", "mid"]));
    }

    #[test]
    fn name_without_trailing_space_is_not_a_match() {
        // "alpha" is only followed by a newline, never by a space
        let missing = missing_from(&names(&["alpha"]), "alpha\n");
        assert_eq!(missing, names(&["alpha"]));
    }

    #[test]
    fn suffix_of_a_listed_name_counts_as_installed() {
        let missing = missing_from(&names(&["py"]), "numpy 1.26.0\n");
        assert!(missing.is_empty());
    }

    #[test]
    fn parses_any_line_ending_and_drops_blank_lines() {
        let parsed = parse_requirements("PySide6\r\n\r\nrequests\n\n  \nrich");
        assert_eq!(parsed, names(&["PySide6", "requests", "rich"]));
    }

    #[test]
    fn checker_queries_the_package_manager_once() {
        let packages = FakePackages::new("alpha 1.0\n");
        let checker = DependencyChecker::new(&packages);

        let missing = checker.missing(&names(&["alpha", "beta"])).unwrap();
        assert_eq!(missing, names(&["beta"]));
        assert_eq!(packages.list_calls(), 1);
    }

    #[test]
    fn empty_requirements_skip_the_query() {
        let packages = FakePackages::new("");
        let checker = DependencyChecker::new(&packages);

        assert!(checker.missing(&[]).unwrap().is_empty());
        assert_eq!(packages.list_calls(), 0);
    }
}
