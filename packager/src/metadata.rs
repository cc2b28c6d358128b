//! Project metadata resolution.
//!
//! The project name, product name and version live in the `variables` block
//! of `electron.gyp` as `'project_name%'`, `'product_name%'` and
//! `'version%'`. When the gyp file carries no version, the `version` field of
//! `package.json` is used instead.

use crate::error::{DistError, Result};
use camino::Utf8Path;
use log::debug;
use serde::Deserialize;

/// Gyp file holding the project variables, relative to the source root.
pub const GYP_FILE: &str = "electron.gyp";

/// npm manifest consulted for the version fallback.
pub const PACKAGE_JSON: &str = "package.json";

const DEFAULT_PROJECT_NAME: &str = "electron";
const DEFAULT_PRODUCT_NAME: &str = "Electron";

/// Names and version identifying the packaged runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    project_name: String,
    product_name: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    version: Option<String>,
}

impl ProjectMetadata {
    /// Construct metadata from explicit values.
    #[must_use]
    pub fn new(
        project_name: impl Into<String>,
        product_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            product_name: product_name.into(),
            version: version.into(),
        }
    }

    /// Load metadata from `electron.gyp` (and `package.json`) under `source_root`.
    ///
    /// `version_override` replaces whatever version the project files carry;
    /// when it is supplied, a missing version in the files is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::Metadata`] if no version can be determined or
    /// `package.json` is malformed, and [`DistError::Io`] if an existing file
    /// cannot be read.
    pub fn load(source_root: &Utf8Path, version_override: Option<&str>) -> Result<Self> {
        let gyp_path = source_root.join(GYP_FILE);
        let gyp = read_optional(&gyp_path)?.unwrap_or_default();

        let project_name = gyp_variable(&gyp, "project_name%")
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_owned());
        let product_name = gyp_variable(&gyp, "product_name%")
            .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_owned());

        let version = match version_override {
            Some(version) => version.to_owned(),
            None => match gyp_variable(&gyp, "version%") {
                Some(version) => version,
                None => package_version(&source_root.join(PACKAGE_JSON))?,
            },
        };
        validate_version(&gyp_path, &version)?;

        debug!("resolved metadata: project={project_name} product={product_name} version={version}");
        Ok(Self {
            project_name,
            product_name,
            version,
        })
    }

    /// The project (executable) name, e.g. `electron`.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// The product (bundle) name, e.g. `Electron`.
    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// The version string used for the staging directory and archive name.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

fn read_optional(path: &Utf8Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DistError::Io(e)),
    }
}

/// Reject versions that cannot name a single directory under the dist root.
fn validate_version(origin: &Utf8Path, version: &str) -> Result<()> {
    let invalid = version.trim().is_empty()
        || version == "."
        || version == ".."
        || version.contains(['/', '\\']);
    if invalid {
        return Err(DistError::Metadata {
            path: origin.to_owned(),
            reason: format!("version \"{version}\" is not a valid directory name"),
        });
    }
    Ok(())
}

fn package_version(path: &Utf8Path) -> Result<String> {
    let missing = || DistError::Metadata {
        path: path.to_owned(),
        reason: format!("no version% in {GYP_FILE} and no version field here"),
    };
    let Some(contents) = read_optional(path)? else {
        return Err(missing());
    };
    let manifest: PackageManifest =
        serde_json::from_str(&contents).map_err(|e| DistError::Metadata {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
    manifest
        .version
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(missing)
}

/// Extract a string variable from gyp source text.
///
/// Gyp files are Python literals; this looks for the quoted key followed by a
/// colon and a quoted string value, accepting either quote style.
///
/// # Examples
///
/// ```
/// use electron_dist::metadata::gyp_variable;
///
/// let gyp = "{ 'variables': { 'project_name%': 'electron', 'version%': '1.2.3' } }";
/// assert_eq!(gyp_variable(gyp, "version%").as_deref(), Some("1.2.3"));
/// assert_eq!(gyp_variable(gyp, "company_name%"), None);
/// ```
#[must_use]
pub fn gyp_variable(source: &str, name: &str) -> Option<String> {
    ['\'', '"'].into_iter().find_map(|quote| {
        let key = format!("{quote}{name}{quote}");
        source.match_indices(&key).find_map(|(start, _)| {
            let rest = source.get(start + key.len()..)?.trim_start();
            let rest = rest.strip_prefix(':')?.trim_start();
            let value_quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
            let body = rest.get(1..)?;
            let end = body.find(value_quote)?;
            body.get(..end).map(str::to_owned)
        })
    })
}
