//! File upload through `<input type="file">`.
//!
//! Arguments are validated before anything is sent: at least one file, every
//! file present on disk, and the target an `input`. The first file goes to
//! the target itself; each further file goes to a fresh input cloned into the
//! enclosing form, since one input accepts one path per interaction.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::describe::ElementSnapshot;
use crate::dispatch::Operation;
use crate::driver::{DriverError, ElementHandle, ScriptArg};
use crate::element::Element;
use crate::report::run_step;
use crate::result::{SettleError, SettleResult};
use crate::script;

/// Upload of one or more local files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    files: Vec<PathBuf>,
}

impl Upload {
    /// Upload these paths
    #[must_use]
    pub fn files<P: AsRef<Path>>(files: &[P]) -> Self {
        Self {
            files: files.iter().map(|f| f.as_ref().to_path_buf()).collect(),
        }
    }

    /// Upload files named relative to `root`
    #[must_use]
    pub fn resources(root: &Path, names: &[&str]) -> Self {
        Self {
            files: names.iter().map(|name| root.join(name)).collect(),
        }
    }

    /// Paths as supplied
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    /// Canonical paths, failing on the first problem
    fn validate(&self) -> SettleResult<Vec<PathBuf>> {
        if self.files.is_empty() {
            return Err(SettleError::invalid_argument("No files to upload"));
        }
        self.files
            .iter()
            .map(|file| {
                if file.exists() {
                    Ok(file.canonicalize()?)
                } else {
                    Err(SettleError::FileNotFound { path: file.clone() })
                }
            })
            .collect()
    }
}

impl Operation for Upload {
    type Output = Vec<PathBuf>;

    fn perform(self, element: &Element<'_>) -> SettleResult<Vec<PathBuf>> {
        let description = format!("upload {} file(s)", self.files.len());
        run_step(element.session().reporter(), &element.subject(), &description, || {
            let canonical = self.validate()?;
            let driver = element.driver();
            let input = element.existing()?;
            if !driver.tag_name(&input)?.eq_ignore_ascii_case("input") {
                return Err(SettleError::invalid_argument(format!(
                    "Cannot upload file because {} is not an INPUT",
                    ElementSnapshot::capture(driver, &input)
                )));
            }

            let (first, rest) = canonical
                .split_first()
                .ok_or_else(|| SettleError::invalid_argument("No files to upload"))?;
            driver.send_keys(&input, &first.to_string_lossy())?;
            if !rest.is_empty() {
                let form = element.closest("form").existing()?;
                for file in rest {
                    let clone = clone_input(element, &form, &input)?;
                    debug!(%clone, file = %file.display(), "uploading through cloned input");
                    driver.send_keys(&clone, &file.to_string_lossy())?;
                }
            }
            Ok(canonical)
        })
    }
}

fn clone_input(
    element: &Element<'_>,
    form: &ElementHandle,
    input: &ElementHandle,
) -> SettleResult<ElementHandle> {
    let created = element.driver().execute_script(
        script::CLONE_FILE_INPUT,
        &[ScriptArg::from(form), ScriptArg::from(input)],
    )?;
    ElementHandle::from_json(&created).ok_or_else(|| {
        SettleError::Driver(DriverError::webdriver(format!(
            "cloning the file input returned {created} instead of an element"
        )))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::driver::mock::{MockDriver, MockNode};
    use crate::report::{EventStatus, RecordingReporter};
    use crate::session::Session;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        driver: Arc<MockDriver>,
        reporter: Arc<RecordingReporter>,
        session: Session,
        dir: TempDir,
        form: ElementHandle,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        for name in ["cv.pdf", "photo.png"] {
            fs::write(dir.path().join(name), b"data").unwrap();
        }
        let driver = Arc::new(MockDriver::new());
        let reporter = Arc::new(RecordingReporter::new());
        let form = driver.insert(MockNode::new("form"));
        driver.insert_into(&form, MockNode::new("input").attr("type", "file").attr("name", "doc"));
        driver.insert(MockNode::new("div").attr("id", "drop"));
        let session = Session::new(driver.clone())
            .with_reporter(reporter.clone())
            .with_config(
                Configuration::new()
                    .with_timeout(40)
                    .with_poll_interval(5)
                    .with_resource_root(dir.path()),
            );
        Fixture {
            driver,
            reporter,
            session,
            dir,
            form,
        }
    }

    #[test]
    fn test_single_file_goes_to_the_input() {
        let fx = fixture();
        let uploaded = fx
            .session
            .element("input[type=file]")
            .upload_files(&[fx.dir.path().join("cv.pdf")])
            .unwrap();
        assert_eq!(uploaded, vec![fx.dir.path().join("cv.pdf").canonicalize().unwrap()]);
        assert_eq!(fx.driver.call_count("send_keys"), 1);
        assert_eq!(fx.driver.children(&fx.form).len(), 1);
        assert_eq!(fx.reporter.descriptions(), vec!["upload 1 file(s)"]);
    }

    #[test]
    fn test_resources_resolve_against_root() {
        let fx = fixture();
        let uploaded = fx
            .session
            .element("input[type=file]")
            .upload_resources(&["cv.pdf", "photo.png"])
            .unwrap();
        assert_eq!(uploaded.len(), 2);
        assert_eq!(fx.driver.children(&fx.form).len(), 2);
    }

    #[test]
    fn test_no_files_is_rejected_before_resolving() {
        let fx = fixture();
        let none: [PathBuf; 0] = [];
        let err = fx.session.element("input").upload_files(&none).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: No files to upload");
        assert!(!fx.driver.was_called("find_elements"));
        assert_eq!(fx.reporter.events()[0].status, EventStatus::Failed);
    }

    #[test]
    fn test_missing_file_is_rejected_before_any_upload() {
        let fx = fixture();
        let files = [fx.dir.path().join("cv.pdf"), fx.dir.path().join("missing.txt")];
        let err = fx.session.element("input").upload_files(&files).unwrap_err();
        match err {
            SettleError::FileNotFound { path } => assert!(path.ends_with("missing.txt")),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!fx.driver.was_called("send_keys"));
    }

    #[test]
    fn test_non_input_target_is_rejected() {
        let fx = fixture();
        let err = fx
            .session
            .element("#drop")
            .upload_files(&[fx.dir.path().join("cv.pdf")])
            .unwrap_err();
        assert!(matches!(err, SettleError::InvalidArgument { .. }));
        assert!(err.to_string().contains("<div id=\"drop\"></div> is not an INPUT"));
        assert!(!fx.driver.was_called("send_keys"));
    }
}
