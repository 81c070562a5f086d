use crate::debugger::error::Error;
use crate::debugger::{Session, TargetBuilder};
use crate::emulator::process::{Emulator, Template};
use log::{error, info};
use std::path::{Path, PathBuf};

/// Program to debug: emulator runs `<name>.<image extension>` from the project location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub location: PathBuf,
}

impl Project {
    /// Create project from its directory, project name is the directory name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Option<Self> {
        let location = dir.as_ref().canonicalize().ok()?;
        if !location.is_dir() {
            return None;
        }
        let name = location.file_name()?.to_string_lossy().into_owned();
        Some(Self { name, location })
    }

    /// Return file name of the program image.
    pub fn image(&self, extension: &str) -> String {
        format!("{}.{extension}", self.name)
    }
}

/// Source of the currently active project.
pub trait ProjectResolver {
    fn active_project(&self) -> Option<Project>;
}

impl ProjectResolver for Option<Project> {
    fn active_project(&self) -> Option<Project> {
        self.clone()
    }
}

/// Blocking, user-dismissable notification.
pub trait Notifier {
    fn alert(&self, title: &str, message: &str);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Emulator executable, either a path or a name searched in `PATH`.
    pub emulator: Option<String>,
    pub image_extension: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            emulator: None,
            image_extension: "hex".to_string(),
        }
    }
}

impl LaunchConfig {
    /// Prepare emulator process for a project.
    pub fn emulator_for(&self, project: &Project) -> Result<Emulator<Template>, Error> {
        let emulator = self
            .emulator
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(Error::EmulatorPathUnset)?;
        let program =
            which::which(emulator).map_err(|e| Error::EmulatorNotFound(emulator.to_string(), e))?;

        Ok(Emulator::new(
            program,
            [project.image(&self.image_extension)],
            Some(project.location.clone()),
        ))
    }
}

/// Start debug session for the active project.
///
/// Missing project or emulator are reported through `notifier` before the error is returned,
/// any other failure is only logged.
pub fn launch(
    resolver: &dyn ProjectResolver,
    notifier: &dyn Notifier,
    config: &LaunchConfig,
    builder: TargetBuilder,
) -> Result<Session, Error> {
    let result = resolver
        .active_project()
        .ok_or(Error::NoProject)
        .and_then(|project| {
            info!(target: "emudbg", "launch project {} at {}", project.name, project.location.display());
            config.emulator_for(&project)
        })
        .and_then(|emulator| builder.connect(emulator));

    if let Err(e) = &result {
        match e {
            Error::NoProject | Error::EmulatorPathUnset | Error::EmulatorNotFound(..) => {
                notifier.alert("Error", &e.to_string());
            }
            _ => error!(target: "emudbg", "launch failed: {e:#}"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Alerts(RefCell<Vec<String>>);

    impl Notifier for Alerts {
        fn alert(&self, _: &str, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }
    }

    fn project() -> Project {
        Project {
            name: "demo".to_string(),
            location: std::env::temp_dir(),
        }
    }

    #[test]
    fn test_no_project_alert() {
        let alerts = Alerts::default();
        let result = launch(
            &None::<Project>,
            &alerts,
            &LaunchConfig::default(),
            TargetBuilder::new(),
        );
        assert!(matches!(result, Err(Error::NoProject)));
        assert_eq!(
            *alerts.0.borrow(),
            vec!["No project is currently selected".to_string()]
        );
    }

    #[test]
    fn test_emulator_unset_alert() {
        let alerts = Alerts::default();
        let config = LaunchConfig {
            emulator: Some("  ".to_string()),
            ..LaunchConfig::default()
        };
        let result = launch(&Some(project()), &alerts, &config, TargetBuilder::new());
        assert!(matches!(result, Err(Error::EmulatorPathUnset)));
        assert_eq!(alerts.0.borrow().len(), 1);
    }

    #[test]
    fn test_emulator_not_found() {
        let config = LaunchConfig {
            emulator: Some("emudbg-no-such-emulator".to_string()),
            ..LaunchConfig::default()
        };
        let err = config.emulator_for(&project()).err().expect("must fail");
        assert!(matches!(
            err,
            Error::EmulatorNotFound(ref name, _) if name == "emudbg-no-such-emulator"
        ));
        assert!(err.is_fatal());
    }

    #[test]
    #[cfg(unix)]
    fn test_emulator_command() {
        let config = LaunchConfig {
            emulator: Some("cat".to_string()),
            image_extension: "bin".to_string(),
        };
        let emulator = config.emulator_for(&project()).unwrap();
        assert!(emulator.program().is_absolute());
        assert_eq!(emulator.args(), &["demo.bin".to_string()]);
        assert_eq!(emulator.cwd(), Some(std::env::temp_dir().as_path()));
    }

    #[test]
    fn test_project_from_dir() {
        let dir = std::env::temp_dir().join(format!("emudbg-project-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let project = Project::from_dir(&dir).unwrap();
        assert!(project.name.starts_with("emudbg-project-"));
        assert_eq!(project.image("hex"), format!("{}.hex", project.name));
        assert!(Project::from_dir(dir.join("missing")).is_none());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
