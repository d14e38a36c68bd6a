use std::fmt;

/// Failure to resolve an include into an evaluated environment.
#[derive(Debug, Clone)]
pub enum LoadError {
    /// The script could not be read at all.
    Read { path: String, detail: String },
    /// The script was read but did not parse.
    Parse { path: String, errors: Vec<String> },
    /// The script parsed but its top-level evaluation produced an error;
    /// the remote stack rides along.
    Eval {
        path: String,
        message: String,
        stack: Vec<String>,
    },
    /// No loader was injected before evaluation started.
    NotConfigured,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Read { path, detail } => {
                write!(f, "unable to load included script {} due to {}", path, detail)
            }
            LoadError::Parse { path, errors } => {
                write!(
                    f,
                    "unable to evaluate included script {} due to:\n {}",
                    path,
                    errors.join(";\n")
                )
            }
            LoadError::Eval { message, stack, .. } => {
                write!(f, "ERROR: {}\nStackTrace:\n{}", message, stack.join(";\n"))
            }
            LoadError::NotConfigured => f.write_str("script loader is not defined"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Failure raised by the plugin registry or by a plugin itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    UnknownPackage(String),
    UnknownFunction { package: String, function: String },
    Failure(String),
}

impl ExtensionError {
    pub fn unknown_package(package: impl Into<String>) -> Self {
        Self::UnknownPackage(package.into())
    }

    pub fn unknown_function(package: impl Into<String>, function: impl Into<String>) -> Self {
        Self::UnknownFunction {
            package: package.into(),
            function: function.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionError::UnknownPackage(package) => {
                write!(f, "package {} not found in extensions", package)
            }
            ExtensionError::UnknownFunction { package, function } => {
                write!(f, "function {} not found in {} extension", function, package)
            }
            ExtensionError::Failure(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ExtensionError {}
