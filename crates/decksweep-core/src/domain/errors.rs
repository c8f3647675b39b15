use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SweepResult<T> = Result<T, SweepError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepErrorCategory {
    Configuration,
    MissingResource,
    IoSystem,
    PatchNoMatch,
    Internal,
}

impl SweepErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::MissingResource | Self::IoSystem => 3,
            Self::PatchNoMatch => 4,
            Self::Internal => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::MissingResource => "MissingResourceError",
            Self::IoSystem => "IoSystemError",
            Self::PatchNoMatch => "PatchNoMatchError",
            Self::Internal => "InternalError",
        }
    }

    /// Configuration errors abort the whole run; every other category only
    /// fails the case that raised it.
    pub const fn aborts_run(self) -> bool {
        matches!(self, Self::Configuration | Self::Internal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepError {
    category: SweepErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SweepError {
    pub fn new(
        category: SweepErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SweepErrorCategory::Configuration, placeholder, message)
    }

    pub fn missing_resource(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SweepErrorCategory::MissingResource, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SweepErrorCategory::IoSystem, placeholder, message)
    }

    pub fn patch_no_match(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SweepErrorCategory::PatchNoMatch, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SweepErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> SweepErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }
}

impl Display for SweepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for SweepError {}
