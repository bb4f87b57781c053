use std::fmt;

/// One test of a suite.
///
/// The name is unique within its suite and is the id carried through the
/// [`TaskQueue`](crate::TaskQueue).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskDescriptor {
    name: String,
    suite: String,
}

impl TaskDescriptor {
    /// Creates a descriptor for test `name` of suite `suite`.
    pub fn new(name: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suite: suite.into(),
        }
    }

    /// Task id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the owning suite.
    pub fn suite(&self) -> &str {
        &self.suite
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.suite, self.name)
    }
}
