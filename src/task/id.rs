use std::marker::PhantomData;

/// A task's unique identifier, tagged with the type of value the task
/// produces. The tag exists only at compile time (at runtime this is just
/// a string), but it lets [`TaskReference`] and [`super::TaskContext::get_result`]
/// catch a mismatched result type before it ever reaches a downcast.
pub struct TaskImplementationID<T> {
    id: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TaskImplementationID<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl<T> Clone for TaskImplementationID<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for TaskImplementationID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskImplementationID({})", self.id)
    }
}

impl<T> PartialEq for TaskImplementationID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A typed handle used by a dependent task to retrieve a declared
/// dependency's result from a [`super::TaskContext`].
pub struct TaskReference<T> {
    id: TaskImplementationID<T>,
}

impl<T> TaskReference<T> {
    pub fn new(id: TaskImplementationID<T>) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn untyped(&self) -> UntypedTaskReference {
        UntypedTaskReference {
            id: self.id.as_str().to_string(),
        }
    }
}

impl<T> Clone for TaskReference<T> {
    fn clone(&self) -> Self {
        Self { id: self.id.clone() }
    }
}

/// A type-erased dependency reference, used in a [`super::Task`]'s
/// dependency list where different dependencies may produce different
/// result types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UntypedTaskReference {
    id: String,
}

impl UntypedTaskReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> From<&TaskReference<T>> for UntypedTaskReference {
    fn from(r: &TaskReference<T>) -> Self {
        r.untyped()
    }
}
