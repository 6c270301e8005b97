mod operation_errors;
mod remote;

pub use operation_errors::*;
pub use remote::*;

/// Finds an error of type `E` in a chain of sources.
pub trait AsError {
    fn as_error<E: std::error::Error + 'static>(&self) -> Option<&E>;
}

impl AsError for dyn std::error::Error + 'static {
    fn as_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = cause {
            if let Some(err) = err.downcast_ref::<E>() {
                return Some(err);
            }
            cause = err.source();
        }
        None
    }
}

impl AsError for reqwest::Error {
    fn as_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        (self as &(dyn std::error::Error + 'static)).as_error::<E>()
    }
}
