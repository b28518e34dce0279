use thiserror::Error;

use super::{FormKey, WindowKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("no window registered for identity '{0}'")]
    UnknownWindow(WindowKey),
    #[error("no form registered for identity '{0}'")]
    UnknownForm(FormKey),
    #[error("form '{form}' requires parent window '{expected}' but was attached to '{actual}'")]
    ParentMismatch {
        form: FormKey,
        expected: WindowKey,
        actual: WindowKey,
    },
    #[error("duplicate window registration: {0}")]
    DuplicateWindowRegistration(WindowKey),
    #[error("duplicate form registration: {0}")]
    DuplicateFormRegistration(FormKey),
    #[error("an application runtime is already alive on this thread")]
    AlreadyInitialized,
}
