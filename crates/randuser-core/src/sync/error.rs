use thiserror::Error;

/// What went wrong in the list flow, as shown to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    #[error("No internet connection")]
    NoInternet,

    #[error("Couldn't fetch new users")]
    FetchFailed,

    #[error("Couldn't load saved users")]
    LoadFailed,

    #[error("Couldn't delete user")]
    DeleteFailed,
}

/// What went wrong resolving a single user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailError {
    #[error("No user id provided")]
    IdNotProvided,

    #[error("Couldn't load user")]
    LoadFailed,
}
