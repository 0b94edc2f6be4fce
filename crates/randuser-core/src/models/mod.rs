//! Data models for generated users.
//!
//! - `User`: the canonical, store-resident record
//! - `UserDto` and friends: the raw randomuser.me response shape
//! - `UserFilter`, `Gender`: fetch filters

pub mod filter;
pub mod user;

pub use filter::{Gender, UserFilter, NATIONALITIES};
pub use user::{ApiResponse, DobDto, LocationDto, LoginDto, NameDto, PictureDto, User, UserDto};
