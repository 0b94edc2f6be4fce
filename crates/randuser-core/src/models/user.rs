use serde::{Deserialize, Serialize};

use crate::utils::format::format_dob;

/// A generated person as stored in the local cache.
///
/// Display fields (`full_name`, `dob`, `location`) are computed once when the
/// raw API record is normalized; readers never see the nested upstream shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub full_name: String,
    /// `dd.mm.yyyy`, or `-` when the upstream date was missing or unparsable
    pub dob: String,
    pub age: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub nat: Option<String>,
    pub location: Option<String>,
    pub thumbnail: Option<String>,
    pub picture: Option<String>,
}

impl User {
    /// Name for list rows, falling back to the uid when the upstream record
    /// carried no name parts.
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.uid
        } else {
            &self.full_name
        }
    }
}

// API Response wrappers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub results: Vec<UserDto>,
    pub info: Option<ResponseInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub seed: Option<String>,
    pub results: Option<u32>,
    pub page: Option<u32>,
    pub version: Option<String>,
}

/// One raw record from the generator. Every field is optional upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDto {
    pub gender: Option<String>,
    pub name: Option<NameDto>,
    pub location: Option<LocationDto>,
    pub email: Option<String>,
    pub login: Option<LoginDto>,
    pub dob: Option<DobDto>,
    pub phone: Option<String>,
    pub picture: Option<PictureDto>,
    pub nat: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameDto {
    pub title: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationDto {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginDto {
    pub uuid: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DobDto {
    pub date: Option<String>,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PictureDto {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub thumbnail: Option<String>,
}

/// Join the present, non-blank parts with `sep`.
fn join_present<'a>(parts: impl IntoIterator<Item = Option<&'a str>>, sep: &str) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

impl UserDto {
    /// Upstream identifier, if the record carries a usable one.
    pub fn uid(&self) -> Option<&str> {
        self.login
            .as_ref()
            .and_then(|l| l.uuid.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Normalize into the store-resident shape.
    ///
    /// Returns `None` only when the record has no identifier, since a row
    /// without a key cannot be stored. Every other missing field degrades to
    /// an absent or empty value.
    pub fn to_user(&self) -> Option<User> {
        let uid = self.uid()?.to_string();

        let name = self.name.as_ref();
        let full_name = join_present(
            [
                name.and_then(|n| n.first.as_deref()),
                name.and_then(|n| n.last.as_deref()),
            ],
            " ",
        );

        let loc = self.location.as_ref();
        let location = join_present(
            [
                loc.and_then(|l| l.country.as_deref()),
                loc.and_then(|l| l.city.as_deref()),
            ],
            ", ",
        );

        let dob = self.dob.as_ref();

        Some(User {
            uid,
            full_name,
            dob: format_dob(dob.and_then(|d| d.date.as_deref())),
            age: dob.and_then(|d| d.age).map(|a| a.to_string()),
            email: self.email.clone(),
            phone: self.phone.clone(),
            gender: self.gender.clone(),
            nat: self.nat.clone(),
            location: (!location.is_empty()).then_some(location),
            thumbnail: self.picture.as_ref().and_then(|p| p.thumbnail.clone()),
            picture: self.picture.as_ref().and_then(|p| p.large.clone()),
        })
    }
}
