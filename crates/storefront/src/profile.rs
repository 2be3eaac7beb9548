//! Account profiles stored in the `users` remote collection.
//!
//! A profile is one document per identity key. Its fields sit at the top
//! level of the document next to `updatedAt`:
//!
//! ```json
//! {
//!   "items": [],
//!   "email": "mika@example.com",
//!   "displayName": "Mika",
//!   "phone": "",
//!   "address": { "street": "", "city": "", "state": "", "zipCode": "", "country": "" },
//!   "createdAt": "2025-01-01T00:00:00Z",
//!   "updatedAt": "2025-01-01T00:00:00Z"
//! }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use figurine_core::Email;

use crate::error::StoreError;
use crate::identity::Identity;
use crate::store::Document;

/// Failure reading or updating a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid profile document: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mailing address. Blank fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Whether every field is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [&self.street, &self.city, &self.state, &self.zip_code, &self.country]
            .into_iter()
            .all(|field| field.trim().is_empty())
    }

    /// Non-blank parts joined with commas.
    #[must_use]
    pub fn one_line(&self) -> String {
        [&self.street, &self.city, &self.state, &self.zip_code, &self.country]
            .into_iter()
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A user's account profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Taken from the document's `updatedAt`.
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// The profile written when `identity` signs up.
    #[must_use]
    pub fn new_account(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            email: identity.email.clone(),
            display_name: identity.display_name.clone().unwrap_or_default(),
            created_at: Some(now),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Decode a profile from a `users` document.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Invalid` if a field has the wrong shape.
    pub fn from_document(document: &Document) -> Result<Self, ProfileError> {
        let mut profile: Self =
            serde_json::from_value(serde_json::Value::Object(document.fields.clone()))?;
        profile.updated_at = document.updated_at;
        Ok(profile)
    }

    /// Encode the profile as a `users` document.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Invalid` if the profile fails to serialize.
    pub fn to_document(&self) -> Result<Document, ProfileError> {
        let fields = serde_json::from_value(serde_json::to_value(self)?)?;
        Ok(Document {
            items: Vec::new(),
            updated_at: self.updated_at,
            fields,
        })
    }

    /// Copy the name and email onto `identity`, keeping its key.
    #[must_use]
    pub fn apply_to_identity(&self, mut identity: Identity) -> Identity {
        identity.email.clone_from(&self.email);
        identity.display_name =
            Some(self.display_name.clone()).filter(|name| !name.trim().is_empty());
        identity
    }
}

/// Changes to a profile. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the update and stamp `updated_at`.
    pub fn apply(self, profile: &mut UserProfile, now: DateTime<Utc>) {
        if let Some(name) = self.display_name {
            profile.display_name = name.trim().to_string();
        }
        if let Some(email) = self.email {
            profile.email = Some(email);
        }
        if let Some(phone) = self.phone {
            profile.phone = phone.trim().to_string();
        }
        if let Some(address) = self.address {
            profile.address = address;
        }
        if let Some(date) = self.date_of_birth {
            profile.date_of_birth = Some(date);
        }
        if let Some(gender) = self.gender {
            profile.gender = Some(gender);
        }
        if let Some(bio) = self.bio {
            profile.bio = Some(bio);
        }
        profile.updated_at = Some(now);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use figurine_core::IdentityKey;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
    }

    fn mika() -> Identity {
        Identity::new(IdentityKey::parse("mika").unwrap())
            .with_email(Email::parse("mika@example.com").unwrap())
            .with_display_name("Mika")
    }

    #[test]
    fn test_new_account_document_shape() {
        let doc = UserProfile::new_account(&mika(), at(1)).to_document().unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["email"], "mika@example.com");
        assert_eq!(value["displayName"], "Mika");
        assert_eq!(value["phone"], "");
        assert_eq!(value["address"]["zipCode"], "");
        assert_eq!(value["createdAt"], value["updatedAt"]);
        assert!(value.get("bio").is_none());
    }

    #[test]
    fn test_document_round_trip_keeps_updated_at() {
        let mut profile = UserProfile::new_account(&mika(), at(1));
        profile.phone = "+63 912 345 6789".to_string();
        let doc = profile.to_document().unwrap();
        assert_eq!(UserProfile::from_document(&doc).unwrap(), profile);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let doc: Document = serde_json::from_str(r#"{"displayName": "Tanjiro"}"#).unwrap();
        let profile = UserProfile::from_document(&doc).unwrap();
        assert_eq!(profile.display_name, "Tanjiro");
        assert!(profile.address.is_blank());
        assert_eq!(profile.updated_at, None);
    }

    #[test]
    fn test_bad_field_is_invalid() {
        let doc: Document = serde_json::from_str(r#"{"dateOfBirth": "yesterday"}"#).unwrap();
        assert!(matches!(
            UserProfile::from_document(&doc),
            Err(ProfileError::Invalid(_))
        ));
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut profile = UserProfile::new_account(&mika(), at(1));
        let update = ProfileUpdate {
            phone: Some("  0917 000 0000 ".to_string()),
            address: Some(Address {
                city: "Quezon City".to_string(),
                country: "Philippines".to_string(),
                ..Address::default()
            }),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut profile, at(2));

        assert_eq!(profile.display_name, "Mika");
        assert_eq!(profile.phone, "0917 000 0000");
        assert_eq!(profile.address.one_line(), "Quezon City, Philippines");
        assert_eq!(profile.created_at, Some(at(1)));
        assert_eq!(profile.updated_at, Some(at(2)));
    }

    #[test]
    fn test_apply_to_identity_keeps_key() {
        let profile = UserProfile {
            display_name: "  ".to_string(),
            email: Some(Email::parse("new@example.com").unwrap()),
            ..UserProfile::default()
        };
        let identity = profile.apply_to_identity(mika());
        assert_eq!(identity.key.as_str(), "mika");
        assert_eq!(identity.display_name, None);
        assert_eq!(identity.email.unwrap().as_str(), "new@example.com");
    }
}
