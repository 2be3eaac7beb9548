//! Account commands.
//!
//! The signed-in identity is kept in the local store so later runs start
//! from it. Signing in switches the cart and favorites to the account's
//! remote documents; signing out switches back to this device's local copy.
//! The account's profile lives in the remote `users` collection.

use std::io::Write;

use figurine_storefront::{Address, Identity, ProfileUpdate, UserProfile};

use super::{CliError, Context};

/// Address parts to change. `None` keeps the saved value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressChanges {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl AddressChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(self, address: &mut Address) {
        let parts = [
            (self.street, &mut address.street),
            (self.city, &mut address.city),
            (self.state, &mut address.state),
            (self.zip_code, &mut address.zip_code),
            (self.country, &mut address.country),
        ];
        for (change, field) in parts {
            if let Some(value) = change {
                *field = value.trim().to_string();
            }
        }
    }
}

/// Create an account and sign in.
pub async fn sign_up(ctx: &Context, out: &mut impl Write, identity: Identity) -> Result<(), CliError> {
    ctx.session.sign_up(identity.clone()).await;
    ctx.save_identity(Some(&identity))?;
    writeln!(out, "Welcome, {}! Your account is ready.", identity.greeting_name())?;
    Ok(())
}

pub fn sign_in(ctx: &Context, out: &mut impl Write, identity: Identity) -> Result<(), CliError> {
    ctx.session.sign_in(identity.clone());
    ctx.save_identity(Some(&identity))?;
    writeln!(out, "Signed in as {}.", identity.greeting_name())?;
    Ok(())
}

pub fn sign_out(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    if ctx.session.identity().is_none() {
        writeln!(out, "Not signed in.")?;
        return Ok(());
    }
    ctx.session.sign_out();
    ctx.save_identity(None)?;
    writeln!(out, "Signed out.")?;
    Ok(())
}

pub fn whoami(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    match ctx.session.identity() {
        Some(identity) => {
            write!(out, "{} (key {}", identity.greeting_name(), identity.key)?;
            if let Some(email) = &identity.email {
                write!(out, ", {email}")?;
            }
            writeln!(out, ")")?;
        }
        None => writeln!(out, "Browsing as a guest.")?,
    }
    writeln!(
        out,
        "Cart: {} item(s). Favorites: {}.",
        ctx.session.cart().total_items(),
        ctx.session.favorites().len()
    )?;
    Ok(())
}

/// Print the signed-in user's profile.
pub async fn show_profile(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    let Some(identity) = ctx.session.identity() else {
        writeln!(out, "Browsing as a guest. Sign in to see your profile.")?;
        return Ok(());
    };
    match ctx.session.current_profile().await? {
        Some(profile) => print_profile(out, &identity, &profile)?,
        None => writeln!(out, "No profile saved for {}.", identity.key)?,
    }
    Ok(())
}

/// Change profile fields and address parts, then print the result.
pub async fn update_profile(
    ctx: &Context,
    out: &mut impl Write,
    mut update: ProfileUpdate,
    address: AddressChanges,
) -> Result<(), CliError> {
    if !address.is_empty() {
        let mut current = ctx
            .session
            .current_profile()
            .await?
            .map(|profile| profile.address)
            .unwrap_or_default();
        address.apply(&mut current);
        update.address = Some(current);
    }
    if update.is_empty() {
        writeln!(out, "Nothing to update.")?;
        return Ok(());
    }

    let profile = ctx.session.update_profile(update).await?;
    // The saved identity carries the new name and email.
    ctx.save_identity(ctx.session.identity().as_ref())?;
    writeln!(out, "Profile updated.")?;
    if let Some(identity) = ctx.session.identity() {
        print_profile(out, &identity, &profile)?;
    }
    Ok(())
}

fn print_profile(out: &mut impl Write, identity: &Identity, profile: &UserProfile) -> std::io::Result<()> {
    let blank = |value: &str| if value.trim().is_empty() { "-".to_string() } else { value.to_string() };

    writeln!(out, "Account  {}", identity.key)?;
    writeln!(out, "Name     {}", blank(&profile.display_name))?;
    writeln!(
        out,
        "Email    {}",
        profile.email.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
    )?;
    writeln!(out, "Phone    {}", blank(&profile.phone))?;
    writeln!(out, "Address  {}", blank(&profile.address.one_line()))?;
    if let Some(date) = profile.date_of_birth {
        writeln!(out, "Born     {date}")?;
    }
    if let Some(gender) = &profile.gender {
        writeln!(out, "Gender   {gender}")?;
    }
    if let Some(bio) = &profile.bio {
        writeln!(out, "Bio      {bio}")?;
    }
    if let Some(created) = profile.created_at {
        writeln!(out, "Member since {}", created.format("%Y-%m-%d"))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use figurine_core::ProductId;
    use figurine_storefront::StorefrontConfig;

    use super::*;
    use crate::commands::identity_from_args;

    async fn eventually(check: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_sign_up_then_guest_cart_is_separate() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorefrontConfig {
            data_dir: dir.path().to_path_buf(),
            ..StorefrontConfig::default()
        };

        // Guest run: one item in the local cart.
        let ctx = Context::open(&config).unwrap();
        ctx.session.cart().add_item(ctx.product(ProductId::new(1)).unwrap());
        ctx.close().await;

        // Sign up: the account starts from its own empty documents.
        let ctx = Context::open(&config).unwrap();
        let identity = identity_from_args("mika", Some("mika@figuro.ph"), None).unwrap();
        sign_up(&ctx, &mut Vec::new(), identity).await.unwrap();
        eventually(|| ctx.session.cart().is_empty()).await;
        ctx.session.cart().add_item(ctx.product(ProductId::new(5)).unwrap());
        ctx.close().await;

        // Next run restores the account and its cart.
        let ctx = Context::open(&config).unwrap();
        let mut out = Vec::new();
        whoami(&ctx, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("mika (key mika, mika@figuro.ph)"));
        assert!(ctx.session.cart().is_in_cart(ProductId::new(5)));

        // Signing out brings the guest cart back.
        sign_out(&ctx, &mut Vec::new()).unwrap();
        eventually(|| ctx.session.cart().is_in_cart(ProductId::new(1))).await;
        ctx.close().await;

        let ctx = Context::open(&config).unwrap();
        assert!(ctx.session.identity().is_none());
        ctx.close().await;
    }

    #[tokio::test]
    async fn test_profile_show_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorefrontConfig {
            data_dir: dir.path().to_path_buf(),
            ..StorefrontConfig::default()
        };

        let ctx = Context::open(&config).unwrap();
        let mut out = Vec::new();
        show_profile(&ctx, &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Browsing as a guest"));

        let identity = identity_from_args("nezuko", Some("nezuko@figuro.ph"), None).unwrap();
        sign_up(&ctx, &mut Vec::new(), identity).await.unwrap();

        let mut out = Vec::new();
        update_profile(
            &ctx,
            &mut out,
            ProfileUpdate {
                display_name: Some("Nezuko".to_string()),
                ..ProfileUpdate::default()
            },
            AddressChanges {
                city: Some("Cebu City".to_string()),
                country: Some("Philippines".to_string()),
                ..AddressChanges::default()
            },
        )
        .await
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Name     Nezuko"));
        assert!(out.contains("Address  Cebu City, Philippines"));
        ctx.close().await;

        // A later run keeps the address and the renamed identity.
        let ctx = Context::open(&config).unwrap();
        assert_eq!(ctx.session.identity().unwrap().greeting_name(), "Nezuko");
        update_profile(
            &ctx,
            &mut Vec::new(),
            ProfileUpdate::default(),
            AddressChanges {
                zip_code: Some("6000".to_string()),
                ..AddressChanges::default()
            },
        )
        .await
        .unwrap();
        let mut out = Vec::new();
        show_profile(&ctx, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Address  Cebu City, 6000, Philippines"));
        assert!(out.contains("Email    nezuko@figuro.ph"));
        ctx.close().await;
    }

    #[tokio::test]
    async fn test_empty_update_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorefrontConfig {
            data_dir: dir.path().to_path_buf(),
            ..StorefrontConfig::default()
        };
        let ctx = Context::open(&config).unwrap();
        let mut out = Vec::new();
        update_profile(&ctx, &mut out, ProfileUpdate::default(), AddressChanges::default())
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Nothing to update.\n");
        ctx.close().await;
    }
}
