//! Accounts and password authentication.
//!
//! Token issuance lives outside this crate; callers turn the [`User`]
//! returned by [`authenticate`] into whatever session they use.

use rusqlite::Connection;
use sharepool_crypto::password;
use sharepool_db::queries::users as store;
use sharepool_types::{Money, Role, Timestamp, User, UserId};

use crate::{required, Caller, MarketError, Result};

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(MarketError::ValidationFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// A validated sign-up whose password is already hashed.
///
/// Argon2id is the slow part of registering, so this is built without
/// touching the database and handed to [`create_account`] afterwards.
pub struct NewAccount {
    name: String,
    email: String,
    password_hash: String,
}

impl NewAccount {
    /// Validate the sign-up fields and hash the password.
    ///
    /// # Errors
    ///
    /// - [`MarketError::ValidationFailed`] for a blank name, malformed email or short password
    pub fn prepare(name: &str, email: &str, password: &str) -> Result<Self> {
        let name = required("name", name)?;
        let email = required("email", email)?;
        if !email.contains('@') {
            return Err(MarketError::ValidationFailed(format!(
                "'{email}' is not an email address"
            )));
        }
        validate_password(password)?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password::hash_password(password)?,
        })
    }
}

/// Store a prepared account with zero balance.
///
/// # Errors
///
/// - [`MarketError::Conflict`] if the email is already registered
pub fn create_account(
    conn: &Connection,
    account: &NewAccount,
    role: Role,
    now: Timestamp,
) -> Result<User> {
    let id = store::insert(conn, &account.name, &account.email, &account.password_hash, role, now)
        .map_err(MarketError::conflict_on_unique("user with this email already exists"))?;
    tracing::info!(user_id = id, %role, "user registered");
    Ok(store::get(conn, id)?)
}

/// Create an account with zero balance.
///
/// # Errors
///
/// - [`MarketError::ValidationFailed`] for a blank name, malformed email or short password
/// - [`MarketError::Conflict`] if the email is already registered
pub fn register_user(
    conn: &Connection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    now: Timestamp,
) -> Result<User> {
    create_account(conn, &NewAccount::prepare(name, email, password)?, role, now)
}

fn invalid_login() -> MarketError {
    MarketError::Forbidden("invalid email or password".into())
}

/// An account found by email whose password has not been checked yet.
pub struct LoginCandidate {
    user: User,
    password_hash: String,
}

impl LoginCandidate {
    /// Check `password` against the stored hash.
    ///
    /// # Errors
    ///
    /// - [`MarketError::Forbidden`] if the password is wrong
    pub fn verify(self, password: &str) -> Result<User> {
        if !password::verify_password(password, &self.password_hash)? {
            return Err(invalid_login());
        }
        Ok(self.user)
    }
}

/// Look up the account a login attempt names.
///
/// # Errors
///
/// - [`MarketError::Forbidden`] if the email is unknown, with the same
///   message a wrong password gets
pub fn find_login(conn: &Connection, email: &str) -> Result<LoginCandidate> {
    let user = store::find_by_email(conn, email.trim())?.ok_or_else(invalid_login)?;
    let password_hash = store::password_hash(conn, user.id)?;
    Ok(LoginCandidate {
        user,
        password_hash,
    })
}

/// Check an email/password pair.
///
/// # Errors
///
/// - [`MarketError::Forbidden`] if the email is unknown or the password wrong
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User> {
    find_login(conn, email)?.verify(password)
}

pub fn get_user(conn: &Connection, user_id: UserId) -> Result<User> {
    Ok(store::get(conn, user_id)?)
}

pub fn balance(conn: &Connection, user_id: UserId) -> Result<Money> {
    Ok(store::balance(conn, user_id)?)
}

/// Change the caller's display name.
pub fn update_profile(conn: &Connection, user_id: UserId, name: &str, now: Timestamp) -> Result<User> {
    let name = required("name", name)?;
    store::set_name(conn, user_id, name, now)?;
    Ok(store::get(conn, user_id)?)
}

/// Stored password hash, for [`rehash_password`].
pub fn password_hash(conn: &Connection, user_id: UserId) -> Result<String> {
    Ok(store::password_hash(conn, user_id)?)
}

/// Check `current` against `stored_hash` and hash `new`. Touches no
/// database, so it can run away from the connection lock.
///
/// # Errors
///
/// - [`MarketError::Forbidden`] if `current` is wrong
/// - [`MarketError::ValidationFailed`] if `new` is too short
pub fn rehash_password(stored_hash: &str, current: &str, new: &str) -> Result<String> {
    if !password::verify_password(current, stored_hash)? {
        return Err(MarketError::Forbidden("current password is incorrect".into()));
    }
    validate_password(new)?;
    Ok(password::hash_password(new)?)
}

/// Store a hash produced by [`rehash_password`].
pub fn set_password_hash(
    conn: &Connection,
    user_id: UserId,
    new_hash: &str,
    now: Timestamp,
) -> Result<()> {
    store::set_password_hash(conn, user_id, new_hash, now)?;
    tracing::info!(user_id, "password changed");
    Ok(())
}

/// Replace the caller's password after checking the current one.
///
/// # Errors
///
/// - [`MarketError::Forbidden`] if `current` is wrong
/// - [`MarketError::ValidationFailed`] if `new` is too short
pub fn change_password(
    conn: &Connection,
    user_id: UserId,
    current: &str,
    new: &str,
    now: Timestamp,
) -> Result<()> {
    let new_hash = rehash_password(&password_hash(conn, user_id)?, current, new)?;
    set_password_hash(conn, user_id, &new_hash, now)
}

/// All accounts, newest first (admin only).
pub fn list_users(conn: &Connection, caller: &Caller, limit: u32) -> Result<Vec<User>> {
    caller.require_admin()?;
    Ok(store::list(conn, limit)?)
}

/// Grant or revoke admin (admin only). An admin cannot demote themselves.
pub fn set_role(
    conn: &Connection,
    caller: &Caller,
    user_id: UserId,
    role: Role,
    now: Timestamp,
) -> Result<User> {
    caller.require_admin()?;
    if user_id == caller.user_id && role != Role::Admin {
        return Err(MarketError::InvalidState("admins cannot demote themselves".into()));
    }
    store::set_role(conn, user_id, role, now)?;
    tracing::info!(user_id, %role, admin_id = caller.user_id, "role changed");
    Ok(store::get(conn, user_id)?)
}
