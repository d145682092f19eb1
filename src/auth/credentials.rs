use crate::{
    error::CredentialError,
    models::{AdminRecord, LoginRequest, Namespace, Principal, Role, UserRecord, VerifiedIdentity},
    repository::CredentialStore,
};

/// verify_credentials
///
/// The Credential Verifier. Checks a submitted `(login_id, secret)` pair against the one
/// principal stored under `login_id` in the selected namespace.
///
/// 1. Empty or absent values fail with `MissingCredential` before any lookup.
/// 2. Exactly one table is consulted: `users` for `Namespace::User`, `site_admins` for
///    `Namespace::Admin`.
/// 3. No row yields `UnknownPrincipal`; a differing secret yields `SecretMismatch`.
/// 4. A storage failure is returned as `Dependency`, distinct from the above.
///
/// There is no lockout or backoff; every attempt is independent.
pub async fn verify_credentials<S>(
    store: &S,
    namespace: Namespace,
    credential: &LoginRequest,
) -> Result<VerifiedIdentity, CredentialError>
where
    S: CredentialStore + ?Sized,
{
    let login_id = credential
        .login_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(CredentialError::MissingCredential)?;
    let secret = credential
        .secret
        .as_deref()
        .filter(|secret| !secret.trim().is_empty())
        .ok_or(CredentialError::MissingCredential)?;

    let principal = match namespace {
        Namespace::User => store.find_user(login_id).await?.map(Principal::User),
        Namespace::Admin => store.find_admin(login_id).await?.map(Principal::Admin),
    }
    .ok_or(CredentialError::UnknownPrincipal)?;

    // Plaintext equality, as the legacy schema stores secrets unhashed.
    if principal.stored_secret() != secret {
        return Err(CredentialError::SecretMismatch);
    }

    match principal {
        Principal::User(user) => user_identity(user),
        Principal::Admin(admin) => Ok(admin_identity(admin)),
    }
}

/// user_identity
///
/// Derives the role of a `users` row from its profile links. Shared by login and signup.
pub fn user_identity(user: UserRecord) -> Result<VerifiedIdentity, CredentialError> {
    let role = if user.student_id.is_some() {
        Role::Student
    } else if user.provider_id.is_some() {
        Role::Provider
    } else {
        // Neither a student nor a store owner: an administrative row that
        // must come in through the admin namespace.
        return Err(CredentialError::NamespaceMismatch);
    };

    Ok(VerifiedIdentity {
        subject_id: user.user_id,
        login_id: user.login_id,
        display_name: user.display_name,
        role,
        namespace: Namespace::User,
    })
}

fn admin_identity(admin: AdminRecord) -> VerifiedIdentity {
    VerifiedIdentity {
        subject_id: admin.admin_id,
        login_id: admin.login_id,
        display_name: admin.display_name,
        role: Role::Admin,
        namespace: Namespace::Admin,
    }
}
