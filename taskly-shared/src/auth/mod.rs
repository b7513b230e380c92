/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer token resolution into an [`middleware::AuthContext`]
/// - [`authorization`]: The team/task capability table
///
/// # Example
///
/// ```
/// use taskly_shared::auth::password::{hash_password, verify_password, HashParams};
/// use taskly_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password_1", &HashParams::default())?;
/// assert!(verify_password("user_password_1", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-key")?;
/// let claims = validate_token(&token, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
