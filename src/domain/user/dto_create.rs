#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub email: String,
    /// Already hashed; repositories never see plaintext passwords.
    pub password_hash: String,
}
