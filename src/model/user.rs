use crate::model::role::Role;
use crate::models::UserDto;

/// Account row as stored. Not serializable; responses go through [`UserDto`].
#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

impl User {
    pub fn into_dto(self, role: Role) -> UserDto {
        UserDto {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
        }
    }
}
