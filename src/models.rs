use std::convert::TryFrom;

use sqlx::FromRow;
use uuid::Uuid;

use crate::identities::domain::users::NewUser;

#[derive(Clone, Debug)]
pub struct NewUserModel {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl TryFrom<&NewUser> for NewUserModel {
    type Error = anyhow::Error;

    fn try_from(user: &NewUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: user.id(),
            username: user.username().as_str().to_owned(),
            password_hash: user.password_hash()?.value().to_owned(),
        })
    }
}

/// A user along with the state of their email address.
#[derive(Clone, Debug, FromRow)]
pub struct UserModel {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub email_verified: bool,
}
