use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    identities::domain::{
        self,
        email::EmailInvalidity,
        users::{NewUser, NewUserInvalidity, UsernameInvalidity},
    },
    passwords::PasswordInvalidity,
};

#[derive(Deserialize)]
pub struct NewUserRequest {
    username: String,
    email: String,
    password: String,
}

impl From<NewUserRequest> for domain::users::NewUserData {
    fn from(rep: NewUserRequest) -> Self {
        Self {
            username: rep.username,
            email: rep.email,
            password: rep.password,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewUserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&NewUser> for NewUserResponse {
    fn from(user: &NewUser) -> Self {
        Self {
            id: user.id(),
            username: user.username().as_str().to_owned(),
            email: user.email().address().to_owned(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NewUserValidationError {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub username: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub password: Vec<String>,
}

impl From<ValidationContext<NewUserInvalidity>> for NewUserValidationError {
    fn from(validation: ValidationContext<NewUserInvalidity>) -> Self {
        let mut response = NewUserValidationError::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                NewUserInvalidity::Username(username_invalidity) => {
                    response.username.push(match username_invalidity {
                        UsernameInvalidity::MinLength(min) => {
                            format!("Usernames must contain at least {} characters.", min)
                        }
                        UsernameInvalidity::MaxLength(max) => {
                            format!("Usernames may not contain more than {} characters.", max)
                        }
                        UsernameInvalidity::InvalidCharacters => {
                            "Usernames may only contain letters, numbers, '_', '.', and '-'."
                                .to_owned()
                        }
                    })
                }
                NewUserInvalidity::Email(email_invalidity) => match email_invalidity {
                    EmailInvalidity::MissingDomain => {
                        response.email.push("Email is missing a domain.".to_owned())
                    }
                    EmailInvalidity::MissingSeparator => response
                        .email
                        .push("Email is missing an '@' symbol.".to_owned()),
                },
                NewUserInvalidity::Password(password_invalidity) => match password_invalidity {
                    PasswordInvalidity::MaxLength(max) => response.password.push(format!(
                        "Passwords may not contain more than {} characters.",
                        max
                    )),
                    PasswordInvalidity::MinLength(min) => response.password.push(format!(
                        "Passwords must contain at least {} characters.",
                        min
                    )),
                },
            }
        }

        response
    }
}

#[derive(Deserialize)]
pub struct VerificationRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerificationConfirmation {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifiedEmail {
    pub email: String,
}
