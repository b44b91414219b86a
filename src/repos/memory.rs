//! An in-memory stand-in for the Postgres repositories, used by service and
//! router tests.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    budgets::domain::{
        budgets::{Budget, NewBudget},
        categories::{Category, Member},
        items::{ExpenseItem, NewExpenseItem},
        room_codes::RoomCode,
    },
    identities::models::email::{NewEmail, NewEmailVerification, UnverifiedEmail},
    models::{NewUserModel, UserModel},
    passwords::{Hash, Password},
};

use super::{
    BudgetPersistenceError, BudgetRepo, CategoryRepo, EmailRepo, ExpenseItemRepo,
    UserPersistenceError, UserRepo,
};

struct StoredUser {
    model: NewUserModel,
    last_login: Option<DateTime<Utc>>,
}

struct StoredEmail {
    id: Uuid,
    user_id: Uuid,
    provided_address: String,
    normalized_address: String,
    verified_at: Option<DateTime<Utc>>,
}

struct StoredVerification {
    code: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    users: Vec<StoredUser>,
    emails: Vec<StoredEmail>,
    verifications: HashMap<Uuid, StoredVerification>,
    categories: Vec<Category>,
    budgets: Vec<Budget>,
    members: Vec<(Uuid, i64)>,
    items: Vec<ExpenseItem>,
    room_code_collisions: usize,
}

impl StoreState {
    fn user_model(&self, user: &StoredUser) -> UserModel {
        let email_verified = self
            .emails
            .iter()
            .any(|email| email.user_id == user.model.id && email.verified_at.is_some());

        UserModel {
            id: user.model.id,
            username: user.model.username.clone(),
            password_hash: user.model.password_hash.clone(),
            email_verified,
        }
    }

    fn username(&self, user_id: Uuid) -> Option<String> {
        self.users
            .iter()
            .find(|user| user.model.id == user_id)
            .map(|user| user.model.username.clone())
    }

    fn is_member(&self, user_id: Uuid, budget_id: i64) -> bool {
        self.members.contains(&(user_id, budget_id))
    }
}

pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        let categories = ["Food", "Transport", "Entertainment", "Other"]
            .iter()
            .zip(1..)
            .map(|(name, id)| Category {
                id,
                name: (*name).to_owned(),
                icon: None,
            })
            .collect();

        Self {
            state: Mutex::new(StoreState {
                categories,
                ..Default::default()
            }),
        }
    }
}

impl InMemoryStore {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store lock poisoned")
    }

    /// Create a user with a verified email address.
    pub fn add_user(&self, username: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        let password_hash = Hash::new(&Password::unvalidated(password))
            .expect("password should hash")
            .value()
            .to_owned();

        let mut state = self.state();
        state.users.push(StoredUser {
            model: NewUserModel {
                id,
                username: username.to_owned(),
                password_hash,
            },
            last_login: None,
        });
        state.emails.push(StoredEmail {
            id: Uuid::new_v4(),
            user_id: id,
            provided_address: format!("{}@example.com", username),
            normalized_address: format!("{}@example.com", username),
            verified_at: Some(Utc::now()),
        });

        id
    }

    /// Make the next `count` budget inserts fail as if their room code were
    /// taken.
    pub fn collide_room_codes(&self, count: usize) {
        self.state().room_code_collisions = count;
    }

    pub fn budget_count(&self) -> usize {
        self.state().budgets.len()
    }

    pub fn item_count(&self) -> usize {
        self.state().items.len()
    }

    pub fn member_count(&self, budget_id: i64) -> usize {
        self.state()
            .members
            .iter()
            .filter(|(_, member_budget_id)| *member_budget_id == budget_id)
            .count()
    }

    pub fn last_login(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.state()
            .users
            .iter()
            .find(|user| user.model.id == user_id)
            .and_then(|user| user.last_login)
    }

    pub fn is_verified(&self, normalized_address: &str) -> bool {
        self.state()
            .emails
            .iter()
            .any(|email| {
                email.normalized_address == normalized_address && email.verified_at.is_some()
            })
    }

    /// Backdate the outstanding verification code for an address.
    pub fn set_verification_issued_at(&self, normalized_address: &str, at: DateTime<Utc>) {
        let mut state = self.state();
        let email_id = state
            .emails
            .iter()
            .find(|email| email.normalized_address == normalized_address)
            .map(|email| email.id)
            .expect("email should exist");

        if let Some(verification) = state.verifications.get_mut(&email_id) {
            verification.created_at = at;
        }
    }
}

#[async_trait]
impl UserRepo for InMemoryStore {
    async fn persist_new_user(
        &self,
        user: &NewUserModel,
        email: &NewEmail,
        verification: &NewEmailVerification,
    ) -> Result<(), UserPersistenceError> {
        let mut state = self.state();

        if state
            .users
            .iter()
            .any(|existing| existing.model.username == user.username)
        {
            return Err(UserPersistenceError::DuplicateUsername(
                user.username.clone(),
            ));
        }

        if state
            .emails
            .iter()
            .any(|existing| existing.normalized_address == email.normalized_address())
        {
            return Err(UserPersistenceError::DuplicateEmail(email.clone()));
        }

        state.users.push(StoredUser {
            model: user.clone(),
            last_login: None,
        });
        state.emails.push(StoredEmail {
            id: email.id(),
            user_id: email.user_id(),
            provided_address: email.provided_address().to_owned(),
            normalized_address: email.normalized_address().to_owned(),
            verified_at: None,
        });
        state.verifications.insert(
            verification.email_id(),
            StoredVerification {
                code: verification.code().to_owned(),
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserModel>> {
        let state = self.state();

        Ok(state
            .users
            .iter()
            .find(|user| user.model.id == user_id)
            .map(|user| state.user_model(user)))
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserModel>> {
        let state = self.state();

        Ok(state
            .users
            .iter()
            .find(|user| user.model.username == username)
            .map(|user| state.user_model(user)))
    }

    async fn record_login(
        &self,
        user_id: Uuid,
        logged_in_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if let Some(user) = self
            .state()
            .users
            .iter_mut()
            .find(|user| user.model.id == user_id)
        {
            user.last_login = Some(logged_in_at);
        }

        Ok(())
    }
}

#[async_trait]
impl EmailRepo for InMemoryStore {
    async fn get_unverified_email(
        &self,
        normalized_address: &str,
    ) -> anyhow::Result<Option<UnverifiedEmail>> {
        let state = self.state();

        let email = match state.emails.iter().find(|email| {
            email.normalized_address == normalized_address && email.verified_at.is_none()
        }) {
            Some(email) => email,
            None => return Ok(None),
        };

        let verification = state.verifications.get(&email.id);

        Ok(Some(UnverifiedEmail {
            email_id: email.id,
            provided_address: email.provided_address.clone(),
            username: state.username(email.user_id).unwrap_or_default(),
            code: verification.map(|v| v.code.clone()),
            code_created_at: verification.map(|v| v.created_at),
        }))
    }

    async fn insert_verification(
        &self,
        email_verification: &NewEmailVerification,
    ) -> anyhow::Result<()> {
        self.state().verifications.insert(
            email_verification.email_id(),
            StoredVerification {
                code: email_verification.code().to_owned(),
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn mark_verified(
        &self,
        email_id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut state = self.state();

        if let Some(email) = state.emails.iter_mut().find(|email| email.id == email_id) {
            email.verified_at = Some(verified_at);
        }
        state.verifications.remove(&email_id);

        Ok(())
    }
}

#[async_trait]
impl BudgetRepo for InMemoryStore {
    async fn create_budget(
        &self,
        owner_id: Uuid,
        budget: &NewBudget,
        room_code: &RoomCode,
    ) -> Result<Budget, BudgetPersistenceError> {
        let mut state = self.state();

        if state.room_code_collisions > 0
            || state
                .budgets
                .iter()
                .any(|existing| &existing.room_code == room_code)
        {
            state.room_code_collisions = state.room_code_collisions.saturating_sub(1);

            return Err(BudgetPersistenceError::DuplicateRoomCode(room_code.clone()));
        }

        let created = Budget {
            id: state.budgets.len() as i64 + 1,
            name: budget.name().to_owned(),
            total: budget.total(),
            owner_id,
            start_date: budget.start_date(),
            end_date: budget.end_date(),
            room_code: room_code.clone(),
            created_at: Utc::now(),
        };

        state.budgets.push(created.clone());
        state.members.push((owner_id, created.id));

        Ok(created)
    }

    async fn add_member(&self, user_id: Uuid, budget_id: i64) -> anyhow::Result<bool> {
        let mut state = self.state();

        if state.is_member(user_id, budget_id) {
            return Ok(false);
        }

        state.members.push((user_id, budget_id));

        Ok(true)
    }

    async fn get_budget_by_room_code(
        &self,
        room_code: &RoomCode,
    ) -> anyhow::Result<Option<Budget>> {
        Ok(self
            .state()
            .budgets
            .iter()
            .find(|budget| &budget.room_code == room_code)
            .cloned())
    }

    async fn get_member_budget(
        &self,
        user_id: Uuid,
        budget_id: i64,
    ) -> anyhow::Result<Option<Budget>> {
        let state = self.state();

        if !state.is_member(user_id, budget_id) {
            return Ok(None);
        }

        Ok(state
            .budgets
            .iter()
            .find(|budget| budget.id == budget_id)
            .cloned())
    }

    async fn list_member_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>> {
        let state = self.state();

        Ok(state
            .budgets
            .iter()
            .rev()
            .filter(|budget| state.is_member(user_id, budget.id))
            .cloned()
            .collect())
    }

    async fn list_members(&self, budget_id: i64) -> anyhow::Result<Vec<Member>> {
        let state = self.state();

        Ok(state
            .members
            .iter()
            .filter(|(_, member_budget_id)| *member_budget_id == budget_id)
            .filter_map(|(user_id, _)| {
                state.username(*user_id).map(|username| Member {
                    user_id: *user_id,
                    username,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ExpenseItemRepo for InMemoryStore {
    async fn insert_item(&self, item: &NewExpenseItem) -> anyhow::Result<ExpenseItem> {
        let mut state = self.state();

        let created = ExpenseItem {
            id: state.items.len() as i64 + 1,
            budget_id: item.budget_id(),
            category_id: item.category_id(),
            user_id: Some(item.user_id()),
            username: state.username(item.user_id()),
            amount: item.amount(),
            name: item.name().to_owned(),
            notes: item.notes().map(str::to_owned),
            created_at: item.created_at(),
        };

        state.items.push(created.clone());

        Ok(created)
    }

    async fn list_items(&self, budget_id: i64) -> anyhow::Result<Vec<ExpenseItem>> {
        let mut items: Vec<ExpenseItem> = self
            .state()
            .items
            .iter()
            .filter(|item| item.budget_id == budget_id)
            .cloned()
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(items)
    }
}

#[async_trait]
impl CategoryRepo for InMemoryStore {
    async fn get_category(&self, category_id: i64) -> anyhow::Result<Option<Category>> {
        Ok(self
            .state()
            .categories
            .iter()
            .find(|category| category.id == category_id)
            .cloned())
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        Ok(self.state().categories.clone())
    }
}
