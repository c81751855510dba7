//! SeaORM implementation of MemberRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{DomainError, MemberFilter, MemberRepository};
use crate::models::member::{ActiveModel, Column, Entity as MemberEntity, MemberDto};

/// SeaORM-based implementation of MemberRepository
pub struct SeaOrmMemberRepository {
    db: DatabaseConnection,
}

impl SeaOrmMemberRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MemberRepository for SeaOrmMemberRepository {
    async fn find_all(&self, filter: MemberFilter) -> Result<Vec<MemberDto>, DomainError> {
        let mut query = MemberEntity::find().order_by_asc(Column::Name);

        if let Some(status) = &filter.status
            && !status.is_empty()
        {
            query = query.filter(Column::Status.eq(status));
        }

        if let Some(q) = &filter.query
            && !q.is_empty()
        {
            let cond = Condition::any()
                .add(Column::Name.contains(q))
                .add(Column::Email.contains(q))
                .add(Column::Phone.contains(q));
            query = query.filter(cond);
        }

        let members = query.all(&self.db).await?;
        Ok(members.into_iter().map(MemberDto::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<MemberDto>, DomainError> {
        let member = MemberEntity::find_by_id(id).one(&self.db).await?;
        Ok(member.map(MemberDto::from))
    }

    async fn find_by_qr_code(&self, code: &str) -> Result<Option<MemberDto>, DomainError> {
        let member = MemberEntity::find()
            .filter(Column::QrCode.eq(code))
            .one(&self.db)
            .await?;
        Ok(member.map(MemberDto::from))
    }

    async fn create(&self, member: MemberDto) -> Result<MemberDto, DomainError> {
        if member.name.trim().is_empty() {
            return Err(DomainError::Validation("Name is required".to_string()));
        }

        if let Some(email) = &member.email
            && !email.is_empty()
        {
            let existing = MemberEntity::find()
                .filter(Column::Email.eq(email))
                .one(&self.db)
                .await?;
            if existing.is_some() {
                return Err(DomainError::Conflict(format!(
                    "A member with email {} already exists",
                    email
                )));
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let active = ActiveModel {
            name: Set(member.name),
            email: Set(member.email),
            phone: Set(member.phone),
            membership_type: Set(member
                .membership_type
                .unwrap_or_else(|| "standard".to_string())),
            status: Set(member.status.unwrap_or_else(|| "active".to_string())),
            pin: Set(member.pin),
            qr_code: Set(Some(uuid::Uuid::new_v4().to_string())),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.db).await?;
        Ok(MemberDto::from(model))
    }

    async fn update(&self, id: i32, member: MemberDto) -> Result<MemberDto, DomainError> {
        let existing = MemberEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(member.name);
        active.email = Set(member.email);
        active.phone = Set(member.phone);
        if let Some(membership_type) = member.membership_type {
            active.membership_type = Set(membership_type);
        }
        if let Some(status) = member.status {
            active.status = Set(status);
        }
        if member.pin.is_some() {
            active.pin = Set(member.pin);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.db).await?;
        Ok(MemberDto::from(model))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let res = MemberEntity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}
