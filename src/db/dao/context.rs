use sea_orm::DatabaseConnection;

use super::{CardDao, DaoBase, ShareDao, UserDao};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn user(&self) -> UserDao {
        DaoBase::new(&self.db)
    }

    pub fn card(&self) -> CardDao {
        DaoBase::new(&self.db)
    }

    pub fn share(&self) -> ShareDao {
        DaoBase::new(&self.db)
    }
}
